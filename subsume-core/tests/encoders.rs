//! Encoder counters shared between an edge interrupt and the control loop

use std::sync::Arc;
use std::thread;

use subsume_core::odometry::{TickCounters, WheelTicks};

#[test]
fn test_counters_shared_across_threads() {
    let counters = Arc::new(TickCounters::new());
    let writer = {
        let counters = Arc::clone(&counters);
        thread::spawn(move || {
            for _ in 0..1000 {
                counters.tick_right();
            }
        })
    };
    writer.join().unwrap();

    assert_eq!(counters.snapshot().right, 1000);
}

#[test]
fn test_snapshots_never_go_backwards() {
    let counters = Arc::new(TickCounters::new());
    let writer = {
        let counters = Arc::clone(&counters);
        thread::spawn(move || {
            for _ in 0..10_000 {
                counters.tick_left();
                counters.tick_right();
            }
        })
    };

    let mut last = WheelTicks::ZERO;
    for _ in 0..1000 {
        let ticks = counters.snapshot();
        assert!(ticks.left >= last.left);
        assert!(ticks.right >= last.right);
        last = ticks;
    }
    writer.join().unwrap();

    assert_eq!(counters.snapshot(), WheelTicks::new(10_000, 10_000));
}
