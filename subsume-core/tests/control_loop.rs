//! End-to-end control loop scenarios
//!
//! A tiny simulator stands in for the wheels and line sensors: each cycle
//! the encoders advance by the commanded wheel rates and the center sensor
//! reports lines at multiples of the grid width. The crossing scenarios
//! feed scripted ticks and sensor bitmaps instead.

use subsume_core::arbiter::LayerId;
use subsume_core::config::RobotConfig;
use subsume_core::correction::PassiveState;
use subsume_core::diagnostics::Diagnostic;
use subsume_core::navigation::Target;
use subsume_core::odometry::WheelTicks;
use subsume_core::sensors::LineMask;
use subsume_core::Robot;

const MAX_CYCLES: usize = 3000;

/// Perfect encoders: every commanded tick is counted
struct Wheels {
    left: u32,
    right: u32,
}

impl Wheels {
    fn new() -> Self {
        Self { left: 0, right: 0 }
    }

    fn advance(&mut self, robot: &Robot) -> WheelTicks {
        let targets = robot.wheel_targets();
        self.left = self.left.wrapping_add(targets.left.unsigned_abs());
        self.right = self.right.wrapping_add(targets.right.unsigned_abs());
        WheelTicks::new(self.left, self.right)
    }
}

fn per_cycle_config() -> RobotConfig {
    let mut config = RobotConfig::default();
    config.odometry.integrate_every = 1;
    config
}

/// One encoder tick per millimetre, folded every cycle
fn millimetre_config() -> RobotConfig {
    let mut config = per_cycle_config();
    config.odometry.mm_per_tick_left = 1.0;
    config.odometry.mm_per_tick_right = 1.0;
    config
}

/// Cross the line at x = 200 left sensor first, 10 mm per cycle
///
/// Returns the tokens of every event emitted on the way.
fn cross_line_left_first(robot: &mut Robot) -> Vec<String> {
    let sensors = [
        0,
        LineMask::LEFT.bits(),
        (LineMask::LEFT | LineMask::CENTER).bits(),
        LineMask::RIGHT.bits(),
    ];
    let mut events = Vec::new();
    for (cycle, on_lines) in sensors.into_iter().enumerate() {
        let ticks = 10 * cycle as u32;
        robot.cycle(WheelTicks::new(ticks, ticks), on_lines);
    }
    drain(robot, &mut events);
    events.iter().map(|event| event.to_string()).collect()
}

fn drain(robot: &mut Robot, events: &mut Vec<Diagnostic>) {
    while let Some(event) = robot.diagnostics_mut().pop() {
        events.push(event);
    }
}

#[test]
fn test_route_with_turn_in_place() {
    let mut robot = Robot::new(per_cycle_config()).unwrap();
    robot
        .add_target(Target::nav(300.0, 0.0).with_heading_degrees(90.0))
        .unwrap();
    robot.add_target(Target::nav(300.0, 300.0)).unwrap();
    robot.start();

    let mut wheels = Wheels::new();
    let mut events = Vec::new();
    let mut turned = false;

    for _ in 0..MAX_CYCLES {
        let ticks = wheels.advance(&robot);
        let result = robot.cycle(ticks, 0);
        drain(&mut robot, &mut events);
        turned |= result.layer == LayerId::TurnInPlace;

        if robot.navigator().finished() {
            break;
        }
    }

    assert!(robot.navigator().finished());
    assert!(turned);
    assert_eq!(
        events
            .iter()
            .filter(|e| matches!(e, Diagnostic::WaypointReached { .. }))
            .count(),
        2
    );
    let pose = robot.pose();
    assert!((pose.x - 300.0).abs() < 30.0);
    assert!((pose.y - 300.0).abs() < 30.0);

    // Route complete: navigation commands a stop
    let ticks = wheels.advance(&robot);
    let result = robot.cycle(ticks, 0);
    assert_eq!((result.speed, result.angle), (0, 0));
}

#[test]
fn test_grid_snap_after_counted_crossings() {
    const MM_PER_TICK: f64 = 0.785;
    const LINE_HALF_WIDTH: f64 = 12.0;

    let mut robot = Robot::new(per_cycle_config()).unwrap();
    // Estimate starts 8 mm behind the true position
    let mut true_x = 30.0;
    robot.set_coordinate(true_x - 8.0, 100.0, 0.0);
    robot.add_target(Target::nav(1200.0, 100.0)).unwrap();
    robot.start();

    let mut wheels = Wheels::new();
    let mut events = Vec::new();

    for _ in 0..MAX_CYCLES {
        let targets = robot.wheel_targets();
        true_x += (targets.left + targets.right) as f64 * 0.5 * MM_PER_TICK;
        let ticks = wheels.advance(&robot);

        let line_offset = true_x - (true_x / 200.0).round() * 200.0;
        let on_lines = if line_offset.abs() < LINE_HALF_WIDTH {
            LineMask::CENTER.bits()
        } else {
            0
        };

        robot.cycle(ticks, on_lines);
        drain(&mut robot, &mut events);

        if robot.navigator().finished() {
            break;
        }
    }

    let grid_events: Vec<_> = events
        .iter()
        .copied()
        .filter(|e| {
            matches!(
                e,
                Diagnostic::LineCounted { .. } | Diagnostic::GridSnapped | Diagnostic::LineNoise { .. }
            )
        })
        .collect();

    assert_eq!(
        &grid_events[..4],
        &[
            Diagnostic::LineCounted { counted: 1 },
            Diagnostic::LineCounted { counted: 2 },
            Diagnostic::GridSnapped,
            Diagnostic::LineCounted { counted: 1 },
        ]
    );
    assert!(robot.navigator().finished());
    // Heading is untouched by center-only crossings
    assert!(robot.pose().theta.abs() < 1e-9);
    assert!((robot.pose().y - 100.0).abs() < 1e-9);
}

#[test]
fn test_stop_freezes_pose() {
    let mut robot = Robot::new(per_cycle_config()).unwrap();
    robot.add_target(Target::nav(1000.0, 0.0)).unwrap();
    robot.start();

    let mut wheels = Wheels::new();
    for _ in 0..20 {
        let ticks = wheels.advance(&robot);
        robot.cycle(ticks, 0);
    }
    let moving = robot.pose().x;
    assert!(moving > 0.0);

    robot.stop();
    for _ in 0..20 {
        let ticks = wheels.advance(&robot);
        assert!(robot.cycle(ticks, 0).halted);
    }
    // One cycle of ticks commanded before the stop is still folded
    let stopped = robot.pose().x;
    for _ in 0..5 {
        let ticks = wheels.advance(&robot);
        robot.cycle(ticks, 0);
    }
    assert_eq!(robot.pose().x, stopped);

    robot.resume_drive();
    for _ in 0..5 {
        let ticks = wheels.advance(&robot);
        robot.cycle(ticks, 0);
    }
    assert!(robot.pose().x > stopped);
    assert_eq!(robot.active_layer(), LayerId::Navigate);
}

#[test]
fn test_oblique_crossing_corrects_heading() {
    let mut robot = Robot::new(millimetre_config()).unwrap();
    robot.set_coordinate(185.0, 100.0, 0.0);
    robot.add_target(Target::nav(1185.0, 100.0)).unwrap();
    robot.start();

    let tokens = cross_line_left_first(&mut robot);

    // 20 mm between the side triggers, center exactly halfway
    assert_eq!(tokens, ["p1", "pH", "P1111", "L1"]);
    let expected = (20.0f64).atan2(100.0);
    assert!((robot.pose().theta - expected).abs() < 1e-9);
    assert_eq!(
        robot.passive_state(),
        &PassiveState::CoolingDown { remaining: 20 }
    );

    // Mid-cell: the cooldown waits for the next line
    robot.cycle(WheelTicks::new(40, 40), 0);
    assert!(robot.pose().x > 220.0);
    assert_eq!(
        robot.passive_state(),
        &PassiveState::CoolingDown { remaining: 20 }
    );
}

#[test]
fn test_crossing_in_reverse_negates_offset() {
    let mut config = millimetre_config();
    config.navigation.top_speed = -10;
    config.navigation.turn_gain = 0.0;
    let mut robot = Robot::new(config).unwrap();
    // Facing +x while backing over the line at x = 200
    robot.set_coordinate(215.0, 100.0, 0.0);
    robot.add_target(Target::nav(-5000.0, 100.0)).unwrap();
    robot.start();

    let tokens = cross_line_left_first(&mut robot);

    assert_eq!(tokens, ["p1", "pH", "P1111", "L1"]);
    assert!(robot.pose().x < 200.0);
    let expected = -(20.0f64).atan2(100.0);
    assert!((robot.pose().theta - expected).abs() < 1e-9);
}
