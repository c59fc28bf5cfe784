//! Subsumption arbiter
//!
//! Every behavior writes its own [`Layer`] each cycle. The arbiter walks the
//! layers in priority order and the first active, allowed layer wins.
//! NAVIGATE is the base behavior and always eligible.

/// Number of behavior layers
pub const LAYER_COUNT: usize = 4;

/// Behavior layer identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LayerId {
    /// Waypoint pursuit (base behavior)
    Navigate,
    /// Rotating on the spot to a heading
    TurnInPlace,
    /// Final approach onto a docking target
    TargetAcquire,
    /// Hugging around a keep-out boundary
    BoundaryAvoid,
}

impl LayerId {
    /// All layers in storage order
    pub const ALL: [LayerId; LAYER_COUNT] = [
        LayerId::Navigate,
        LayerId::TurnInPlace,
        LayerId::TargetAcquire,
        LayerId::BoundaryAvoid,
    ];

    /// Storage slot for this layer
    pub const fn index(self) -> usize {
        match self {
            LayerId::Navigate => 0,
            LayerId::TurnInPlace => 1,
            LayerId::TargetAcquire => 2,
            LayerId::BoundaryAvoid => 3,
        }
    }

    const fn bit(self) -> u8 {
        1 << self.index()
    }
}

/// Default priority, highest first
pub const DEFAULT_PRIORITY: [LayerId; LAYER_COUNT] = [
    LayerId::BoundaryAvoid,
    LayerId::TurnInPlace,
    LayerId::TargetAcquire,
    LayerId::Navigate,
];

/// One behavior's intention for this cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Layer {
    /// Forward rate (ticks/cycle), negative to reverse
    pub speed: i32,
    /// Turn rate (ticks/cycle), positive turns counter-clockwise
    pub angle: i32,
    /// Whether the behavior wants control
    pub active: bool,
}

impl Layer {
    /// Set the commanded rates
    pub fn command(&mut self, speed: i32, angle: i32) {
        self.speed = speed;
        self.angle = angle;
    }
}

/// The full set of behavior layers
#[derive(Debug, Clone, Default)]
pub struct Layers {
    layers: [Layer; LAYER_COUNT],
}

impl Layers {
    /// All layers inactive and stopped
    pub fn new() -> Self {
        Self::default()
    }

    /// Borrow a layer
    pub fn get(&self, id: LayerId) -> &Layer {
        &self.layers[id.index()]
    }

    /// Mutably borrow a layer
    pub fn get_mut(&mut self, id: LayerId) -> &mut Layer {
        &mut self.layers[id.index()]
    }

    /// Check if a layer wants control
    pub fn is_active(&self, id: LayerId) -> bool {
        self.get(id).active
    }
}

/// Mask of layers the arbiter may select
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LayerMask(u8);

impl Default for LayerMask {
    fn default() -> Self {
        Self::ALL
    }
}

impl LayerMask {
    /// Every layer allowed
    pub const ALL: Self = Self((1 << LAYER_COUNT) - 1);

    /// Check if a layer is allowed
    pub const fn allows(self, id: LayerId) -> bool {
        self.0 & id.bit() != 0
    }

    /// Allow a layer
    pub fn enable(&mut self, id: LayerId) {
        self.0 |= id.bit();
    }

    /// Exclude a layer; NAVIGATE cannot be excluded
    pub fn disable(&mut self, id: LayerId) {
        if id != LayerId::Navigate {
            self.0 &= !id.bit();
        }
    }
}

/// Hard stop override
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HardStop {
    /// Normal arbitration
    #[default]
    Released,
    /// Zero output for this many more cycles
    Cycles(u16),
    /// Zero output until released
    Indefinite,
}

/// Result of one arbitration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Arbitration {
    /// Layer that won this cycle
    pub layer: LayerId,
    /// Output forward rate
    pub speed: i32,
    /// Output turn rate
    pub angle: i32,
    /// Output forced to zero by a hard stop
    pub halted: bool,
}

/// Priority arbiter over the behavior layers
#[derive(Debug, Clone)]
pub struct Arbiter {
    priority: [LayerId; LAYER_COUNT],
    allowed: LayerMask,
    hard_stop: HardStop,
    selected: LayerId,
}

impl Default for Arbiter {
    fn default() -> Self {
        Self::new()
    }
}

impl Arbiter {
    /// Create an arbiter with the default priority
    pub fn new() -> Self {
        Self::with_priority(DEFAULT_PRIORITY)
    }

    /// Create an arbiter with a custom priority, highest first
    ///
    /// The order is fixed for the arbiter's lifetime.
    pub fn with_priority(priority: [LayerId; LAYER_COUNT]) -> Self {
        Self {
            priority,
            allowed: LayerMask::ALL,
            hard_stop: HardStop::Released,
            selected: LayerId::Navigate,
        }
    }

    /// Priority order, highest first
    pub fn priority(&self) -> &[LayerId; LAYER_COUNT] {
        &self.priority
    }

    /// Layer selected by the last arbitration
    pub fn selected(&self) -> LayerId {
        self.selected
    }

    /// Current allowed-layer mask
    pub fn allowed(&self) -> LayerMask {
        self.allowed
    }

    /// Check if a layer may be selected
    pub fn allowed_layer(&self, id: LayerId) -> bool {
        self.allowed.allows(id)
    }

    /// Allow a layer to be selected
    pub fn enable_layer(&mut self, id: LayerId) {
        self.allowed.enable(id);
    }

    /// Exclude a layer regardless of its `active` flag
    pub fn disable_layer(&mut self, id: LayerId) {
        self.allowed.disable(id);
    }

    /// Current hard stop state
    pub fn hard_stop(&self) -> HardStop {
        self.hard_stop
    }

    /// Force zero output for `cycles` cycles
    pub fn hard_break(&mut self, cycles: u16) {
        self.hard_stop = if cycles == 0 {
            HardStop::Released
        } else {
            HardStop::Cycles(cycles)
        };
    }

    /// Force zero output until [`Arbiter::resume`]
    pub fn halt(&mut self) {
        self.hard_stop = HardStop::Indefinite;
    }

    /// Release any hard stop
    pub fn resume(&mut self) {
        self.hard_stop = HardStop::Released;
    }

    /// Pick the winning layer without touching hard stop state
    pub fn select(&self, layers: &Layers) -> LayerId {
        self.priority
            .iter()
            .copied()
            .find(|&id| {
                id != LayerId::Navigate && self.allowed.allows(id) && layers.is_active(id)
            })
            .unwrap_or(LayerId::Navigate)
    }

    /// Run one arbitration cycle
    ///
    /// A layer is always selected, even during a hard stop, so callers can
    /// tell which behavior is being held back.
    pub fn arbitrate(&mut self, layers: &Layers) -> Arbitration {
        self.selected = self.select(layers);

        let halted = match self.hard_stop {
            HardStop::Released => false,
            HardStop::Indefinite => true,
            HardStop::Cycles(remaining) => {
                self.hard_stop = if remaining <= 1 {
                    HardStop::Released
                } else {
                    HardStop::Cycles(remaining - 1)
                };
                true
            }
        };

        let layer = layers.get(self.selected);
        if halted {
            Arbitration {
                layer: self.selected,
                speed: 0,
                angle: 0,
                halted: true,
            }
        } else {
            Arbitration {
                layer: self.selected,
                speed: layer.speed,
                angle: layer.angle,
                halted: false,
            }
        }
    }
}
