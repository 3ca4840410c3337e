mod cooldown_tracker;

pub use cooldown_tracker::{CooldownKind, CooldownTracker};
