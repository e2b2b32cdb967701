pub mod collector;
pub mod inject;

pub use collector::{collector_script, CollectorTiming, HeadlessWeights};
pub use inject::inject_collector;
