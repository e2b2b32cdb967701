pub mod fingerprint;
pub mod headless;
pub mod scoring;
pub mod timing;

pub use scoring::{compute_breakdown, ScoreConfig};
