pub mod window;

pub use window::{LimitConfig, SlidingWindowLimiter};
