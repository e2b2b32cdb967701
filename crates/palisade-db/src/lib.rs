pub mod ops;
pub mod schema;

pub use ops::{DbStats, FingerprintRecord, PalisadeDb};
