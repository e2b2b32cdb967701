pub mod error;
pub mod types;

pub use error::{PalisadeError, PalisadeResult};
pub use types::{
    AttemptLog, Decision, FingerprintStatus, IdentityKey, LayerKind, LayerScore,
    ReputationReport, ReputationVerdict, ScoreBreakdown, SignalBundle, TimingMetadata,
};
