pub mod decision;
pub mod pages;
pub mod server;
pub mod validator;

pub use decision::GatePipeline;
pub use server::{gate_router, GateState};
pub use validator::{CredentialValidator, StaticCredentials};
