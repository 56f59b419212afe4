pub mod config;
pub mod domain;
pub mod errors;
pub mod signature;

pub use domain::{PromptRecord, PromptRequest, RegeneratePayload, RequestOrigin};
pub use errors::{ApplicationError, IntegrationService, InterfaceError};
pub use signature::{SignatureError, SignatureVerifier};
