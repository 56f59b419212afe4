//! Result recording for generated prompts.
//!
//! - `recorder` - the `PromptRecorder` seam and an in-memory implementation
//! - `credentials` - Google service-account key files
//! - `auth` - OAuth2 JWT-bearer token exchange with token caching
//! - `google` - append-only recorder backed by the Sheets v4 and Drive v3 APIs
//!
//! Rows are always `[timestamp, user, prompt, score]`, appended to the first
//! worksheet of the configured spreadsheet.

pub mod auth;
pub mod credentials;
pub mod google;
pub mod recorder;

pub use auth::ServiceAccountAuth;
pub use credentials::ServiceAccountKey;
pub use google::{GoogleSheetsRecorder, SheetTarget};
pub use recorder::{InMemoryPromptRecorder, PromptRecorder, RecorderError};
