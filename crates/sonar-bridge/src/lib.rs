//! Sonar Form Bridge Library
//!
//! Core components bridging WPForms submissions into Sonar signups and SQ
//! serviceability checks.

pub mod config;
pub mod entries;
pub mod error;
pub mod extract;
pub mod notify;
pub mod server;
pub mod submission;
pub mod types;
pub mod verification;

pub use config::BridgeConfig;
pub use error::{BridgeError, Result};
pub use server::{create_router, start_server, AppState, SharedState};
pub use submission::SubmissionPipeline;
pub use verification::VerificationPipeline;
