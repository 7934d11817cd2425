//! SQ Serviceability Client
//!
//! A Rust client for the SQ address serviceability-check API, plus the status
//! enum and the confirmation-page style fragment keyed on it.

mod client;
mod style;
mod types;

pub use client::SqClient;
pub use style::style_fragment;
pub use types::SqStatus;
