//! Sonar CRM API Client
//!
//! A Rust client for the [Sonar](https://sonar.software) GraphQL API covering
//! the signup flow: serviceable-address and account creation, plus the
//! id/name list queries (companies, account statuses, account types) that
//! feed form configuration UIs.

mod client;
mod error;
mod types;

pub use client::SonarClient;
pub use error::{Result, SonarError};
pub use types::{
    CreateAccountInput, CustomFieldValue, IdName, MailingAddressInput, PhoneNumberInput,
    PrimaryContactInput, ServiceableAddressInput,
};
