//! Input and response types for the Sonar GraphQL API
//!
//! Field names serialize exactly as the Sonar mutation inputs expect them
//! (snake_case keys, string-typed enum ids).

use serde::{Deserialize, Serialize};

/// Input for the `createServiceableAddress` mutation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceableAddressInput {
    pub line1: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line2: Option<String>,
    pub city: String,
    /// Combined `<country>_<state>` subdivision code
    pub subdivision: String,
    pub zip: String,
    /// ISO-3166 alpha-2 country code
    pub country: String,
    pub latitude: String,
    pub longitude: String,
    pub address_status_id: String,
    pub network_site_ids: Vec<String>,
}

impl ServiceableAddressInput {
    /// The same address reduced to the subset `mailing_address` accepts:
    /// no network sites, no status, no coordinates.
    pub fn mailing_address(&self) -> MailingAddressInput {
        MailingAddressInput {
            line1: self.line1.clone(),
            line2: self.line2.clone(),
            city: self.city.clone(),
            subdivision: self.subdivision.clone(),
            zip: self.zip.clone(),
            country: self.country.clone(),
        }
    }
}

/// Mailing address subset embedded in [`CreateAccountInput`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MailingAddressInput {
    pub line1: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line2: Option<String>,
    pub city: String,
    pub subdivision: String,
    pub zip: String,
    pub country: String,
}

/// Input for the `createAccount` mutation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreateAccountInput {
    pub serviceable_address_id: String,
    pub unset_custom_field_data: Vec<String>,
    pub custom_field_data: Vec<CustomFieldValue>,
    pub account_group_ids: Vec<String>,
    pub account_status_id: String,
    pub account_type_id: String,
    pub company_id: String,
    pub mailing_address: MailingAddressInput,
    pub name: String,
    pub primary_contact: PrimaryContactInput,
}

/// A `{custom_field_id, value}` pair seeded onto a new account
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CustomFieldValue {
    pub custom_field_id: String,
    pub value: String,
}

/// Primary contact embedded in [`CreateAccountInput`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PrimaryContactInput {
    pub name: String,
    pub email_address: String,
    pub email_category_ids: Vec<String>,
    pub phone_numbers: Vec<PhoneNumberInput>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PhoneNumberInput {
    pub country: String,
    pub number: String,
    pub phone_number_type_id: String,
}

/// An `{id, name}` entity as returned by the Sonar list queries
/// (companies, account_statuses, account_types)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdName {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
}

/// Sonar serializes ids as strings in some responses and numbers in others;
/// accept both and keep them as strings.
fn deserialize_id<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Error;

    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(D::Error::custom(format!("invalid entity id: {}", other))),
    }
}
