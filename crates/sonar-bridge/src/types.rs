//! Inbound webhook payload types
//!
//! The WordPress adapter forwards its form hooks to this service as JSON.
//! Shapes follow what the forms plugin hands the hooks: a field-id-keyed map
//! of submitted values, the form definition (settings map + field list), and
//! for the ajax filter the response object plus the raw request field values.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One submitted field as delivered by the forms host
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct FieldValue {
    #[serde(default)]
    pub value: String,
    /// Second address line, present on address-type fields
    #[serde(default)]
    pub address2: Option<String>,
}

/// Per-form settings, owned by the host's form builder and read-only here.
///
/// Every binding is optional: the pipelines treat absent mappings as
/// "do not proceed" rather than trusting the host to validate.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct FormSettings {
    #[serde(default)]
    pub form_title: Option<String>,
    #[serde(default)]
    pub sonar_enable: Option<String>,
    #[serde(default)]
    pub sonar_error_report_email: Option<String>,
    #[serde(default)]
    pub sonar_company: Option<String>,
    #[serde(default)]
    pub sonar_account_status: Option<String>,
    #[serde(default)]
    pub sonar_account_type: Option<String>,
    #[serde(default)]
    pub sonar_account_name: Option<String>,
    #[serde(default)]
    pub sonar_account_service_address: Option<String>,
    #[serde(default)]
    pub sonar_account_service_address_line2: Option<String>,
    #[serde(default)]
    pub sonar_contact_name: Option<String>,
    #[serde(default)]
    pub sonar_contact_email: Option<String>,
    #[serde(default)]
    pub sonar_contact_phone: Option<String>,
}

impl FormSettings {
    /// The integration only runs when the form toggle is explicitly on
    pub fn enabled(&self) -> bool {
        self.sonar_enable.as_deref() == Some("1")
    }

    pub fn title(&self) -> &str {
        self.form_title.as_deref().unwrap_or("")
    }
}

/// Field metadata from the form definition
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct FormField {
    #[serde(default, deserialize_with = "stringly")]
    pub id: String,
    /// Space-separated CSS classes assigned in the form builder
    #[serde(default)]
    pub css: String,
}

/// Form definition accompanying each hook payload
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct FormConfig {
    #[serde(default)]
    pub settings: FormSettings,
    #[serde(default)]
    pub fields: Vec<FormField>,
}

/// A completed form submission (`wpforms_process_complete`)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubmissionEvent {
    #[serde(default)]
    pub fields: HashMap<String, FieldValue>,
    #[serde(default, deserialize_with = "stringly_opt")]
    pub entry_id: Option<String>,
    #[serde(default)]
    pub form_data: FormConfig,
}

impl SubmissionEvent {
    pub fn field(&self, id: &str) -> Option<&FieldValue> {
        self.fields.get(id)
    }

    pub fn entry_id(&self) -> &str {
        self.entry_id.as_deref().unwrap_or("")
    }
}

/// The ajax success filter payload (`wpforms_ajax_submit_success_response`)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AjaxSuccessPayload {
    #[serde(default)]
    pub response: SubmitResponse,
    #[serde(default, deserialize_with = "stringly_opt")]
    pub form_id: Option<String>,
    #[serde(default)]
    pub form_data: FormConfig,
    /// Raw request field values keyed by field id, as posted by the browser
    #[serde(default)]
    pub request_fields: HashMap<String, Value>,
    #[serde(default, deserialize_with = "stringly_opt")]
    pub entry_id: Option<String>,
}

/// The response object being filtered; keys we do not touch round-trip
/// unchanged through the flattened map.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubmitResponse {
    #[serde(default)]
    pub confirmation: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

/// WordPress serializes ids as numbers or strings depending on context;
/// accept both and keep them as strings.
fn stringly<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Error;

    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Null => Ok(String::new()),
        other => Err(D::Error::custom(format!("invalid id value: {}", other))),
    }
}

fn stringly_opt<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Error;

    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(Some(s)),
        Value::Number(n) => Ok(Some(n.to_string())),
        Value::Null => Ok(None),
        other => Err(D::Error::custom(format!("invalid id value: {}", other))),
    }
}
