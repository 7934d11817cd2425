//! Serviceability-check pipeline
//!
//! Runs on the ajax success filter for "SQ" forms: looks the submitted place
//! up against the SQ API, stores the outcome on the entry, and rewrites the
//! confirmation so only the section matching the outcome shows. Failures
//! here are user-visible only (the Error section renders) and never alert an
//! operator, unlike the submission pipeline.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::Deserialize;
use serde_json::Value;
use sq_client::{style_fragment, SqClient, SqStatus};
use tracing::{debug, warn};

use crate::entries::EntryStore;
use crate::types::{AjaxSuccessPayload, FormField, SubmitResponse};

/// Form-title marker (matched case-insensitively) that opts a form into the
/// serviceability flow
const FORM_TITLE_MARKER: &str = "sq";

// CSS class markers assigned to fields in the form builder.
pub const ADDRESS_FIELD_MARKER: &str = "custom_address_field";
pub const PLACE_ID_FIELD_MARKER: &str = "custom_place_id_field";
pub const RESPONSE_FIELD_MARKER: &str = "custom_response_field";

/// Verification seam over the SQ client
#[async_trait]
pub trait Verifier: Send + Sync {
    async fn verify(&self, place_id: &str, address: &str) -> SqStatus;
}

#[async_trait]
impl Verifier for SqClient {
    async fn verify(&self, place_id: &str, address: &str) -> SqStatus {
        SqClient::verify(self, place_id, address).await
    }
}

/// Field ids resolved from CSS-class markers, built once per request
#[derive(Debug, Default, PartialEq)]
pub struct SqFieldRoles {
    pub address: Option<String>,
    pub place_id: Option<String>,
    pub response: Option<String>,
}

impl SqFieldRoles {
    /// The first field whose classes mention a marker wins that role; a
    /// missing marker leaves the role unset.
    pub fn scan(fields: &[FormField]) -> Self {
        let mut roles = Self::default();
        for field in fields {
            let css = field.css.to_ascii_lowercase();
            if roles.address.is_none() && css.contains(ADDRESS_FIELD_MARKER) {
                roles.address = Some(field.id.clone());
            }
            if roles.place_id.is_none() && css.contains(PLACE_ID_FIELD_MARKER) {
                roles.place_id = Some(field.id.clone());
            }
            if roles.response.is_none() && css.contains(RESPONSE_FIELD_MARKER) {
                roles.response = Some(field.id.clone());
            }
        }
        roles
    }
}

/// The place selection posted by the browser: base64-encoded JSON written by
/// the address-lookup script into the hidden place-id field
#[derive(Debug, Default, Deserialize)]
struct PlaceSelection {
    #[serde(rename = "placeId", default)]
    place_id: String,
    #[serde(default)]
    autocomplete_search: String,
}

fn decode_place(raw: &str) -> Option<PlaceSelection> {
    let decoded = BASE64.decode(raw.trim()).ok()?;
    serde_json::from_slice(&decoded).ok()
}

pub struct VerificationPipeline<V, E> {
    verifier: V,
    entries: E,
}

impl<V: Verifier, E: EntryStore> VerificationPipeline<V, E> {
    pub fn new(verifier: V, entries: E) -> Self {
        Self { verifier, entries }
    }

    /// Filter the ajax success response. Forms whose title does not carry
    /// the SQ marker pass through untouched.
    pub async fn transform(&self, payload: AjaxSuccessPayload) -> SubmitResponse {
        let AjaxSuccessPayload {
            mut response,
            form_id,
            form_data,
            request_fields,
            entry_id,
        } = payload;

        let title = form_data.settings.title().to_ascii_lowercase();
        if !title.contains(FORM_TITLE_MARKER) {
            return response;
        }

        let roles = SqFieldRoles::scan(&form_data.fields);
        debug!(
            form_id = ?form_id,
            address_field = ?roles.address,
            place_id_field = ?roles.place_id,
            response_field = ?roles.response,
            "Resolved SQ field roles"
        );

        let raw = roles
            .place_id
            .as_deref()
            .and_then(|id| request_fields.get(id))
            .and_then(Value::as_str)
            .unwrap_or("");

        // Without a submitted place there is nothing to look up: show the
        // Error section and leave the confirmation otherwise untouched.
        if raw.is_empty() {
            response.confirmation =
                format!("{}{}", style_fragment(SqStatus::Error), response.confirmation);
            return response;
        }

        let Some(place) = decode_place(raw) else {
            debug!(form_id = ?form_id, "Place selection did not decode");
            response.confirmation =
                format!("{}{}", style_fragment(SqStatus::Error), response.confirmation);
            return response;
        };

        let status = if place.place_id.is_empty() {
            SqStatus::Error
        } else {
            self.verifier
                .verify(&place.place_id, &place.autocomplete_search)
                .await
        };

        let entry_id = entry_id
            .as_deref()
            .filter(|id| !id.is_empty() && *id != "0");
        if let (Some(entry_id), Some(response_field)) = (entry_id, roles.response.as_deref()) {
            self.persist_result(entry_id, response_field, status).await;
        }

        // Literal token replacement, kept for compatibility with the
        // confirmation markup this flow ships with: first the word
        // "address", then "place_id", wherever they appear.
        response.confirmation = response
            .confirmation
            .replace("address", &place.autocomplete_search);
        response.confirmation = format!(
            "{}{}",
            style_fragment(status),
            response.confirmation.replace("place_id", &place.place_id)
        );

        response
    }

    /// Write the outcome onto the stored entry's field map.
    ///
    /// Read, decode, or write failures skip the write without blocking the
    /// user-facing response.
    async fn persist_result(&self, entry_id: &str, field_id: &str, status: SqStatus) {
        let raw = match self.entries.fields(entry_id).await {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!(entry_id, "Entry not found; skipping result write");
                return;
            }
            Err(e) => {
                warn!(entry_id, error = %e, "Entry read failed; skipping result write");
                return;
            }
        };

        let mut fields: Value = match serde_json::from_str(&raw) {
            Ok(v) => v,
            Err(e) => {
                debug!(entry_id, error = %e, "Entry fields did not parse; skipping result write");
                return;
            }
        };

        let Some(map) = fields.as_object_mut() else {
            debug!(entry_id, "Entry fields are not an object; skipping result write");
            return;
        };

        let slot = map
            .entry(field_id.to_string())
            .or_insert_with(|| Value::Object(Default::default()));
        let Some(slot) = slot.as_object_mut() else {
            debug!(entry_id, field_id, "Response field is not an object; skipping result write");
            return;
        };
        slot.insert(
            "value".to_string(),
            Value::String(status.as_str().to_string()),
        );

        if let Err(e) = self.entries.update_fields(entry_id, &fields.to_string()).await {
            warn!(entry_id, error = %e, "Entry update failed; result not stored");
        }
    }
}
