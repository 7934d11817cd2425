//! Address extraction from geocoded form payloads
//!
//! The address-lookup field submits a base64-encoded JSON copy of the
//! geocoder result. This module decodes it and assembles the
//! serviceable-address input from its address components; it is a pure
//! transform with no side effects.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::Deserialize;
use serde_json::Value;
use sonar_api::ServiceableAddressInput;

use crate::error::{BridgeError, Result};

/// Sonar address status meaning "ready for service"
pub const ADDRESS_STATUS_READY_FOR_SERVICE: &str = "1";

#[derive(Debug, Deserialize)]
struct GeocodedPayload {
    full: GeocodeResult,
}

#[derive(Debug, Deserialize)]
struct GeocodeResult {
    address_components: Vec<AddressComponent>,
    geometry: Geometry,
}

#[derive(Debug, Deserialize)]
struct AddressComponent {
    #[serde(default)]
    long_name: String,
    #[serde(default)]
    short_name: String,
    #[serde(default)]
    types: Vec<String>,
}

impl AddressComponent {
    fn has_type(&self, wanted: &str) -> bool {
        self.types.iter().any(|t| t == wanted)
    }
}

#[derive(Debug, Deserialize)]
struct Geometry {
    location: Location,
}

#[derive(Debug, Deserialize)]
struct Location {
    #[serde(deserialize_with = "coordinate")]
    lat: String,
    #[serde(deserialize_with = "coordinate")]
    lng: String,
}

/// Decode a submitted address-field value into a serviceable-address input.
///
/// A value that is not base64, not JSON, or lacks the geocoder shape is an
/// extraction failure, never a partial address. Missing component types, on
/// the other hand, simply leave their address fields empty.
pub fn extract_address(raw: &str) -> Result<ServiceableAddressInput> {
    let decoded = BASE64
        .decode(raw.trim())
        .map_err(|_| BridgeError::Extraction("field value is not base64".to_string()))?;

    let payload: GeocodedPayload = serde_json::from_slice(&decoded)
        .map_err(|e| BridgeError::Extraction(format!("not a geocoded payload: {}", e)))?;

    let mut street_number = None;
    let mut route = None;
    let mut city = None;
    let mut country = None;
    let mut state = None;
    let mut zip = None;

    // A component may carry several types; the first component matching a
    // type populates it.
    for component in &payload.full.address_components {
        if street_number.is_none() && component.has_type("street_number") {
            street_number = Some(component.long_name.clone());
        }
        if route.is_none() && component.has_type("route") {
            route = Some(component.long_name.clone());
        }
        if city.is_none() && component.has_type("locality") {
            city = Some(component.long_name.clone());
        }
        if country.is_none() && component.has_type("country") {
            country = Some(component.short_name.clone());
        }
        if state.is_none() && component.has_type("administrative_area_level_1") {
            state = Some(component.short_name.clone());
        }
        if zip.is_none() && component.has_type("postal_code") {
            zip = Some(component.long_name.clone());
        }
    }

    let line1 = match (street_number, route) {
        (Some(number), Some(route)) => format!("{} {}", number, route),
        (Some(number), None) => number,
        (None, Some(route)) => route,
        (None, None) => String::new(),
    };

    let country = country.unwrap_or_default();
    let state = state.unwrap_or_default();

    Ok(ServiceableAddressInput {
        line1,
        line2: None,
        city: city.unwrap_or_default(),
        subdivision: format!("{}_{}", country, state),
        zip: zip.unwrap_or_default(),
        country,
        latitude: payload.full.geometry.location.lat,
        longitude: payload.full.geometry.location.lng,
        address_status_id: ADDRESS_STATUS_READY_FOR_SERVICE.to_string(),
        network_site_ids: Vec::new(),
    })
}

/// Geocoders emit coordinates as JSON numbers; keep them as decimal strings
/// without re-rounding, and accept pre-stringified values too.
fn coordinate<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Error;

    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(D::Error::custom(format!("invalid coordinate: {}", other))),
    }
}
