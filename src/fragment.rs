//! URL-fragment encoding of a configuration.
//!
//! A fragment is `base64(utf8(json))` using the standard alphabet, which is
//! what browsers produce with `btoa`. Decoding is lenient about a leading
//! `#`, missing padding and the URL-safe alphabet so hand-edited links still
//! restore.

use base64::Engine as _;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use serde_json::{Map, Value};

use crate::error::SnapshotError;
use crate::state::ProjectState;

const ENCODE: GeneralPurpose = base64::engine::general_purpose::STANDARD;

const LENIENT: GeneralPurposeConfig =
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent);
const STANDARD_LENIENT: GeneralPurpose = GeneralPurpose::new(&alphabet::STANDARD, LENIENT);
const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(&alphabet::URL_SAFE, LENIENT);

/// Encode a configuration for use as a URL fragment (without the `#`).
pub fn encode(state: &ProjectState) -> Result<String, SnapshotError> {
    let json = serde_json::to_string(state)?;
    Ok(encode_json(&json))
}

/// Encode already-serialized JSON.
pub(crate) fn encode_json(json: &str) -> String {
    ENCODE.encode(json.as_bytes())
}

/// Decode a fragment into the raw JSON object it carries.
pub fn decode_object(fragment: &str) -> Result<Map<String, Value>, SnapshotError> {
    let trimmed = fragment.trim().trim_start_matches('#');
    let bytes = match STANDARD_LENIENT.decode(trimmed) {
        Ok(bytes) => bytes,
        Err(standard_err) => URL_SAFE_LENIENT
            .decode(trimmed)
            .map_err(|_| standard_err)?,
    };
    let json = String::from_utf8(bytes)?;
    parse_object(&json)
}

/// Decode a fragment and merge it over the default configuration.
pub fn decode(fragment: &str) -> Result<ProjectState, SnapshotError> {
    let object = decode_object(fragment)?;
    let mut state = ProjectState::default();
    state.merge_object(object);
    Ok(state)
}

/// Parse snapshot JSON, requiring a top-level object.
pub fn parse_object(json: &str) -> Result<Map<String, Value>, SnapshotError> {
    match serde_json::from_str::<Value>(json)? {
        Value::Object(map) => Ok(map),
        _ => Err(SnapshotError::NotAnObject),
    }
}
