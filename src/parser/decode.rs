//! Transport-safe value decoding
//!
//! Values may be wrapped in base64 behind a literal marker. Wrapping can be
//! nested, so decoding repeats while a marker remains.

use base64::{engine::general_purpose::STANDARD, Engine as _};

/// Markers announcing a base64 payload
pub const ENCODING_MARKERS: [&str; 2] = ["ZIP_", "__"];

/// Decodes a possibly wrapped parameter value.
///
/// Spaces, `\r` and `\n` are stripped from the payload before decoding. A
/// payload that is not valid base64 (or not UTF-8 once decoded) is returned
/// with its marker removed.
pub fn decode_value(value: &str) -> String {
    let mut current = value.to_string();

    loop {
        let Some(marker) = ENCODING_MARKERS.iter().find(|m| current.starts_with(*m)) else {
            return current;
        };

        let payload: String = current[marker.len()..]
            .chars()
            .filter(|c| !matches!(c, ' ' | '\r' | '\n'))
            .collect();

        match STANDARD
            .decode(payload.as_bytes())
            .ok()
            .and_then(|bytes| String::from_utf8(bytes).ok())
        {
            Some(decoded) => current = decoded,
            None => return payload,
        }
    }
}
