use url::Url;

use crate::error::CheckinError;

/// Path marker used by printed QR posters that embed a deep link.
const ATTEND_PATH_MARKER: &str = "/attend/";

/// Turn a decoded QR string into an event identifier.
///
/// Three accepted shapes, in order: a URL carrying an `/attend/{id}` path,
/// a URL carrying an `event` query parameter, or a bare identifier. A string
/// that parses as a URL but yields neither is `PayloadMalformed`.
pub fn interpret_payload(raw: &str) -> Result<String, CheckinError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(CheckinError::PayloadMalformed);
    }

    let Ok(parsed) = Url::parse(trimmed) else {
        // Not URL-shaped at all: the whole string is the identifier.
        return Ok(trimmed.to_string());
    };

    if parsed.path().contains(ATTEND_PATH_MARKER) {
        let trailing = parsed
            .path_segments()
            .and_then(|segments| segments.filter(|s| !s.is_empty()).next_back());
        if let Some(id) = trailing.filter(|s| *s != "attend") {
            return Ok(id.to_string());
        }
    }

    if let Some((_, value)) = parsed.query_pairs().find(|(key, _)| key == "event") {
        if !value.is_empty() {
            return Ok(value.into_owned());
        }
    }

    Err(CheckinError::PayloadMalformed)
}
