//! Event record parsing for `data:` lines

use crate::error::{ChatError, ChatResult};
use crate::protocol::EventRecord;
use tracing::{error, trace};

/// Marker that introduces a payload-bearing line
pub const DATA_PREFIX: &str = "data: ";

/// Parse one protocol line.
///
/// Lines without the data prefix and data lines with an empty payload carry
/// no event and yield `Ok(None)`. A payload that is not a valid event record
/// is a protocol violation and yields [`ChatError::Framing`].
pub fn parse_line(line: &str) -> ChatResult<Option<EventRecord>> {
    let Some(rest) = line.trim().strip_prefix(DATA_PREFIX) else {
        if !line.trim().is_empty() {
            trace!("Ignoring non-data line: {}", line);
        }
        return Ok(None);
    };

    let payload = rest.trim();
    if payload.is_empty() {
        return Ok(None);
    }

    serde_json::from_str::<EventRecord>(payload)
        .map(Some)
        .map_err(|e| {
            error!("Failed to parse stream record: {} (payload: {})", e, payload);
            ChatError::Framing {
                payload: payload.to_string(),
                message: e.to_string(),
            }
        })
}
