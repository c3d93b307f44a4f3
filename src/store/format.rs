//! JSON re-formatting for stored events.

use std::borrow::Cow;

use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};
use serde_json::Value;

/// Re-serialize `raw` with sorted keys and tab indentation.
///
/// Bytes that are not valid JSON are returned unchanged.
pub fn format_json(raw: &[u8]) -> Cow<'_, [u8]> {
    let value: Value = match serde_json::from_slice(raw) {
        Ok(v) => v,
        Err(_) => return Cow::Borrowed(raw),
    };

    let mut out = Vec::with_capacity(raw.len() + raw.len() / 2);
    let mut serializer = Serializer::with_formatter(&mut out, PrettyFormatter::with_indent(b"\t"));
    match value.serialize(&mut serializer) {
        Ok(()) => Cow::Owned(out),
        Err(_) => Cow::Borrowed(raw),
    }
}
