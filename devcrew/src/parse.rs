//! Best-effort extraction of JSON objects from free-form model text.

use serde::de::DeserializeOwned;

/// The span from the first `{` to the last `}` in `text`, inclusive.
///
/// Greedy and not brace-aware: two objects in one reply produce a span
/// covering both (and everything between), which then fails to decode.
pub fn find_object_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&text[start..=end])
}

/// Decode the object span of `text` as `T`, or return `fallback`.
///
/// Never fails. There is no schema check beyond what `T` itself demands,
/// so `{}` decodes into whatever `T`'s field defaults are.
pub fn extract_structured<T: DeserializeOwned>(text: &str, fallback: T) -> T {
    let Some(span) = find_object_span(text) else {
        tracing::debug!("No object span in model reply, using fallback");
        return fallback;
    };
    match serde_json::from_str(span) {
        Ok(value) => value,
        Err(e) => {
            tracing::debug!(error = %e, "Undecodable object span, using fallback");
            fallback
        }
    }
}
