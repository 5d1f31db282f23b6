use gramsieve_common::{ProfileSnapshot, TimelinePage, PROFILE_QUERY, TIMELINE_QUERY};
use serde_json::Value;

use crate::session::RawNetworkEvent;

/// URL fragment marking GraphQL query traffic; everything else the browser
/// captured is ignored without fetching its body.
const GRAPHQL_URL_MARKER: &str = "graphql/query";

/// Three-way classification of one captured network response. "No match" is
/// an ordinary value here, not an error: malformed frames, failed body
/// fetches, and unexpected shapes all land in `Unrecognized` and are
/// silently dropped by the caller.
#[derive(Debug)]
pub enum ClassifiedResponse {
    Profile(ProfileSnapshot),
    Timeline(TimelinePage),
    Unrecognized,
}

/// Classify one captured event, fetching its body on demand through the
/// provided callback.
pub fn classify_event<F>(event: &RawNetworkEvent, fetch_body: F) -> ClassifiedResponse
where
    F: FnOnce(&str) -> anyhow::Result<String>,
{
    if !event.url.contains(GRAPHQL_URL_MARKER) || event.request_id.is_empty() {
        return ClassifiedResponse::Unrecognized;
    }
    match fetch_body(&event.request_id) {
        Ok(body) => classify_body(&body),
        Err(_) => ClassifiedResponse::Unrecognized,
    }
}

/// Decide what a response body is by the top-level query name under `data`.
/// Exactly one of the two expected names must be present; anything else is
/// `Unrecognized`.
pub fn classify_body(body: &str) -> ClassifiedResponse {
    let Ok(envelope) = serde_json::from_str::<Value>(body) else {
        return ClassifiedResponse::Unrecognized;
    };
    let Some(data) = envelope.get("data").and_then(Value::as_object) else {
        return ClassifiedResponse::Unrecognized;
    };

    match (
        data.contains_key(PROFILE_QUERY),
        data.contains_key(TIMELINE_QUERY),
    ) {
        (true, false) => ClassifiedResponse::Profile(ProfileSnapshot::new(envelope)),
        (false, true) => TimelinePage::from_envelope(envelope)
            .map(ClassifiedResponse::Timeline)
            .unwrap_or(ClassifiedResponse::Unrecognized),
        _ => ClassifiedResponse::Unrecognized,
    }
}
