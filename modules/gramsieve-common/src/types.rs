use serde_json::Value;

use crate::util::short_name;

/// Top-level GraphQL query name whose presence under `data` marks a
/// profile-snapshot response.
pub const PROFILE_QUERY: &str = "user";

/// Top-level GraphQL query name whose presence under `data` marks one
/// timeline page.
pub const TIMELINE_QUERY: &str = "xdt_api__v1__feed__user_timeline_graphql_connection";

/// One profile-harvesting job: the source URL plus the short name used for
/// output paths. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    pub url: String,
    pub short_name: String,
}

impl WorkItem {
    pub fn new(url: impl Into<String>) -> Self {
        let url = url.into();
        let short_name = short_name(&url);
        Self { url, short_name }
    }
}

/// A captured profile envelope. The payload stays opaque JSON; accessors
/// walk it with fail-closed pointer lookups so a reshaped upstream response
/// degrades to "unknown" instead of panicking.
#[derive(Debug, Clone)]
pub struct ProfileSnapshot {
    envelope: Value,
}

impl ProfileSnapshot {
    pub fn new(envelope: Value) -> Self {
        Self { envelope }
    }

    pub fn envelope(&self) -> &Value {
        &self.envelope
    }

    pub fn into_envelope(self) -> Value {
        self.envelope
    }

    pub fn follower_count(&self) -> u64 {
        self.envelope
            .pointer("/data/user/edge_followed_by/count")
            .and_then(Value::as_u64)
            .unwrap_or(0)
    }

    pub fn post_count(&self) -> u64 {
        self.envelope
            .pointer("/data/user/edge_owner_to_timeline_media/count")
            .and_then(Value::as_u64)
            .unwrap_or(0)
    }

    /// A profile with no readable `is_private` flag is treated as private.
    pub fn is_private(&self) -> bool {
        self.envelope
            .pointer("/data/user/is_private")
            .and_then(Value::as_bool)
            .unwrap_or(true)
    }

    /// HD picture URL when present and non-empty, else the standard one.
    pub fn picture_url(&self) -> Option<&str> {
        let field = |key: &str| {
            self.envelope
                .pointer(&format!("/data/user/{key}"))
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
        };
        field("profile_pic_url_hd").or_else(|| field("profile_pic_url"))
    }
}

/// One timeline page: the full envelope plus the records extracted from its
/// `edges` array. Construction fails closed when the expected shape is
/// absent.
#[derive(Debug, Clone)]
pub struct TimelinePage {
    envelope: Value,
    records: Vec<Value>,
}

impl TimelinePage {
    /// Returns `None` unless `data.<timeline-query>.edges` is an array.
    pub fn from_envelope(envelope: Value) -> Option<Self> {
        let records = envelope
            .pointer(&format!("/data/{TIMELINE_QUERY}/edges"))?
            .as_array()?
            .clone();
        Some(Self { envelope, records })
    }

    pub fn records(&self) -> &[Value] {
        &self.records
    }

    pub fn into_parts(self) -> (Value, Vec<Value>) {
        (self.envelope, self.records)
    }
}

/// Identity of one timeline record, read from `node.id`. Records without a
/// readable id have no identity and are skipped by the merge.
pub fn record_id(record: &Value) -> Option<String> {
    match record.pointer("/node/id")? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
