use std::collections::HashSet;

use gramsieve_common::{record_id, ProfileSnapshot, TimelinePage, TIMELINE_QUERY};
use serde_json::Value;

use crate::harvest::classify::ClassifiedResponse;

/// Terminal classification of one work item's accumulated data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HarvestOutcome {
    /// Public profile snapshot captured.
    Success,
    /// Snapshot captured but the profile is private.
    Private,
    /// No profile snapshot ever arrived.
    NoData,
}

/// The growing result set for one work item: at most one profile snapshot
/// (last write wins) and an ordered, deduplicated list of timeline records.
/// Owned by exactly one worker; never crosses threads.
#[derive(Debug, Default)]
pub struct Accumulation {
    profile: Option<ProfileSnapshot>,
    timeline_envelope: Option<Value>,
    records: Vec<Value>,
    seen: HashSet<String>,
}

impl Accumulation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn profile(&self) -> Option<&ProfileSnapshot> {
        self.profile.as_ref()
    }

    pub fn record_count(&self) -> usize {
        self.records.len()
    }

    pub fn records(&self) -> &[Value] {
        &self.records
    }

    /// Fold one classified response in. Returns how many new timeline
    /// records were added (zero for profiles and unrecognized frames).
    pub fn apply(&mut self, response: ClassifiedResponse) -> usize {
        match response {
            ClassifiedResponse::Profile(snapshot) => {
                self.profile = Some(snapshot);
                0
            }
            ClassifiedResponse::Timeline(page) => self.merge_page(page),
            ClassifiedResponse::Unrecognized => 0,
        }
    }

    /// Merge one timeline page: append records whose `node.id` has not been
    /// seen, preserving arrival order. Records without a readable id are
    /// skipped. Idempotent: merging the same page twice adds nothing the
    /// second time.
    ///
    /// The first page's envelope is retained so persisted output keeps the
    /// upstream response shape.
    pub fn merge_page(&mut self, page: TimelinePage) -> usize {
        let (envelope, records) = page.into_parts();
        if self.timeline_envelope.is_none() {
            self.timeline_envelope = Some(envelope);
        }

        let mut added = 0;
        for record in records {
            let Some(id) = record_id(&record) else { continue };
            if self.seen.insert(id) {
                self.records.push(record);
                added += 1;
            }
        }
        added
    }

    pub fn outcome(&self) -> HarvestOutcome {
        match &self.profile {
            None => HarvestOutcome::NoData,
            Some(snapshot) if snapshot.is_private() => HarvestOutcome::Private,
            Some(_) => HarvestOutcome::Success,
        }
    }

    /// Consume into persistable payloads: the profile envelope and the
    /// retained timeline envelope with the merged record list re-injected
    /// into its `edges` array.
    pub fn into_artifacts(self) -> (Option<Value>, Option<Value>) {
        let Accumulation {
            profile,
            timeline_envelope,
            records,
            ..
        } = self;

        let profile = profile.map(ProfileSnapshot::into_envelope);
        let timeline = timeline_envelope.map(|mut envelope| {
            if let Some(edges) = envelope.pointer_mut(&format!("/data/{TIMELINE_QUERY}/edges")) {
                *edges = Value::Array(records);
            }
            envelope
        });
        (profile, timeline)
    }
}
