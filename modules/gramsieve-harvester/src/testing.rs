//! Scripted fakes for exercising the pipeline without a browser.

use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use anyhow::anyhow;
use gramsieve_common::{ProfileSnapshot, WorkItem, TIMELINE_QUERY};
use serde_json::json;

use crate::infra::persist::ArtifactWriter;
use crate::infra::pictures::PictureFetcher;
use crate::infra::progress::{FailureLog, ProgressStore};
use crate::infra::queue::WorkQueue;
use crate::pipeline::stats::StatsCounters;
use crate::pipeline::worker::RunContext;
use crate::session::{BrowserSession, RawNetworkEvent, SessionFactory};

/// Run context rooted in a scratch directory: done-list at `done.csv`,
/// artifacts under `output/`, queue seeded with `urls`, pacing off.
pub fn run_context(dir: &Path, urls: &[&str], target_records: usize) -> Arc<RunContext> {
    let items = urls.iter().map(|url| WorkItem::new(*url)).collect();
    Arc::new(RunContext {
        queue: WorkQueue::new(items),
        progress: ProgressStore::open(dir.join("done.csv")),
        failures: FailureLog::new(),
        stats: StatsCounters::new(urls.len() as u32),
        artifacts: ArtifactWriter::new(dir.join("output")),
        target_records,
        throttle: false,
    })
}

/// GraphQL profile envelope body with the fields the pipeline reads.
pub fn profile_body(is_private: bool) -> String {
    json!({ "data": { "user": {
        "is_private": is_private,
        "edge_followed_by": { "count": 1_000 },
        "edge_owner_to_timeline_media": { "count": 50 },
        "profile_pic_url_hd": "https://cdn.example/pic.jpg",
    }}})
    .to_string()
}

/// GraphQL timeline envelope body with one record per id.
pub fn timeline_body(ids: &[&str]) -> String {
    let edges: Vec<_> = ids
        .iter()
        .map(|id| json!({ "node": { "id": id, "shortcode": format!("sc{id}") } }))
        .collect();
    json!({ "data": { TIMELINE_QUERY: { "edges": edges } } }).to_string()
}

/// Timeline body with numeric ids in `start..end`.
pub fn timeline_body_range(start: usize, end: usize) -> String {
    let ids: Vec<String> = (start..end).map(|i| i.to_string()).collect();
    let refs: Vec<&str> = ids.iter().map(String::as_str).collect();
    timeline_body(&refs)
}

enum Step {
    Events(Vec<(String, String)>),
    ReadError,
}

/// A browser session that replays a script: each `read_captured_events`
/// call pops the next step. Steps past the end of the script yield no
/// events, so a controller just sees stagnation.
#[derive(Default)]
pub struct ScriptedSession {
    fail_open: bool,
    fail_trigger: bool,
    steps: VecDeque<Step>,
    bodies: HashMap<String, String>,
    next_id: usize,
    pub opened: Vec<String>,
    pub trigger_count: usize,
}

impl ScriptedSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// A session whose `open` always fails (initialization-fatal path).
    pub fn failing_open() -> Self {
        Self {
            fail_open: true,
            ..Self::default()
        }
    }

    pub fn failing_trigger(mut self) -> Self {
        self.fail_trigger = true;
        self
    }

    /// Append one step delivering the given response bodies.
    pub fn with_step(mut self, bodies: &[String]) -> Self {
        let events = bodies
            .iter()
            .map(|body| {
                self.next_id += 1;
                (format!("req-{}", self.next_id), body.clone())
            })
            .collect();
        self.steps.push_back(Step::Events(events));
        self
    }

    /// Append one step whose event read fails.
    pub fn with_read_error(mut self) -> Self {
        self.steps.push_back(Step::ReadError);
        self
    }
}

impl BrowserSession for ScriptedSession {
    fn open(&mut self, url: &str) -> anyhow::Result<()> {
        if self.fail_open {
            return Err(anyhow!("scripted open failure"));
        }
        self.opened.push(url.to_string());
        Ok(())
    }

    fn inject_session_cookie(&mut self, _value: &str) -> anyhow::Result<()> {
        Ok(())
    }

    fn trigger_load_more(&mut self) -> anyhow::Result<()> {
        if self.fail_trigger {
            return Err(anyhow!("scripted trigger failure"));
        }
        self.trigger_count += 1;
        Ok(())
    }

    fn read_captured_events(&mut self) -> anyhow::Result<Vec<RawNetworkEvent>> {
        match self.steps.pop_front() {
            None => Ok(Vec::new()),
            Some(Step::ReadError) => Err(anyhow!("scripted read failure")),
            Some(Step::Events(events)) => {
                let mut out = Vec::new();
                for (request_id, body) in events {
                    self.bodies.insert(request_id.clone(), body);
                    out.push(RawNetworkEvent {
                        method: "Network.responseReceived".to_string(),
                        request_id,
                        url: "https://www.instagram.com/graphql/query".to_string(),
                    });
                }
                Ok(out)
            }
        }
    }

    fn fetch_event_body(&mut self, request_id: &str) -> anyhow::Result<String> {
        self.bodies
            .get(request_id)
            .cloned()
            .ok_or_else(|| anyhow!("no scripted body for {request_id}"))
    }
}

/// Hands out pre-built scripted sessions, one per `create` call. Runs dry
/// with an error, which exercises the worker's give-up path.
pub struct ScriptedFactory {
    sessions: Mutex<VecDeque<anyhow::Result<ScriptedSession>>>,
}

impl ScriptedFactory {
    pub fn new(sessions: Vec<ScriptedSession>) -> Self {
        Self {
            sessions: Mutex::new(sessions.into_iter().map(Ok).collect()),
        }
    }

    /// Scripts the creation results themselves, errors included.
    pub fn with_results(results: Vec<anyhow::Result<ScriptedSession>>) -> Self {
        Self {
            sessions: Mutex::new(results.into()),
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }
}

impl SessionFactory for ScriptedFactory {
    fn create(&self) -> anyhow::Result<Box<dyn BrowserSession>> {
        self.sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .unwrap_or_else(|| Err(anyhow!("no scripted session available")))
            .map(|session| Box::new(session) as Box<dyn BrowserSession>)
    }
}

/// Picture fetcher that performs no IO and reports a fixed result.
pub struct StubPictureFetcher {
    pub succeed: bool,
}

impl PictureFetcher for StubPictureFetcher {
    fn download(&self, _item: &WorkItem, _profile: &ProfileSnapshot, _dir: &Path) -> bool {
        self.succeed
    }
}
