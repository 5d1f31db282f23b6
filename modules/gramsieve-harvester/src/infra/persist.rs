//! Writes harvested artifacts to one directory per profile.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use gramsieve_common::{WorkItem, TIMELINE_QUERY};
use serde_json::{json, Value};
use tracing::debug;

use crate::harvest::merge::Accumulation;

const PROFILE_FILE: &str = "userInfo.json";
const TIMELINE_FILE: &str = "postInfo.json";

pub struct ArtifactWriter {
    output_dir: PathBuf,
}

impl ArtifactWriter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    /// Persist whatever `acc` holds into `<output>/<short_name>/` and
    /// return that directory. Timeline records get a browsable post URL
    /// stamped onto each node before writing.
    pub fn write(&self, item: &WorkItem, acc: Accumulation) -> anyhow::Result<PathBuf> {
        let dir = self.output_dir.join(&item.short_name);
        fs::create_dir_all(&dir)
            .with_context(|| format!("creating artifact directory {}", dir.display()))?;

        let (profile, timeline) = acc.into_artifacts();

        if let Some(profile) = profile {
            write_json(&dir.join(PROFILE_FILE), &profile)?;
        }
        if let Some(mut timeline) = timeline {
            decorate_records(&mut timeline);
            write_json(&dir.join(TIMELINE_FILE), &timeline)?;
        }

        debug!(dir = %dir.display(), "artifacts written");
        Ok(dir)
    }
}

fn write_json(path: &Path, value: &Value) -> anyhow::Result<()> {
    let body = serde_json::to_string_pretty(value)
        .with_context(|| format!("serializing {}", path.display()))?;
    fs::write(path, body).with_context(|| format!("writing {}", path.display()))
}

/// Stamp `post_url` and `post_code` onto every record node that carries a
/// shortcode, so the output is browsable without reassembling URLs.
fn decorate_records(envelope: &mut Value) {
    let pointer = format!("/data/{TIMELINE_QUERY}/edges");
    let Some(edges) = envelope.pointer_mut(&pointer).and_then(Value::as_array_mut) else {
        return;
    };
    for edge in edges {
        let Some(node) = edge.get_mut("node").and_then(Value::as_object_mut) else {
            continue;
        };
        let Some(code) = node.get("shortcode").and_then(Value::as_str).map(str::to_string) else {
            continue;
        };
        node.insert(
            "post_url".to_string(),
            json!(format!("https://www.instagram.com/p/{code}/")),
        );
        node.insert("post_code".to_string(), json!(code));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::harvest::classify::classify_body;
    use crate::testing::{profile_body, timeline_body};

    fn accumulated(bodies: &[String]) -> Accumulation {
        let mut acc = Accumulation::new();
        for body in bodies {
            acc.apply(classify_body(body));
        }
        acc
    }

    #[test]
    fn writes_profile_and_timeline_under_the_item_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let writer = ArtifactWriter::new(tmp.path());
        let item = WorkItem::new("https://www.instagram.com/someone/");
        let acc = accumulated(&[profile_body(false), timeline_body(&["1", "2"])]);

        let dir = writer.write(&item, acc).unwrap();

        assert_eq!(dir, tmp.path().join("someone"));
        assert!(dir.join("userInfo.json").is_file());
        assert!(dir.join("postInfo.json").is_file());
    }

    #[test]
    fn timeline_records_gain_post_urls() {
        let tmp = tempfile::tempdir().unwrap();
        let writer = ArtifactWriter::new(tmp.path());
        let item = WorkItem::new("https://www.instagram.com/someone/");
        let acc = accumulated(&[timeline_body(&["9"])]);

        let dir = writer.write(&item, acc).unwrap();

        let body = std::fs::read_to_string(dir.join("postInfo.json")).unwrap();
        assert!(body.contains("https://www.instagram.com/p/sc9/"));
        assert!(body.contains("\"post_code\""));
    }

    #[test]
    fn profile_only_accumulation_skips_the_timeline_file() {
        let tmp = tempfile::tempdir().unwrap();
        let writer = ArtifactWriter::new(tmp.path());
        let item = WorkItem::new("https://www.instagram.com/someone/");
        let acc = accumulated(&[profile_body(true)]);

        let dir = writer.write(&item, acc).unwrap();

        assert!(dir.join("userInfo.json").is_file());
        assert!(!dir.join("postInfo.json").exists());
    }

    #[test]
    fn records_without_shortcodes_are_left_untouched() {
        let mut envelope = serde_json::json!({ "data": { TIMELINE_QUERY: {
            "edges": [{ "node": { "id": "1" } }]
        }}});

        decorate_records(&mut envelope);

        let node = envelope
            .pointer(&format!("/data/{TIMELINE_QUERY}/edges/0/node"))
            .unwrap();
        assert!(node.get("post_url").is_none());
    }
}
