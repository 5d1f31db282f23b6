//! Profile picture download over plain HTTP, outside the browser session.

use std::fs;
use std::path::Path;
use std::thread;
use std::time::Duration;

use gramsieve_common::{ProfileSnapshot, WorkItem};
use tokio::runtime::Handle;
use tracing::{error, info, warn};

const DOWNLOAD_ATTEMPTS: u32 = 3;
const RETRY_PAUSE: Duration = Duration::from_secs(1);
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(10);

/// Saves a profile's picture next to its JSON artifacts. Failure is
/// reported, never fatal to the item.
pub trait PictureFetcher: Send + Sync {
    fn download(&self, item: &WorkItem, profile: &ProfileSnapshot, dir: &Path) -> bool;
}

pub struct HttpPictureFetcher {
    handle: Handle,
    client: reqwest::Client,
}

impl HttpPictureFetcher {
    pub fn new(handle: Handle) -> Self {
        let client = reqwest::Client::builder()
            .timeout(DOWNLOAD_TIMEOUT)
            .build()
            .expect("Failed to build HTTP client");
        Self { handle, client }
    }

    fn fetch_bytes(&self, url: &str) -> anyhow::Result<Vec<u8>> {
        self.handle.block_on(async {
            let response = self.client.get(url).send().await?.error_for_status()?;
            Ok(response.bytes().await?.to_vec())
        })
    }
}

impl PictureFetcher for HttpPictureFetcher {
    fn download(&self, item: &WorkItem, profile: &ProfileSnapshot, dir: &Path) -> bool {
        let Some(url) = profile.picture_url() else {
            warn!(item = %item.short_name, "profile exposes no picture url");
            return false;
        };
        let ext = if url.to_lowercase().contains(".jpg") {
            "jpg"
        } else {
            "png"
        };
        let path = dir.join(format!("{}.{ext}", item.short_name));

        for attempt in 1..=DOWNLOAD_ATTEMPTS {
            match self.fetch_bytes(url) {
                Ok(bytes) => match fs::write(&path, &bytes) {
                    Ok(()) => {
                        info!(item = %item.short_name, path = %path.display(), "picture saved");
                        return true;
                    }
                    Err(error) => warn!(%error, attempt, "writing picture file failed"),
                },
                Err(error) => {
                    warn!(%error, attempt, item = %item.short_name, "picture download failed");
                }
            }
            if attempt < DOWNLOAD_ATTEMPTS {
                thread::sleep(RETRY_PAUSE);
            }
        }

        error!(item = %item.short_name, "giving up on profile picture");
        false
    }
}
