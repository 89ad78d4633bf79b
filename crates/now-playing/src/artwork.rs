//! Best-effort cover art loading.
//!
//! Images are fetched by URL, decoded and scaled to a fixed square. Bytes
//! that fail to decode are cached as "no image"; a failed download is not
//! cached and is tried again on the next lookup.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use image::RgbaImage;
use image::imageops::FilterType;

use crate::PlayerError;

/// Edge length of decoded covers in pixels.
pub const COVER_SIZE: u32 = 100;
const DEFAULT_CACHE_CAPACITY: usize = 32;
const COVER_TIMEOUT: Duration = Duration::from_secs(5);

pub type CoverImage = Arc<RgbaImage>;

/// Decode `bytes` and scale them to `COVER_SIZE` x `COVER_SIZE`.
pub fn decode_cover(bytes: &[u8]) -> Result<RgbaImage, PlayerError> {
    let img = image::load_from_memory(bytes)?;
    tracing::debug!(
        orig_w = img.width(),
        orig_h = img.height(),
        size = COVER_SIZE,
        "Scaling cover art"
    );
    Ok(img
        .resize_exact(COVER_SIZE, COVER_SIZE, FilterType::Lanczos3)
        .to_rgba8())
}

/// URL-keyed store of decoded covers, filled lazily on first lookup.
pub struct ImageCache {
    http: reqwest::Client,
    entries: HashMap<String, Option<CoverImage>>,
    order: VecDeque<String>,
    capacity: usize,
}

impl Default for ImageCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}

impl ImageCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            http: crate::http_client(COVER_TIMEOUT),
            entries: HashMap::new(),
            order: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether `url` has a cached entry, decoded or known-undecodable.
    pub fn contains(&self, url: &str) -> bool {
        self.entries.contains_key(url)
    }

    pub fn cached(&self, url: &str) -> Option<CoverImage> {
        self.entries.get(url).cloned().flatten()
    }

    /// Return the cover for `url`, fetching it on first lookup.
    pub async fn fetch(&mut self, url: &str) -> Option<CoverImage> {
        if let Some(entry) = self.entries.get(url) {
            return entry.clone();
        }
        let bytes = match self.download(url).await {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(url, error = %e, "Cover art download failed, will retry");
                return None;
            }
        };
        self.insert_bytes(url, &bytes)
    }

    /// Decode `bytes` as the cover for `url` and cache the result.
    pub fn insert_bytes(&mut self, url: &str, bytes: &[u8]) -> Option<CoverImage> {
        let cover = match decode_cover(bytes) {
            Ok(img) => Some(Arc::new(img)),
            Err(e) => {
                tracing::warn!(url, error = %e, "Cover art decode failed");
                None
            }
        };
        self.insert(url, cover.clone());
        cover
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>, PlayerError> {
        let resp = self.http.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                PlayerError::Timeout
            } else {
                PlayerError::Http(e)
            }
        })?;
        let status = resp.status();
        if !status.is_success() {
            return Err(PlayerError::Api {
                status: status.as_u16(),
                message: format!("cover art request to {url} failed"),
            });
        }
        Ok(resp.bytes().await?.to_vec())
    }

    fn insert(&mut self, url: &str, cover: Option<CoverImage>) {
        if self.entries.insert(url.to_string(), cover).is_none() {
            self.order.push_back(url.to_string());
        }
        while self.order.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.entries.remove(&oldest);
            }
        }
    }
}
