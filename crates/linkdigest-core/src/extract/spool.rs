//! Temporary on-disk copies of page bodies for the disk-streamed tier.

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tokio::io::AsyncReadExt;
use uuid::Uuid;

use crate::Result;

const READ_CHUNK_BYTES: usize = 16 * 1024;

/// Bytes still read after the main content region starts
const CONTENT_WINDOW_BYTES: usize = 2 * READ_CHUNK_BYTES;

/// A spooled page file, removed when the guard is dropped
#[derive(Debug)]
pub struct SpoolFile {
    path: PathBuf,
}

impl SpoolFile {
    /// Reserve a unique path in `dir` keyed by a hash of the URL
    pub fn new(dir: &Path, url: &str) -> Result<Self> {
        std::fs::create_dir_all(dir)?;

        let digest = hex::encode(Sha256::digest(url.as_bytes()));
        let nonce = Uuid::new_v4().simple().to_string();
        let path = dir.join(format!("linkdigest-{}-{}.html", &digest[..16], &nonce[..8]));

        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for SpoolFile {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => tracing::debug!("Removed spool file {}", self.path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!("Failed to remove spool file {}: {}", self.path.display(), e),
        }
    }
}

/// Landmarks that tell the reader it has enough of the document head and body
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct HeadMarkers {
    pub title: bool,
    pub description: bool,
    /// Byte offset where the main content region starts
    pub main_start: Option<usize>,
}

impl HeadMarkers {
    pub fn scan(html: &str) -> Self {
        let lower = html.to_ascii_lowercase();

        let main_start = ["<article", "<main", "role=\"main\"", "role='main'", "id=\"content\"", "class=\"content\""]
            .iter()
            .filter_map(|marker| lower.find(marker))
            .min();

        Self {
            title: lower.contains("</title>"),
            description: lower.contains("name=\"description\"")
                || lower.contains("name='description'")
                || lower.contains("og:description"),
            main_start,
        }
    }

    pub fn complete(&self) -> bool {
        self.title && self.description && self.main_start.is_some()
    }
}

/// Read the spooled page back in chunks.
///
/// Stops at `ceiling` bytes, or once title, description and the start of the
/// main content have all been seen and a content window past that start is in.
pub async fn read_head(path: &Path, ceiling: usize) -> Result<String> {
    let mut file = tokio::fs::File::open(path).await?;
    let mut chunk = vec![0u8; READ_CHUNK_BYTES];
    let mut head: Vec<u8> = Vec::new();

    loop {
        let n = file.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        head.extend_from_slice(&chunk[..n]);

        if head.len() >= ceiling {
            head.truncate(ceiling);
            tracing::debug!("Spool read hit the {} byte ceiling", ceiling);
            break;
        }

        let markers = HeadMarkers::scan(&String::from_utf8_lossy(&head));
        if let (true, Some(start)) = (markers.complete(), markers.main_start) {
            if head.len() >= start + CONTENT_WINDOW_BYTES {
                break;
            }
        }
    }

    Ok(String::from_utf8_lossy(&head).into_owned())
}
