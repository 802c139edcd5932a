//! Media storage collaborator.
//!
//! The publish flow hands staged uploads to a `MediaStorage` implementation
//! and persists nothing until it returns a durable URL. The production
//! implementation keeps files on local disk under `MEDIA_ROOT`; tests swap in
//! stubs.

use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result, bail};
use mime_guess::MimeGuess;
use uuid::Uuid;

/// Where a stored file lives under the media root.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaCategory {
    Video,
    Thumbnail,
}

impl MediaCategory {
    pub fn subdir(self) -> &'static str {
        match self {
            Self::Video => "videos",
            Self::Thumbnail => "thumbnails",
        }
    }
}

/// What the collaborator reports back after accepting an upload.
#[derive(Debug, Clone)]
pub struct UploadedMedia {
    /// Durable URL the stored file is reachable under. An empty URL is a
    /// collaborator failure the caller must surface before persisting.
    pub url: String,
    pub mime_type: Option<String>,
    /// Container duration in seconds when the collaborator can report it.
    pub duration: Option<i64>,
}

pub trait MediaStorage: Send + Sync {
    /// Moves a staged upload into durable storage and returns its metadata.
    fn store_media(&self, staged: &Path, category: MediaCategory) -> Result<UploadedMedia>;

    /// Maps a URL previously returned by `store_media` back to a local file,
    /// when the implementation keeps files on this host.
    fn resolve_local(&self, url: &str) -> Option<PathBuf>;
}

/// Disk-backed media storage serving files from `MEDIA_ROOT` under
/// `{public_base}/media/{category}/{file}` URLs.
#[derive(Debug, Clone)]
pub struct LocalMediaStorage {
    root: PathBuf,
    public_base: String,
}

impl LocalMediaStorage {
    pub fn new(root: impl Into<PathBuf>, public_base: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_base: public_base.into().trim_end_matches('/').to_owned(),
        }
    }
}

impl MediaStorage for LocalMediaStorage {
    fn store_media(&self, staged: &Path, category: MediaCategory) -> Result<UploadedMedia> {
        if !staged.is_file() {
            bail!("staged upload {} does not exist", staged.display());
        }

        let ext = staged
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or("bin");
        let file_name = format!("{}.{ext}", Uuid::new_v4());
        let dir = self.root.join(category.subdir());
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("creating media directory {}", dir.display()))?;

        let target = dir.join(&file_name);
        std::fs::copy(staged, &target)
            .with_context(|| format!("storing upload as {}", target.display()))?;

        let mime_type = MimeGuess::from_path(&target)
            .first()
            .map(|mime| mime.to_string());

        Ok(UploadedMedia {
            url: format!("{}/media/{}/{file_name}", self.public_base, category.subdir()),
            mime_type,
            // Probing container duration needs a demuxer this service does
            // not ship; callers fall back to zero.
            duration: None,
        })
    }

    fn resolve_local(&self, url: &str) -> Option<PathBuf> {
        let relative = url
            .strip_prefix(&self.public_base)
            .unwrap_or(url)
            .strip_prefix("/media/")?;
        let relative = Path::new(relative);
        // Reject anything that could escape the media root.
        if relative
            .components()
            .any(|part| !matches!(part, Component::Normal(_)))
        {
            return None;
        }
        Some(self.root.join(relative))
    }
}
