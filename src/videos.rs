//! Video publishing, lookup, listing, and ownership-gated mutation.

use std::path::PathBuf;

use crate::error::{ApiError, ApiResult};
use crate::media::{MediaCategory, MediaStorage};
use crate::ownership::{ActorId, authorize_owner, patch_text, require_text, validate_id};
use crate::pagination::{Page, PageQuery};
use crate::store::{Store, VideoFilter, VideoRecord, VideoSort, new_id, now};

/// Validated publish request. The file paths point at staged uploads the
/// transport layer already received.
#[derive(Debug)]
pub struct PublishVideoInput {
    pub title: String,
    pub description: String,
    pub video_file: PathBuf,
    pub thumbnail_file: PathBuf,
    pub publish: bool,
}

/// Partial update; blank or missing fields leave stored values untouched.
#[derive(Debug, Default)]
pub struct UpdateVideoInput {
    pub title: Option<String>,
    pub description: Option<String>,
    pub thumbnail_url: Option<String>,
}

/// Listing parameters after query-string parsing.
#[derive(Debug, Default)]
pub struct ListVideosInput {
    pub page: PageQuery,
    pub search: Option<String>,
    pub owner_id: Option<String>,
    pub sort_by: Option<String>,
    pub ascending: bool,
}

/// Publishes a new video. Both uploads must come back from the media
/// collaborator with a usable URL before any row is written.
pub fn publish_video(
    store: &Store,
    media: &dyn MediaStorage,
    actor: &ActorId,
    input: PublishVideoInput,
) -> ApiResult<VideoRecord> {
    let title = require_text("title", &input.title)?;

    let video_upload = media
        .store_media(&input.video_file, MediaCategory::Video)
        .map_err(|err| ApiError::Upstream(format!("video upload failed: {err}")))?;
    if video_upload.url.is_empty() {
        return Err(ApiError::Upstream(
            "media storage returned no video URL".into(),
        ));
    }

    let thumbnail_upload = media
        .store_media(&input.thumbnail_file, MediaCategory::Thumbnail)
        .map_err(|err| ApiError::Upstream(format!("thumbnail upload failed: {err}")))?;
    if thumbnail_upload.url.is_empty() {
        return Err(ApiError::Upstream(
            "media storage returned no thumbnail URL".into(),
        ));
    }

    store.ensure_user(actor.as_str())?;
    let stamp = now();
    let record = VideoRecord {
        id: new_id(),
        owner_id: actor.as_str().to_owned(),
        title,
        description: input.description.trim().to_owned(),
        video_url: video_upload.url,
        thumbnail_url: thumbnail_upload.url,
        duration: video_upload.duration.unwrap_or(0),
        views: 0,
        is_published: input.publish,
        created_at: stamp.clone(),
        updated_at: stamp,
    };
    store.insert_video(&record)?;
    Ok(record)
}

pub fn get_video(store: &Store, id: &str) -> ApiResult<VideoRecord> {
    validate_id("video", id)?;
    store
        .get_video(id)?
        .ok_or_else(|| ApiError::not_found("video", id))
}

pub fn list_videos(store: &Store, input: ListVideosInput) -> ApiResult<Page<VideoRecord>> {
    let window = input.page.resolve()?;
    if let Some(owner) = &input.owner_id {
        validate_id("user", owner)?;
    }
    let sort = match input.sort_by.as_deref() {
        None | Some("created_at") => VideoSort::CreatedAt,
        Some("views") => VideoSort::Views,
        Some("duration") => VideoSort::Duration,
        Some("title") => VideoSort::Title,
        Some(other) => {
            return Err(ApiError::invalid(format!("unknown sort field {other:?}")));
        }
    };

    let filter = VideoFilter {
        search: input.search.filter(|s| !s.trim().is_empty()),
        owner_id: input.owner_id,
        sort,
        ascending: input.ascending,
    };
    let (items, total) = store.list_videos(&filter, window.offset(), window.limit)?;
    Ok(Page::new(items, window, total))
}

/// Ownership-gated partial update of title/description/thumbnail.
pub fn update_video(
    store: &Store,
    actor: &ActorId,
    id: &str,
    input: UpdateVideoInput,
) -> ApiResult<VideoRecord> {
    validate_id("video", id)?;
    let mut video = store
        .get_video(id)?
        .ok_or_else(|| ApiError::not_found("video", id))?;
    authorize_owner(&video, actor)?;

    let mut changed = patch_text(&mut video.title, input.title.as_deref());
    changed |= patch_text(&mut video.description, input.description.as_deref());
    changed |= patch_text(&mut video.thumbnail_url, input.thumbnail_url.as_deref());
    if changed {
        video.updated_at = now();
        store.update_video(&video)?;
    }
    Ok(video)
}

/// Ownership-gated delete; returns the removed record.
pub fn delete_video(store: &Store, actor: &ActorId, id: &str) -> ApiResult<VideoRecord> {
    validate_id("video", id)?;
    let video = store
        .get_video(id)?
        .ok_or_else(|| ApiError::not_found("video", id))?;
    authorize_owner(&video, actor)?;
    store.delete_video(id)?;
    Ok(video)
}

/// Ownership-gated publish-status flip.
pub fn toggle_publish(store: &Store, actor: &ActorId, id: &str) -> ApiResult<VideoRecord> {
    validate_id("video", id)?;
    let video = store
        .get_video(id)?
        .ok_or_else(|| ApiError::not_found("video", id))?;
    authorize_owner(&video, actor)?;
    store
        .toggle_publish(id)?
        .ok_or_else(|| ApiError::not_found("video", id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::UploadedMedia;
    use anyhow::anyhow;
    use std::path::Path;
    use tempfile::TempDir;

    struct StubMedia {
        url_prefix: &'static str,
    }

    impl MediaStorage for StubMedia {
        fn store_media(
            &self,
            _staged: &Path,
            category: MediaCategory,
        ) -> anyhow::Result<UploadedMedia> {
            Ok(UploadedMedia {
                url: format!("{}/{}/file", self.url_prefix, category.subdir()),
                mime_type: None,
                duration: Some(42),
            })
        }

        fn resolve_local(&self, _url: &str) -> Option<PathBuf> {
            None
        }
    }

    struct BrokenMedia;

    impl MediaStorage for BrokenMedia {
        fn store_media(
            &self,
            _staged: &Path,
            _category: MediaCategory,
        ) -> anyhow::Result<UploadedMedia> {
            Err(anyhow!("bucket unavailable"))
        }

        fn resolve_local(&self, _url: &str) -> Option<PathBuf> {
            None
        }
    }

    /// Collaborator that "succeeds" but hands back no URL.
    struct UrllessMedia;

    impl MediaStorage for UrllessMedia {
        fn store_media(
            &self,
            _staged: &Path,
            _category: MediaCategory,
        ) -> anyhow::Result<UploadedMedia> {
            Ok(UploadedMedia {
                url: String::new(),
                mime_type: None,
                duration: None,
            })
        }

        fn resolve_local(&self, _url: &str) -> Option<PathBuf> {
            None
        }
    }

    fn open_store() -> (TempDir, Store) {
        let dir = TempDir::new().unwrap();
        let store = Store::open(dir.path().join("test.db")).unwrap();
        (dir, store)
    }

    fn actor() -> ActorId {
        ActorId::parse(&new_id()).unwrap()
    }

    fn publish_input() -> PublishVideoInput {
        PublishVideoInput {
            title: "My clip".into(),
            description: "about things".into(),
            video_file: PathBuf::from("/tmp/staged/clip.mp4"),
            thumbnail_file: PathBuf::from("/tmp/staged/thumb.jpg"),
            publish: true,
        }
    }

    #[test]
    fn publish_persists_record_with_upload_metadata() {
        let (_dir, store) = open_store();
        let owner = actor();
        let media = StubMedia { url_prefix: "https://cdn" };

        let video = publish_video(&store, &media, &owner, publish_input()).unwrap();
        assert_eq!(video.video_url, "https://cdn/videos/file");
        assert_eq!(video.thumbnail_url, "https://cdn/thumbnails/file");
        assert_eq!(video.duration, 42);
        assert_eq!(video.owner_id, owner.as_str());
        assert!(store.get_video(&video.id).unwrap().is_some());
        assert!(store.user_exists(owner.as_str()).unwrap());
    }

    #[test]
    fn failed_upload_persists_nothing() {
        let (_dir, store) = open_store();
        let err = publish_video(&store, &BrokenMedia, &actor(), publish_input()).unwrap_err();
        assert!(matches!(err, ApiError::Upstream(_)));

        let (videos, total) = store
            .list_videos(&VideoFilter::default(), 0, 10)
            .unwrap();
        assert!(videos.is_empty());
        assert_eq!(total, 0);
    }

    #[test]
    fn upload_without_url_persists_nothing() {
        let (_dir, store) = open_store();
        let err = publish_video(&store, &UrllessMedia, &actor(), publish_input()).unwrap_err();
        assert!(matches!(err, ApiError::Upstream(_)));
        let (_, total) = store.list_videos(&VideoFilter::default(), 0, 10).unwrap();
        assert_eq!(total, 0);
    }

    #[test]
    fn blank_title_is_rejected_before_upload() {
        let (_dir, store) = open_store();
        let mut input = publish_input();
        input.title = "   ".into();
        // BrokenMedia would fail the upload; the blank title must win first.
        let err = publish_video(&store, &BrokenMedia, &actor(), input).unwrap_err();
        assert!(matches!(err, ApiError::InvalidArgument(_)));
    }

    #[test]
    fn update_ignores_blank_fields() {
        let (_dir, store) = open_store();
        let owner = actor();
        let media = StubMedia { url_prefix: "https://cdn" };
        let video = publish_video(&store, &media, &owner, publish_input()).unwrap();

        let updated = update_video(
            &store,
            &owner,
            &video.id,
            UpdateVideoInput {
                title: Some("  ".into()),
                description: Some("new description".into()),
                thumbnail_url: None,
            },
        )
        .unwrap();
        assert_eq!(updated.title, "My clip");
        assert_eq!(updated.description, "new description");
    }

    #[test]
    fn non_owner_mutation_is_forbidden_and_leaves_state_unchanged() {
        let (_dir, store) = open_store();
        let owner = actor();
        let media = StubMedia { url_prefix: "https://cdn" };
        let video = publish_video(&store, &media, &owner, publish_input()).unwrap();
        let before = store.get_video(&video.id).unwrap().unwrap();

        let intruder = actor();
        let err = update_video(
            &store,
            &intruder,
            &video.id,
            UpdateVideoInput {
                title: Some("hijacked".into()),
                ..UpdateVideoInput::default()
            },
        )
        .unwrap_err();
        assert!(matches!(err, ApiError::Forbidden { kind: "video", .. }));

        let after = store.get_video(&video.id).unwrap().unwrap();
        assert_eq!(serde_json::to_string(&before).unwrap(), serde_json::to_string(&after).unwrap());

        let err = toggle_publish(&store, &intruder, &video.id).unwrap_err();
        assert!(matches!(err, ApiError::Forbidden { .. }));
        let err = delete_video(&store, &intruder, &video.id).unwrap_err();
        assert!(matches!(err, ApiError::Forbidden { .. }));
        assert!(store.get_video(&video.id).unwrap().is_some());
    }

    #[test]
    fn publish_toggle_alternates() {
        let (_dir, store) = open_store();
        let owner = actor();
        let media = StubMedia { url_prefix: "https://cdn" };
        let video = publish_video(&store, &media, &owner, publish_input()).unwrap();
        assert!(video.is_published);

        let flipped = toggle_publish(&store, &owner, &video.id).unwrap();
        assert!(!flipped.is_published);
        let flipped = toggle_publish(&store, &owner, &video.id).unwrap();
        assert!(flipped.is_published);
    }

    #[test]
    fn listing_pages_through_results() {
        let (_dir, store) = open_store();
        let owner = actor();
        let media = StubMedia { url_prefix: "https://cdn" };
        for i in 0..25 {
            let mut input = publish_input();
            input.title = format!("clip {i}");
            publish_video(&store, &media, &owner, input).unwrap();
        }

        let page = list_videos(
            &store,
            ListVideosInput {
                page: PageQuery {
                    page: Some(2),
                    limit: Some(10),
                },
                ..ListVideosInput::default()
            },
        )
        .unwrap();
        assert_eq!(page.items.len(), 10);
        assert_eq!(page.pagination.current_page, 2);
        assert_eq!(page.pagination.total_pages, 3);
        assert_eq!(page.pagination.total_items, 25);
    }

    #[test]
    fn unknown_sort_field_is_rejected() {
        let (_dir, store) = open_store();
        let err = list_videos(
            &store,
            ListVideosInput {
                sort_by: Some("owner_id".into()),
                ..ListVideosInput::default()
            },
        )
        .unwrap_err();
        assert!(matches!(err, ApiError::InvalidArgument(_)));
    }
}
