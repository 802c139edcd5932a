//! Like toggling for videos, comments, and tweets.

use crate::error::{ApiError, ApiResult};
use crate::ownership::{ActorId, validate_id};
use crate::store::{LikeTarget, Store};
use crate::toggle::{ToggleOutcome, toggle_relation};

/// Flips the actor's like on the target. The target must exist; the relation
/// itself is the only state that changes.
pub fn toggle_like(
    store: &Store,
    actor: &ActorId,
    target: LikeTarget,
    target_id: &str,
) -> ApiResult<ToggleOutcome> {
    validate_id(target.kind(), target_id)?;

    if !store.like_target_exists(target, target_id)? {
        return Err(ApiError::not_found(target.kind(), target_id));
    }

    store.ensure_user(actor.as_str())?;
    toggle_relation(
        || Ok(store.like_exists(actor.as_str(), target, target_id)?),
        || Ok(store.insert_like(actor.as_str(), target, target_id)?),
        || Ok(store.delete_like(actor.as_str(), target, target_id)?),
    )
}

/// Ids of the videos the actor currently likes.
pub fn liked_videos(store: &Store, actor: &ActorId) -> ApiResult<Vec<String>> {
    Ok(store.liked_video_ids(actor.as_str())?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{VideoRecord, new_id, now};
    use tempfile::TempDir;

    fn open_store() -> (TempDir, Store) {
        let dir = TempDir::new().unwrap();
        let store = Store::open(dir.path().join("test.db")).unwrap();
        (dir, store)
    }

    fn actor() -> ActorId {
        ActorId::parse(&new_id()).unwrap()
    }

    fn insert_video(store: &Store, owner: &str) -> String {
        let stamp = now();
        let video = VideoRecord {
            id: new_id(),
            owner_id: owner.to_owned(),
            title: "clip".into(),
            description: String::new(),
            video_url: "/media/videos/clip.mp4".into(),
            thumbnail_url: "/media/thumbnails/clip.jpg".into(),
            duration: 0,
            views: 0,
            is_published: true,
            created_at: stamp.clone(),
            updated_at: stamp,
        };
        store.insert_video(&video).unwrap();
        video.id
    }

    #[test]
    fn double_toggle_returns_to_original_state() {
        let (_dir, store) = open_store();
        let actor = actor();
        let video_id = insert_video(&store, "someone");

        let first = toggle_like(&store, &actor, LikeTarget::Video, &video_id).unwrap();
        assert_eq!(first, ToggleOutcome::Added);
        assert!(
            store
                .like_exists(actor.as_str(), LikeTarget::Video, &video_id)
                .unwrap()
        );

        let second = toggle_like(&store, &actor, LikeTarget::Video, &video_id).unwrap();
        assert_eq!(second, ToggleOutcome::Removed);
        assert!(
            !store
                .like_exists(actor.as_str(), LikeTarget::Video, &video_id)
                .unwrap()
        );
    }

    #[test]
    fn missing_target_is_not_found() {
        let (_dir, store) = open_store();
        let err = toggle_like(&store, &actor(), LikeTarget::Video, &new_id()).unwrap_err();
        assert!(matches!(err, ApiError::NotFound { kind: "video", .. }));
    }

    #[test]
    fn malformed_target_id_is_rejected() {
        let (_dir, store) = open_store();
        let err = toggle_like(&store, &actor(), LikeTarget::Tweet, "not-an-id").unwrap_err();
        assert!(matches!(err, ApiError::InvalidArgument(_)));
    }

    #[test]
    fn liked_videos_lists_only_video_likes() {
        let (_dir, store) = open_store();
        let actor = actor();
        let video_id = insert_video(&store, "someone");
        toggle_like(&store, &actor, LikeTarget::Video, &video_id).unwrap();

        assert_eq!(liked_videos(&store, &actor).unwrap(), vec![video_id]);
    }
}
