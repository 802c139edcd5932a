//! Playlists: ownership-gated metadata edits plus set-semantics membership.
//!
//! Membership is stored as an ordered sequence but behaves as a set: adding a
//! video that is already present is a no-op, and a given video id never
//! appears twice. The storage layer backs this with a UNIQUE constraint so
//! concurrent adds cannot slip a duplicate past the in-sequence check.

use serde::Serialize;

use crate::error::{ApiError, ApiResult};
use crate::ownership::{ActorId, authorize_owner, patch_text, require_text, validate_id};
use crate::store::{PlaylistRecord, Store, VideoRecord, new_id, now};

/// Validated create request.
#[derive(Debug)]
pub struct CreatePlaylistInput {
    pub name: String,
    pub description: String,
}

/// Partial metadata update; blank fields are ignored.
#[derive(Debug, Default)]
pub struct UpdatePlaylistInput {
    pub name: Option<String>,
    pub description: Option<String>,
}

/// Playlist with its member videos resolved to full records.
#[derive(Debug, Serialize)]
pub struct PlaylistDetail {
    #[serde(flatten)]
    pub playlist: PlaylistRecord,
    pub videos: Vec<VideoRecord>,
}

pub fn create_playlist(
    store: &Store,
    actor: &ActorId,
    input: CreatePlaylistInput,
) -> ApiResult<PlaylistRecord> {
    let name = require_text("name", &input.name)?;
    let description = require_text("description", &input.description)?;
    store.ensure_user(actor.as_str())?;

    let stamp = now();
    let playlist = PlaylistRecord {
        id: new_id(),
        owner_id: actor.as_str().to_owned(),
        name,
        description,
        video_ids: Vec::new(),
        created_at: stamp.clone(),
        updated_at: stamp,
    };
    store.insert_playlist(&playlist)?;
    Ok(playlist)
}

pub fn user_playlists(store: &Store, user_id: &str) -> ApiResult<Vec<PlaylistRecord>> {
    validate_id("user", user_id)?;
    Ok(store.list_playlists_by_owner(user_id)?)
}

/// Loads a playlist and resolves its members. Members whose video has since
/// been deleted are skipped rather than failing the whole lookup.
pub fn playlist_detail(store: &Store, playlist_id: &str) -> ApiResult<PlaylistDetail> {
    let playlist = load(store, playlist_id)?;
    let mut videos = Vec::with_capacity(playlist.video_ids.len());
    for video_id in &playlist.video_ids {
        if let Some(video) = store.get_video(video_id)? {
            videos.push(video);
        }
    }
    Ok(PlaylistDetail { playlist, videos })
}

pub fn update_playlist(
    store: &Store,
    actor: &ActorId,
    playlist_id: &str,
    input: UpdatePlaylistInput,
) -> ApiResult<PlaylistRecord> {
    let mut playlist = load(store, playlist_id)?;
    authorize_owner(&playlist, actor)?;

    let mut changed = patch_text(&mut playlist.name, input.name.as_deref());
    changed |= patch_text(&mut playlist.description, input.description.as_deref());
    if changed {
        playlist.updated_at = now();
        store.update_playlist(&playlist)?;
    }
    Ok(playlist)
}

pub fn delete_playlist(
    store: &Store,
    actor: &ActorId,
    playlist_id: &str,
) -> ApiResult<PlaylistRecord> {
    let playlist = load(store, playlist_id)?;
    authorize_owner(&playlist, actor)?;
    store.delete_playlist(playlist_id)?;
    Ok(playlist)
}

/// Idempotent member add: the video must exist, and adding an existing
/// member returns the current playlist unchanged.
pub fn add_video(
    store: &Store,
    actor: &ActorId,
    playlist_id: &str,
    video_id: &str,
) -> ApiResult<PlaylistRecord> {
    validate_id("video", video_id)?;
    let playlist = load(store, playlist_id)?;
    authorize_owner(&playlist, actor)?;
    if store.get_video(video_id)?.is_none() {
        return Err(ApiError::not_found("video", video_id));
    }

    if playlist.video_ids.iter().any(|id| id == video_id) {
        return Ok(playlist);
    }
    // A concurrent add may have won since the scan above; the UNIQUE
    // constraint makes that a no-op too.
    store.add_playlist_video(playlist_id, video_id)?;
    load(store, playlist_id)
}

/// Removes a member; a video that is not in the playlist is `NotFound`.
pub fn remove_video(
    store: &Store,
    actor: &ActorId,
    playlist_id: &str,
    video_id: &str,
) -> ApiResult<PlaylistRecord> {
    validate_id("video", video_id)?;
    let playlist = load(store, playlist_id)?;
    authorize_owner(&playlist, actor)?;

    if !store.remove_playlist_video(playlist_id, video_id)? {
        return Err(ApiError::not_found("playlist video", video_id));
    }
    load(store, playlist_id)
}

fn load(store: &Store, playlist_id: &str) -> ApiResult<PlaylistRecord> {
    validate_id("playlist", playlist_id)?;
    store
        .get_playlist(playlist_id)?
        .ok_or_else(|| ApiError::not_found("playlist", playlist_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn open_store() -> (TempDir, Store) {
        let dir = TempDir::new().unwrap();
        let store = Store::open(dir.path().join("test.db")).unwrap();
        (dir, store)
    }

    fn actor() -> ActorId {
        ActorId::parse(&new_id()).unwrap()
    }

    fn insert_video(store: &Store) -> String {
        let stamp = now();
        let video = VideoRecord {
            id: new_id(),
            owner_id: new_id(),
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

    fn make_playlist(store: &Store, owner: &ActorId) -> PlaylistRecord {
        create_playlist(
            store,
            owner,
            CreatePlaylistInput {
                name: "watch later".into(),
                description: "queue".into(),
            },
        )
        .unwrap()
    }

    #[test]
    fn create_requires_name_and_description() {
        let (_dir, store) = open_store();
        let err = create_playlist(
            &store,
            &actor(),
            CreatePlaylistInput {
                name: "mix".into(),
                description: "  ".into(),
            },
        )
        .unwrap_err();
        assert!(matches!(err, ApiError::InvalidArgument(_)));
    }

    #[test]
    fn add_is_idempotent() {
        let (_dir, store) = open_store();
        let owner = actor();
        let playlist = make_playlist(&store, &owner);
        let video_id = insert_video(&store);

        let once = add_video(&store, &owner, &playlist.id, &video_id).unwrap();
        let twice = add_video(&store, &owner, &playlist.id, &video_id).unwrap();
        assert_eq!(once.video_ids, vec![video_id.clone()]);
        assert_eq!(twice.video_ids, once.video_ids);
    }

    #[test]
    fn add_requires_existing_video() {
        let (_dir, store) = open_store();
        let owner = actor();
        let playlist = make_playlist(&store, &owner);
        let err = add_video(&store, &owner, &playlist.id, &new_id()).unwrap_err();
        assert!(matches!(err, ApiError::NotFound { kind: "video", .. }));
    }

    #[test]
    fn remove_of_non_member_fails_and_fails_again() {
        let (_dir, store) = open_store();
        let owner = actor();
        let playlist = make_playlist(&store, &owner);
        let video_id = insert_video(&store);

        let err = remove_video(&store, &owner, &playlist.id, &video_id).unwrap_err();
        assert!(matches!(err, ApiError::NotFound { .. }));

        add_video(&store, &owner, &playlist.id, &video_id).unwrap();
        let removed = remove_video(&store, &owner, &playlist.id, &video_id).unwrap();
        assert!(removed.video_ids.is_empty());

        let err = remove_video(&store, &owner, &playlist.id, &video_id).unwrap_err();
        assert!(matches!(err, ApiError::NotFound { .. }));
    }

    #[test]
    fn non_owner_rename_is_forbidden_and_playlist_unchanged() {
        let (_dir, store) = open_store();
        let owner = actor();
        let playlist = make_playlist(&store, &owner);
        let va = insert_video(&store);
        let vb = insert_video(&store);
        add_video(&store, &owner, &playlist.id, &va).unwrap();
        add_video(&store, &owner, &playlist.id, &vb).unwrap();

        let intruder = actor();
        let err = update_playlist(
            &store,
            &intruder,
            &playlist.id,
            UpdatePlaylistInput {
                name: Some("stolen".into()),
                description: None,
            },
        )
        .unwrap_err();
        assert!(matches!(err, ApiError::Forbidden { kind: "playlist", .. }));

        let unchanged = store.get_playlist(&playlist.id).unwrap().unwrap();
        assert_eq!(unchanged.name, "watch later");
        assert_eq!(unchanged.video_ids, vec![va, vb]);
    }

    #[test]
    fn rename_ignores_blank_fields() {
        let (_dir, store) = open_store();
        let owner = actor();
        let playlist = make_playlist(&store, &owner);

        let updated = update_playlist(
            &store,
            &owner,
            &playlist.id,
            UpdatePlaylistInput {
                name: Some("  ".into()),
                description: Some("new queue".into()),
            },
        )
        .unwrap();
        assert_eq!(updated.name, "watch later");
        assert_eq!(updated.description, "new queue");
    }

    #[test]
    fn detail_resolves_member_videos() {
        let (_dir, store) = open_store();
        let owner = actor();
        let playlist = make_playlist(&store, &owner);
        let video_id = insert_video(&store);
        add_video(&store, &owner, &playlist.id, &video_id).unwrap();

        let detail = playlist_detail(&store, &playlist.id).unwrap();
        assert_eq!(detail.videos.len(), 1);
        assert_eq!(detail.videos[0].id, video_id);
    }

    #[test]
    fn delete_removes_playlist_and_membership() {
        let (_dir, store) = open_store();
        let owner = actor();
        let playlist = make_playlist(&store, &owner);
        let video_id = insert_video(&store);
        add_video(&store, &owner, &playlist.id, &video_id).unwrap();

        delete_playlist(&store, &owner, &playlist.id).unwrap();
        assert!(store.get_playlist(&playlist.id).unwrap().is_none());
    }
}
