//! Comments on videos: paginated listing plus ownership-gated edits.

use crate::error::{ApiError, ApiResult};
use crate::ownership::{ActorId, authorize_owner, require_text, validate_id};
use crate::pagination::{Page, PageQuery};
use crate::store::{CommentRecord, Store, new_id, now};

pub fn list_comments(
    store: &Store,
    video_id: &str,
    page: PageQuery,
) -> ApiResult<Page<CommentRecord>> {
    validate_id("video", video_id)?;
    let window = page.resolve()?;
    if store.get_video(video_id)?.is_none() {
        return Err(ApiError::not_found("video", video_id));
    }
    let (items, total) = store.list_comments(video_id, window.offset(), window.limit)?;
    Ok(Page::new(items, window, total))
}

pub fn add_comment(
    store: &Store,
    actor: &ActorId,
    video_id: &str,
    content: &str,
) -> ApiResult<CommentRecord> {
    validate_id("video", video_id)?;
    let content = require_text("content", content)?;
    if store.get_video(video_id)?.is_none() {
        return Err(ApiError::not_found("video", video_id));
    }

    store.ensure_user(actor.as_str())?;
    let stamp = now();
    let comment = CommentRecord {
        id: new_id(),
        video_id: video_id.to_owned(),
        owner_id: actor.as_str().to_owned(),
        content,
        created_at: stamp.clone(),
        updated_at: stamp,
    };
    store.insert_comment(&comment)?;
    Ok(comment)
}

pub fn update_comment(
    store: &Store,
    actor: &ActorId,
    comment_id: &str,
    content: &str,
) -> ApiResult<CommentRecord> {
    validate_id("comment", comment_id)?;
    let content = require_text("content", content)?;
    let mut comment = store
        .get_comment(comment_id)?
        .ok_or_else(|| ApiError::not_found("comment", comment_id))?;
    authorize_owner(&comment, actor)?;

    comment.content = content;
    comment.updated_at = now();
    store.update_comment(&comment)?;
    Ok(comment)
}

pub fn delete_comment(
    store: &Store,
    actor: &ActorId,
    comment_id: &str,
) -> ApiResult<CommentRecord> {
    validate_id("comment", comment_id)?;
    let comment = store
        .get_comment(comment_id)?
        .ok_or_else(|| ApiError::not_found("comment", comment_id))?;
    authorize_owner(&comment, actor)?;
    store.delete_comment(comment_id)?;
    Ok(comment)
}
