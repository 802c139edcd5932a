//! Short text posts with ownership-gated edits.

use crate::error::{ApiError, ApiResult};
use crate::ownership::{ActorId, authorize_owner, require_text, validate_id};
use crate::store::{Store, TweetRecord, new_id, now};

pub fn create_tweet(store: &Store, actor: &ActorId, content: &str) -> ApiResult<TweetRecord> {
    let content = require_text("content", content)?;
    store.ensure_user(actor.as_str())?;

    let stamp = now();
    let tweet = TweetRecord {
        id: new_id(),
        owner_id: actor.as_str().to_owned(),
        content,
        created_at: stamp.clone(),
        updated_at: stamp,
    };
    store.insert_tweet(&tweet)?;
    Ok(tweet)
}

pub fn user_tweets(store: &Store, user_id: &str) -> ApiResult<Vec<TweetRecord>> {
    validate_id("user", user_id)?;
    if !store.user_exists(user_id)? {
        return Err(ApiError::not_found("user", user_id));
    }
    Ok(store.list_tweets_by_owner(user_id)?)
}

pub fn update_tweet(
    store: &Store,
    actor: &ActorId,
    tweet_id: &str,
    content: &str,
) -> ApiResult<TweetRecord> {
    validate_id("tweet", tweet_id)?;
    let content = require_text("content", content)?;
    let mut tweet = store
        .get_tweet(tweet_id)?
        .ok_or_else(|| ApiError::not_found("tweet", tweet_id))?;
    authorize_owner(&tweet, actor)?;

    tweet.content = content;
    tweet.updated_at = now();
    store.update_tweet(&tweet)?;
    Ok(tweet)
}

pub fn delete_tweet(store: &Store, actor: &ActorId, tweet_id: &str) -> ApiResult<TweetRecord> {
    validate_id("tweet", tweet_id)?;
    let tweet = store
        .get_tweet(tweet_id)?
        .ok_or_else(|| ApiError::not_found("tweet", tweet_id))?;
    authorize_owner(&tweet, actor)?;
    store.delete_tweet(tweet_id)?;
    Ok(tweet)
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

    #[test]
    fn create_and_list_by_owner() {
        let (_dir, store) = open_store();
        let author = actor();
        create_tweet(&store, &author, "hello world").unwrap();
        create_tweet(&store, &author, "second post").unwrap();

        let tweets = user_tweets(&store, author.as_str()).unwrap();
        assert_eq!(tweets.len(), 2);
        assert!(tweets.iter().all(|t| t.owner_id == author.as_str()));
    }

    #[test]
    fn blank_content_is_rejected() {
        let (_dir, store) = open_store();
        let err = create_tweet(&store, &actor(), "   ").unwrap_err();
        assert!(matches!(err, ApiError::InvalidArgument(_)));
    }

    #[test]
    fn tweets_of_unknown_user_are_not_found() {
        let (_dir, store) = open_store();
        let err = user_tweets(&store, &new_id()).unwrap_err();
        assert!(matches!(err, ApiError::NotFound { kind: "user", .. }));
    }

    #[test]
    fn only_the_owner_can_edit_or_delete() {
        let (_dir, store) = open_store();
        let author = actor();
        let tweet = create_tweet(&store, &author, "mine").unwrap();

        let intruder = actor();
        let err = update_tweet(&store, &intruder, &tweet.id, "stolen").unwrap_err();
        assert!(matches!(err, ApiError::Forbidden { kind: "tweet", .. }));
        let err = delete_tweet(&store, &intruder, &tweet.id).unwrap_err();
        assert!(matches!(err, ApiError::Forbidden { .. }));
        assert_eq!(store.get_tweet(&tweet.id).unwrap().unwrap().content, "mine");

        let updated = update_tweet(&store, &author, &tweet.id, "edited").unwrap();
        assert_eq!(updated.content, "edited");
        delete_tweet(&store, &author, &tweet.id).unwrap();
        assert!(store.get_tweet(&tweet.id).unwrap().is_none());
    }
}
