//! Channel subscription toggling and listing.
//!
//! A channel is just another user. The one rule beyond the generic toggle is
//! that an actor may not subscribe to itself; that is rejected before any
//! storage access so no record can be created.

use crate::error::{ApiError, ApiResult};
use crate::ownership::{ActorId, validate_id};
use crate::store::Store;
use crate::toggle::{ToggleOutcome, toggle_relation};

pub fn toggle_subscription(
    store: &Store,
    actor: &ActorId,
    channel_id: &str,
) -> ApiResult<ToggleOutcome> {
    validate_id("channel", channel_id)?;
    if actor.as_str() == channel_id {
        return Err(ApiError::InvalidOperation(
            "cannot subscribe to your own channel".into(),
        ));
    }
    if !store.user_exists(channel_id)? {
        return Err(ApiError::not_found("channel", channel_id));
    }

    store.ensure_user(actor.as_str())?;
    toggle_relation(
        || Ok(store.subscription_exists(actor.as_str(), channel_id)?),
        || Ok(store.insert_subscription(actor.as_str(), channel_id)?),
        || Ok(store.delete_subscription(actor.as_str(), channel_id)?),
    )
}

/// Ids of the users subscribed to a channel.
pub fn channel_subscribers(store: &Store, channel_id: &str) -> ApiResult<Vec<String>> {
    validate_id("channel", channel_id)?;
    if !store.user_exists(channel_id)? {
        return Err(ApiError::not_found("channel", channel_id));
    }
    Ok(store.subscriber_ids(channel_id)?)
}

/// Ids of the channels a user follows.
pub fn subscribed_channels(store: &Store, user_id: &str) -> ApiResult<Vec<String>> {
    validate_id("user", user_id)?;
    if !store.user_exists(user_id)? {
        return Err(ApiError::not_found("user", user_id));
    }
    Ok(store.subscribed_channel_ids(user_id)?)
}
