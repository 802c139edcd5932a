#![forbid(unsafe_code)]

//! cliptube: a video-sharing backend.
//!
//! The library holds everything except the HTTP surface: the SQLite store,
//! the toggle and ownership primitives, and one service module per resource
//! (videos, comments, tweets, playlists, likes, subscriptions). The
//! `backend` binary wires these into an axum router.

pub mod comments;
pub mod config;
pub mod error;
pub mod likes;
pub mod media;
pub mod ownership;
pub mod pagination;
pub mod playlists;
pub mod security;
pub mod store;
pub mod subscriptions;
pub mod toggle;
pub mod tweets;
pub mod videos;
