//! SQLite persistence layer for cliptube.
//!
//! All durable state lives here; nothing is cached in-process. The `Store` is
//! a cheap cloneable handle that opens a short-lived connection per call so
//! concurrent request handlers never contend on a shared connection. WAL mode
//! keeps readers unblocked by writers.
//!
//! The relation tables (`likes`, `subscriptions`, `playlist_videos`) declare
//! UNIQUE constraints over their identifying tuple. Toggle and membership
//! code relies on those constraints to resolve concurrent inserts: the losing
//! insert reports `false` instead of silently duplicating the relation.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, Row, TransactionBehavior, params};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ownership::Owned;

/// How long a connection waits for the write lock before giving up.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Generates a fresh entity id.
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// RFC 3339 UTC timestamp used for every `created_at`/`updated_at` column.
pub fn now() -> String {
    Utc::now().to_rfc3339()
}

/// Actor row. Rows are upserted when an authenticated actor first writes;
/// account management itself belongs to the identity provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: String,
    pub created_at: String,
}

/// Rows stored in the `videos` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoRecord {
    pub id: String,
    pub owner_id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub video_url: String,
    pub thumbnail_url: String,
    pub duration: i64,
    pub views: i64,
    pub is_published: bool,
    pub created_at: String,
    pub updated_at: String,
}

/// Short text post.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TweetRecord {
    pub id: String,
    pub owner_id: String,
    pub content: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Comment attached to a video.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentRecord {
    pub id: String,
    pub video_id: String,
    pub owner_id: String,
    pub content: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Playlist plus its ordered, duplicate-free member video ids.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaylistRecord {
    pub id: String,
    pub owner_id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub video_ids: Vec<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Persisted evidence that an actor likes a target.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LikeRecord {
    pub id: String,
    pub liked_by: String,
    pub target_kind: String,
    pub target_id: String,
    pub created_at: String,
}

/// Persisted evidence that a user follows a channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionRecord {
    pub id: String,
    pub subscriber_id: String,
    pub channel_id: String,
    pub created_at: String,
}

impl Owned for VideoRecord {
    const KIND: &'static str = "video";

    fn entity_id(&self) -> &str {
        &self.id
    }

    fn owner_id(&self) -> &str {
        &self.owner_id
    }
}

impl Owned for TweetRecord {
    const KIND: &'static str = "tweet";

    fn entity_id(&self) -> &str {
        &self.id
    }

    fn owner_id(&self) -> &str {
        &self.owner_id
    }
}

impl Owned for CommentRecord {
    const KIND: &'static str = "comment";

    fn entity_id(&self) -> &str {
        &self.id
    }

    fn owner_id(&self) -> &str {
        &self.owner_id
    }
}

impl Owned for PlaylistRecord {
    const KIND: &'static str = "playlist";

    fn entity_id(&self) -> &str {
        &self.id
    }

    fn owner_id(&self) -> &str {
        &self.owner_id
    }
}

/// Kinds of entities a like can point at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LikeTarget {
    Video,
    Comment,
    Tweet,
}

impl LikeTarget {
    pub fn kind(self) -> &'static str {
        match self {
            Self::Video => "video",
            Self::Comment => "comment",
            Self::Tweet => "tweet",
        }
    }

    fn table(self) -> &'static str {
        match self {
            Self::Video => "videos",
            Self::Comment => "comments",
            Self::Tweet => "tweets",
        }
    }
}

/// Sort keys accepted by the video listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VideoSort {
    #[default]
    CreatedAt,
    Views,
    Duration,
    Title,
}

impl VideoSort {
    fn column(self) -> &'static str {
        match self {
            Self::CreatedAt => "created_at",
            Self::Views => "views",
            Self::Duration => "duration",
            Self::Title => "title",
        }
    }
}

/// Filter applied to the video listing.
#[derive(Debug, Clone, Default)]
pub struct VideoFilter {
    /// Case-insensitive substring match over title and description.
    pub search: Option<String>,
    pub owner_id: Option<String>,
    pub sort: VideoSort,
    pub ascending: bool,
}

/// Cloneable handle over the SQLite database.
#[derive(Debug, Clone)]
pub struct Store {
    db_path: PathBuf,
}

impl Store {
    /// Opens (creating if necessary) the database and ensures the schema
    /// exists. Schema creation runs inside a transaction so a failure leaves
    /// the file untouched.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating data directory {}", parent.display()))?;
        }

        let mut conn = Connection::open(path)
            .with_context(|| format!("opening database {}", path.display()))?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.pragma_update(None, "journal_mode", &"WAL")
            .context("enabling WAL mode")?;
        conn.pragma_update(None, "synchronous", &"NORMAL")
            .context("setting synchronous mode")?;

        let tx = conn.transaction()?;
        tx.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS videos (
                id TEXT PRIMARY KEY,
                owner_id TEXT NOT NULL,
                title TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                video_url TEXT NOT NULL,
                thumbnail_url TEXT NOT NULL,
                duration INTEGER NOT NULL DEFAULT 0,
                views INTEGER NOT NULL DEFAULT 0,
                is_published INTEGER NOT NULL DEFAULT 1,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_videos_owner ON videos(owner_id);

            CREATE TABLE IF NOT EXISTS tweets (
                id TEXT PRIMARY KEY,
                owner_id TEXT NOT NULL,
                content TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_tweets_owner ON tweets(owner_id);

            CREATE TABLE IF NOT EXISTS comments (
                id TEXT PRIMARY KEY,
                video_id TEXT NOT NULL REFERENCES videos(id) ON DELETE CASCADE,
                owner_id TEXT NOT NULL,
                content TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_comments_video ON comments(video_id);

            CREATE TABLE IF NOT EXISTS playlists (
                id TEXT PRIMARY KEY,
                owner_id TEXT NOT NULL,
                name TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_playlists_owner ON playlists(owner_id);

            CREATE TABLE IF NOT EXISTS playlist_videos (
                playlist_id TEXT NOT NULL REFERENCES playlists(id) ON DELETE CASCADE,
                video_id TEXT NOT NULL,
                position INTEGER NOT NULL,
                UNIQUE (playlist_id, video_id)
            );

            CREATE TABLE IF NOT EXISTS likes (
                id TEXT PRIMARY KEY,
                liked_by TEXT NOT NULL,
                target_kind TEXT NOT NULL,
                target_id TEXT NOT NULL,
                created_at TEXT NOT NULL,
                UNIQUE (liked_by, target_kind, target_id)
            );

            CREATE TABLE IF NOT EXISTS subscriptions (
                id TEXT PRIMARY KEY,
                subscriber_id TEXT NOT NULL,
                channel_id TEXT NOT NULL,
                created_at TEXT NOT NULL,
                UNIQUE (subscriber_id, channel_id)
            );
            "#,
        )?;
        tx.commit()?;

        Ok(Self {
            db_path: path.to_path_buf(),
        })
    }

    fn with_connection<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T>,
    {
        // A dedicated connection per invocation so long-running queries do
        // not block unrelated handlers. The busy timeout makes writers wait
        // for the WAL write lock instead of failing with SQLITE_BUSY.
        let mut conn = Connection::open(&self.db_path)
            .with_context(|| format!("opening database {}", self.db_path.display()))?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.pragma_update(None, "foreign_keys", &"ON")?;
        f(&mut conn)
    }

    // ---- users -----------------------------------------------------------

    /// Records the actor's existence. Called on every authenticated write;
    /// the identity provider has already vouched for the id.
    pub fn ensure_user(&self, id: &str) -> Result<()> {
        self.with_connection(|conn| {
            conn.execute(
                "INSERT INTO users (id, created_at) VALUES (?1, ?2)
                 ON CONFLICT(id) DO NOTHING",
                params![id, now()],
            )?;
            Ok(())
        })
    }

    pub fn user_exists(&self, id: &str) -> Result<bool> {
        self.with_connection(|conn| {
            let found: Option<i64> = conn
                .query_row("SELECT 1 FROM users WHERE id = ?1", [id], |row| row.get(0))
                .optional()?;
            Ok(found.is_some())
        })
    }

    // ---- videos ----------------------------------------------------------

    pub fn insert_video(&self, record: &VideoRecord) -> Result<()> {
        self.with_connection(|conn| {
            conn.execute(
                r#"
                INSERT INTO videos (
                    id, owner_id, title, description, video_url, thumbnail_url,
                    duration, views, is_published, created_at, updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
                "#,
                params![
                    record.id,
                    record.owner_id,
                    record.title,
                    record.description,
                    record.video_url,
                    record.thumbnail_url,
                    record.duration,
                    record.views,
                    record.is_published as i64,
                    record.created_at,
                    record.updated_at,
                ],
            )?;
            Ok(())
        })
    }

    pub fn get_video(&self, id: &str) -> Result<Option<VideoRecord>> {
        self.with_connection(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {VIDEO_COLUMNS} FROM videos WHERE id = ?1"
            ))?;
            let mut rows = stmt.query([id])?;
            match rows.next()? {
                Some(row) => Ok(Some(row_to_video(row)?)),
                None => Ok(None),
            }
        })
    }

    /// Writes back the mutable video fields after an ownership-gated patch.
    pub fn update_video(&self, record: &VideoRecord) -> Result<()> {
        self.with_connection(|conn| {
            conn.execute(
                r#"
                UPDATE videos
                SET title = ?2, description = ?3, thumbnail_url = ?4, updated_at = ?5
                WHERE id = ?1
                "#,
                params![
                    record.id,
                    record.title,
                    record.description,
                    record.thumbnail_url,
                    record.updated_at,
                ],
            )?;
            Ok(())
        })
    }

    /// Negates the publish flag in one statement so the flip is atomic, then
    /// returns the resulting row.
    pub fn toggle_publish(&self, id: &str) -> Result<Option<VideoRecord>> {
        self.with_connection(|conn| {
            let changed = conn.execute(
                "UPDATE videos SET is_published = NOT is_published, updated_at = ?2
                 WHERE id = ?1",
                params![id, now()],
            )?;
            if changed == 0 {
                return Ok(None);
            }
            let mut stmt = conn.prepare(&format!(
                "SELECT {VIDEO_COLUMNS} FROM videos WHERE id = ?1"
            ))?;
            let mut rows = stmt.query([id])?;
            match rows.next()? {
                Some(row) => Ok(Some(row_to_video(row)?)),
                None => Ok(None),
            }
        })
    }

    pub fn delete_video(&self, id: &str) -> Result<bool> {
        self.with_connection(|conn| {
            let deleted = conn.execute("DELETE FROM videos WHERE id = ?1", [id])?;
            Ok(deleted > 0)
        })
    }

    /// Bumps the view counter without touching `updated_at`; watching a video
    /// is not an edit.
    pub fn record_view(&self, id: &str) -> Result<()> {
        self.with_connection(|conn| {
            conn.execute("UPDATE videos SET views = views + 1 WHERE id = ?1", [id])?;
            Ok(())
        })
    }

    /// Returns one page of videos plus the total matching count.
    pub fn list_videos(
        &self,
        filter: &VideoFilter,
        offset: u64,
        limit: u64,
    ) -> Result<(Vec<VideoRecord>, u64)> {
        let mut clauses: Vec<&str> = Vec::new();
        let mut args: Vec<String> = Vec::new();

        if let Some(search) = &filter.search {
            clauses.push("(title LIKE ?1 OR description LIKE ?1)");
            args.push(format!("%{search}%"));
        }
        if let Some(owner) = &filter.owner_id {
            clauses.push(if args.is_empty() {
                "owner_id = ?1"
            } else {
                "owner_id = ?2"
            });
            args.push(owner.clone());
        }

        let where_clause = if clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", clauses.join(" AND "))
        };
        let direction = if filter.ascending { "ASC" } else { "DESC" };
        let order = filter.sort.column();

        self.with_connection(|conn| {
            let total: u64 = conn.query_row(
                &format!("SELECT COUNT(*) FROM videos {where_clause}"),
                rusqlite::params_from_iter(args.iter()),
                |row| row.get(0),
            )?;

            // LIMIT/OFFSET are validated non-negative integers, safe to inline.
            let mut stmt = conn.prepare(&format!(
                "SELECT {VIDEO_COLUMNS} FROM videos {where_clause}
                 ORDER BY {order} {direction}, rowid DESC
                 LIMIT {limit} OFFSET {offset}"
            ))?;
            let mut rows = stmt.query(rusqlite::params_from_iter(args.iter()))?;
            let mut records = Vec::new();
            while let Some(row) = rows.next()? {
                records.push(row_to_video(row)?);
            }
            Ok((records, total))
        })
    }

    // ---- tweets ----------------------------------------------------------

    pub fn insert_tweet(&self, record: &TweetRecord) -> Result<()> {
        self.with_connection(|conn| {
            conn.execute(
                "INSERT INTO tweets (id, owner_id, content, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    record.id,
                    record.owner_id,
                    record.content,
                    record.created_at,
                    record.updated_at,
                ],
            )?;
            Ok(())
        })
    }

    pub fn get_tweet(&self, id: &str) -> Result<Option<TweetRecord>> {
        self.with_connection(|conn| {
            conn.query_row(
                "SELECT id, owner_id, content, created_at, updated_at
                 FROM tweets WHERE id = ?1",
                [id],
                |row| {
                    Ok(TweetRecord {
                        id: row.get(0)?,
                        owner_id: row.get(1)?,
                        content: row.get(2)?,
                        created_at: row.get(3)?,
                        updated_at: row.get(4)?,
                    })
                },
            )
            .optional()
            .context("loading tweet")
        })
    }

    pub fn update_tweet(&self, record: &TweetRecord) -> Result<()> {
        self.with_connection(|conn| {
            conn.execute(
                "UPDATE tweets SET content = ?2, updated_at = ?3 WHERE id = ?1",
                params![record.id, record.content, record.updated_at],
            )?;
            Ok(())
        })
    }

    pub fn delete_tweet(&self, id: &str) -> Result<bool> {
        self.with_connection(|conn| {
            let deleted = conn.execute("DELETE FROM tweets WHERE id = ?1", [id])?;
            Ok(deleted > 0)
        })
    }

    pub fn list_tweets_by_owner(&self, owner_id: &str) -> Result<Vec<TweetRecord>> {
        self.with_connection(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, owner_id, content, created_at, updated_at
                 FROM tweets WHERE owner_id = ?1
                 ORDER BY created_at DESC, rowid DESC",
            )?;
            let mut rows = stmt.query([owner_id])?;
            let mut tweets = Vec::new();
            while let Some(row) = rows.next()? {
                tweets.push(TweetRecord {
                    id: row.get(0)?,
                    owner_id: row.get(1)?,
                    content: row.get(2)?,
                    created_at: row.get(3)?,
                    updated_at: row.get(4)?,
                });
            }
            Ok(tweets)
        })
    }

    // ---- comments --------------------------------------------------------

    pub fn insert_comment(&self, record: &CommentRecord) -> Result<()> {
        self.with_connection(|conn| {
            conn.execute(
                "INSERT INTO comments (id, video_id, owner_id, content, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    record.id,
                    record.video_id,
                    record.owner_id,
                    record.content,
                    record.created_at,
                    record.updated_at,
                ],
            )?;
            Ok(())
        })
    }

    pub fn get_comment(&self, id: &str) -> Result<Option<CommentRecord>> {
        self.with_connection(|conn| {
            conn.query_row(
                "SELECT id, video_id, owner_id, content, created_at, updated_at
                 FROM comments WHERE id = ?1",
                [id],
                |row| {
                    Ok(CommentRecord {
                        id: row.get(0)?,
                        video_id: row.get(1)?,
                        owner_id: row.get(2)?,
                        content: row.get(3)?,
                        created_at: row.get(4)?,
                        updated_at: row.get(5)?,
                    })
                },
            )
            .optional()
            .context("loading comment")
        })
    }

    pub fn update_comment(&self, record: &CommentRecord) -> Result<()> {
        self.with_connection(|conn| {
            conn.execute(
                "UPDATE comments SET content = ?2, updated_at = ?3 WHERE id = ?1",
                params![record.id, record.content, record.updated_at],
            )?;
            Ok(())
        })
    }

    pub fn delete_comment(&self, id: &str) -> Result<bool> {
        self.with_connection(|conn| {
            let deleted = conn.execute("DELETE FROM comments WHERE id = ?1", [id])?;
            Ok(deleted > 0)
        })
    }

    pub fn list_comments(
        &self,
        video_id: &str,
        offset: u64,
        limit: u64,
    ) -> Result<(Vec<CommentRecord>, u64)> {
        self.with_connection(|conn| {
            let total: u64 = conn.query_row(
                "SELECT COUNT(*) FROM comments WHERE video_id = ?1",
                [video_id],
                |row| row.get(0),
            )?;

            let mut stmt = conn.prepare(&format!(
                "SELECT id, video_id, owner_id, content, created_at, updated_at
                 FROM comments WHERE video_id = ?1
                 ORDER BY created_at ASC, rowid ASC
                 LIMIT {limit} OFFSET {offset}"
            ))?;
            let mut rows = stmt.query([video_id])?;
            let mut comments = Vec::new();
            while let Some(row) = rows.next()? {
                comments.push(CommentRecord {
                    id: row.get(0)?,
                    video_id: row.get(1)?,
                    owner_id: row.get(2)?,
                    content: row.get(3)?,
                    created_at: row.get(4)?,
                    updated_at: row.get(5)?,
                });
            }
            Ok((comments, total))
        })
    }

    // ---- playlists -------------------------------------------------------

    pub fn insert_playlist(&self, record: &PlaylistRecord) -> Result<()> {
        self.with_connection(|conn| {
            conn.execute(
                "INSERT INTO playlists (id, owner_id, name, description, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    record.id,
                    record.owner_id,
                    record.name,
                    record.description,
                    record.created_at,
                    record.updated_at,
                ],
            )?;
            Ok(())
        })
    }

    pub fn get_playlist(&self, id: &str) -> Result<Option<PlaylistRecord>> {
        self.with_connection(|conn| {
            let base = conn
                .query_row(
                    "SELECT id, owner_id, name, description, created_at, updated_at
                     FROM playlists WHERE id = ?1",
                    [id],
                    |row| {
                        Ok(PlaylistRecord {
                            id: row.get(0)?,
                            owner_id: row.get(1)?,
                            name: row.get(2)?,
                            description: row.get(3)?,
                            video_ids: Vec::new(),
                            created_at: row.get(4)?,
                            updated_at: row.get(5)?,
                        })
                    },
                )
                .optional()?;

            let Some(mut playlist) = base else {
                return Ok(None);
            };
            playlist.video_ids = member_ids(conn, id)?;
            Ok(Some(playlist))
        })
    }

    pub fn update_playlist(&self, record: &PlaylistRecord) -> Result<()> {
        self.with_connection(|conn| {
            conn.execute(
                "UPDATE playlists SET name = ?2, description = ?3, updated_at = ?4
                 WHERE id = ?1",
                params![record.id, record.name, record.description, record.updated_at],
            )?;
            Ok(())
        })
    }

    pub fn delete_playlist(&self, id: &str) -> Result<bool> {
        self.with_connection(|conn| {
            // Membership rows go with the playlist.
            let deleted = conn.execute("DELETE FROM playlists WHERE id = ?1", [id])?;
            Ok(deleted > 0)
        })
    }

    pub fn list_playlists_by_owner(&self, owner_id: &str) -> Result<Vec<PlaylistRecord>> {
        self.with_connection(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, owner_id, name, description, created_at, updated_at
                 FROM playlists WHERE owner_id = ?1
                 ORDER BY created_at DESC, rowid DESC",
            )?;
            let mut rows = stmt.query([owner_id])?;
            let mut playlists = Vec::new();
            while let Some(row) = rows.next()? {
                playlists.push(PlaylistRecord {
                    id: row.get(0)?,
                    owner_id: row.get(1)?,
                    name: row.get(2)?,
                    description: row.get(3)?,
                    video_ids: Vec::new(),
                    created_at: row.get(4)?,
                    updated_at: row.get(5)?,
                });
            }
            for playlist in &mut playlists {
                playlist.video_ids = member_ids(conn, &playlist.id)?;
            }
            Ok(playlists)
        })
    }

    /// Appends a video to the end of a playlist. Returns `false` when the
    /// UNIQUE(playlist_id, video_id) constraint rejected the row, meaning the
    /// video is already a member.
    pub fn add_playlist_video(&self, playlist_id: &str, video_id: &str) -> Result<bool> {
        self.with_connection(|conn| {
            // Take the write lock before reading MAX(position): a deferred
            // transaction would snapshot the read and then fail the upgrade
            // to a write with SQLITE_BUSY when another writer got there
            // first. Immediate mode lets concurrent adds queue on the busy
            // timeout instead.
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let next_position: i64 = tx.query_row(
                "SELECT COALESCE(MAX(position) + 1, 0) FROM playlist_videos
                 WHERE playlist_id = ?1",
                [playlist_id],
                |row| row.get(0),
            )?;
            let inserted = match tx.execute(
                "INSERT INTO playlist_videos (playlist_id, video_id, position)
                 VALUES (?1, ?2, ?3)",
                params![playlist_id, video_id, next_position],
            ) {
                Ok(_) => true,
                Err(err) if is_unique_violation(&err) => false,
                Err(err) => return Err(err.into()),
            };
            tx.commit()?;
            Ok(inserted)
        })
    }

    /// Removes a single membership row; `false` means the video was not a
    /// member.
    pub fn remove_playlist_video(&self, playlist_id: &str, video_id: &str) -> Result<bool> {
        self.with_connection(|conn| {
            let deleted = conn.execute(
                "DELETE FROM playlist_videos WHERE playlist_id = ?1 AND video_id = ?2",
                params![playlist_id, video_id],
            )?;
            Ok(deleted > 0)
        })
    }

    // ---- likes -----------------------------------------------------------

    pub fn like_exists(&self, liked_by: &str, target: LikeTarget, target_id: &str) -> Result<bool> {
        self.with_connection(|conn| {
            let found: Option<i64> = conn
                .query_row(
                    "SELECT 1 FROM likes
                     WHERE liked_by = ?1 AND target_kind = ?2 AND target_id = ?3",
                    params![liked_by, target.kind(), target_id],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(found.is_some())
        })
    }

    /// Inserts a like; `false` when the uniqueness constraint fired because a
    /// concurrent toggle already created the relation.
    pub fn insert_like(&self, liked_by: &str, target: LikeTarget, target_id: &str) -> Result<bool> {
        self.with_connection(|conn| {
            match conn.execute(
                "INSERT INTO likes (id, liked_by, target_kind, target_id, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![new_id(), liked_by, target.kind(), target_id, now()],
            ) {
                Ok(_) => Ok(true),
                Err(err) if is_unique_violation(&err) => Ok(false),
                Err(err) => Err(err.into()),
            }
        })
    }

    pub fn delete_like(&self, liked_by: &str, target: LikeTarget, target_id: &str) -> Result<bool> {
        self.with_connection(|conn| {
            let deleted = conn.execute(
                "DELETE FROM likes
                 WHERE liked_by = ?1 AND target_kind = ?2 AND target_id = ?3",
                params![liked_by, target.kind(), target_id],
            )?;
            Ok(deleted > 0)
        })
    }

    /// Ids of the videos an actor has liked, most recent first.
    pub fn liked_video_ids(&self, liked_by: &str) -> Result<Vec<String>> {
        self.with_connection(|conn| {
            let mut stmt = conn.prepare(
                "SELECT target_id FROM likes
                 WHERE liked_by = ?1 AND target_kind = 'video'
                 ORDER BY created_at DESC, rowid DESC",
            )?;
            let mut rows = stmt.query([liked_by])?;
            let mut ids = Vec::new();
            while let Some(row) = rows.next()? {
                ids.push(row.get(0)?);
            }
            Ok(ids)
        })
    }

    /// Existence check for whatever a like points at.
    pub fn like_target_exists(&self, target: LikeTarget, target_id: &str) -> Result<bool> {
        self.with_connection(|conn| {
            let found: Option<i64> = conn
                .query_row(
                    &format!("SELECT 1 FROM {} WHERE id = ?1", target.table()),
                    [target_id],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(found.is_some())
        })
    }

    // ---- subscriptions ---------------------------------------------------

    pub fn subscription_exists(&self, subscriber_id: &str, channel_id: &str) -> Result<bool> {
        self.with_connection(|conn| {
            let found: Option<i64> = conn
                .query_row(
                    "SELECT 1 FROM subscriptions
                     WHERE subscriber_id = ?1 AND channel_id = ?2",
                    params![subscriber_id, channel_id],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(found.is_some())
        })
    }

    pub fn insert_subscription(&self, subscriber_id: &str, channel_id: &str) -> Result<bool> {
        self.with_connection(|conn| {
            match conn.execute(
                "INSERT INTO subscriptions (id, subscriber_id, channel_id, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![new_id(), subscriber_id, channel_id, now()],
            ) {
                Ok(_) => Ok(true),
                Err(err) if is_unique_violation(&err) => Ok(false),
                Err(err) => Err(err.into()),
            }
        })
    }

    pub fn delete_subscription(&self, subscriber_id: &str, channel_id: &str) -> Result<bool> {
        self.with_connection(|conn| {
            let deleted = conn.execute(
                "DELETE FROM subscriptions
                 WHERE subscriber_id = ?1 AND channel_id = ?2",
                params![subscriber_id, channel_id],
            )?;
            Ok(deleted > 0)
        })
    }

    pub fn subscriber_ids(&self, channel_id: &str) -> Result<Vec<String>> {
        self.with_connection(|conn| {
            let mut stmt = conn.prepare(
                "SELECT subscriber_id FROM subscriptions
                 WHERE channel_id = ?1
                 ORDER BY created_at ASC, rowid ASC",
            )?;
            let mut rows = stmt.query([channel_id])?;
            let mut ids = Vec::new();
            while let Some(row) = rows.next()? {
                ids.push(row.get(0)?);
            }
            Ok(ids)
        })
    }

    pub fn subscribed_channel_ids(&self, subscriber_id: &str) -> Result<Vec<String>> {
        self.with_connection(|conn| {
            let mut stmt = conn.prepare(
                "SELECT channel_id FROM subscriptions
                 WHERE subscriber_id = ?1
                 ORDER BY created_at ASC, rowid ASC",
            )?;
            let mut rows = stmt.query([subscriber_id])?;
            let mut ids = Vec::new();
            while let Some(row) = rows.next()? {
                ids.push(row.get(0)?);
            }
            Ok(ids)
        })
    }
}

const VIDEO_COLUMNS: &str = "id, owner_id, title, description, video_url, thumbnail_url, \
                             duration, views, is_published, created_at, updated_at";

fn row_to_video(row: &Row<'_>) -> Result<VideoRecord> {
    Ok(VideoRecord {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        video_url: row.get(4)?,
        thumbnail_url: row.get(5)?,
        duration: row.get(6)?,
        views: row.get(7)?,
        is_published: row.get::<_, i64>(8).map(|value| value != 0)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}

fn member_ids(conn: &Connection, playlist_id: &str) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT video_id FROM playlist_videos
         WHERE playlist_id = ?1 ORDER BY position ASC",
    )?;
    let mut rows = stmt.query([playlist_id])?;
    let mut ids = Vec::new();
    while let Some(row) = rows.next()? {
        ids.push(row.get(0)?);
    }
    Ok(ids)
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(failure, _)
            if failure.code == rusqlite::ErrorCode::ConstraintViolation
    )
}
