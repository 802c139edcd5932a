//! HTTP surface of the cliptube backend.
//!
//! Routing, extraction, and response shaping live here; all domain rules are
//! in the library service modules. Every handler bridges to the synchronous
//! store through `spawn_blocking` so SQLite work never blocks the runtime.

use std::{net::SocketAddr, path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use axum::{
    Json, Router,
    body::Body,
    extract::{FromRequestParts, Path as AxumPath, Query, State},
    http::{header, request::Parts},
    response::{IntoResponse, Response},
    routing::{get, patch, post},
};
use clap::Parser;
use cliptube::{
    comments,
    config::{self, RuntimeConfig},
    error::{ApiError, ApiResult, Envelope},
    likes,
    media::{LocalMediaStorage, MediaStorage},
    ownership::ActorId,
    pagination::PageQuery,
    playlists::{self, CreatePlaylistInput, UpdatePlaylistInput},
    security,
    store::{LikeTarget, Store},
    subscriptions,
    toggle::ToggleOutcome,
    tweets,
    videos::{self, ListVideosInput, PublishVideoInput, UpdateVideoInput},
};
use mime_guess::MimeGuess;
use serde::Deserialize;
use tokio::{fs::File, signal, task};
use tokio_util::io::ReaderStream;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Header the identity provider uses to hand us the authenticated actor.
const ACTOR_HEADER: &str = "x-actor-id";

#[derive(Parser, Debug)]
#[command(name = "cliptube-backend")]
#[command(about = "cliptube REST API server")]
struct Args {
    /// Path to the env-file configuration
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the configured listen port
    #[arg(long)]
    port: Option<u16>,
}

#[derive(Clone)]
struct AppState {
    store: Store,
    media: Arc<dyn MediaStorage>,
}

/// Authenticated actor extracted from the identity provider's header. The
/// value is trusted as-is; only well-formedness is checked here.
struct Actor(ActorId);

impl<S: Send + Sync> FromRequestParts<S> for Actor {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(ACTOR_HEADER)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| ApiError::invalid(format!("missing {ACTOR_HEADER} header")))?;
        Ok(Self(ActorId::parse(raw)?))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    security::ensure_not_root("cliptube-backend")?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let mut cfg = match &args.config {
        Some(path) => config::load_runtime_config_from(path)?,
        None => config::load_runtime_config()?,
    };
    if let Some(port) = args.port {
        cfg.port = port;
    }

    let store = Store::open(cfg.db_path()).context("initializing store")?;
    let media = LocalMediaStorage::new(&cfg.media_root, cfg.public_base_url.clone());
    let state = AppState {
        store,
        media: Arc::new(media),
    };

    let app = router(state);
    let addr = listen_addr(&cfg)?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding to {addr}"))?;
    info!(%addr, "cliptube backend listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("running API server")?;

    Ok(())
}

fn listen_addr(cfg: &RuntimeConfig) -> Result<SocketAddr> {
    let host = cfg
        .host
        .parse()
        .with_context(|| format!("parsing listen host {:?}", cfg.host))?;
    Ok(SocketAddr::new(host, cfg.port))
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/videos", get(list_videos).post(publish_video))
        .route(
            "/api/videos/{id}",
            get(get_video).patch(update_video).delete(delete_video),
        )
        .route("/api/videos/{id}/publish", patch(toggle_publish))
        .route("/api/videos/{id}/stream", get(stream_video))
        .route(
            "/api/videos/{id}/comments",
            get(list_comments).post(add_comment),
        )
        .route(
            "/api/comments/{id}",
            patch(update_comment).delete(delete_comment),
        )
        .route("/api/likes/videos", get(liked_videos))
        .route("/api/likes/videos/{id}", post(toggle_video_like))
        .route("/api/likes/comments/{id}", post(toggle_comment_like))
        .route("/api/likes/tweets/{id}", post(toggle_tweet_like))
        .route("/api/subscriptions/{id}", post(toggle_subscription))
        .route(
            "/api/subscriptions/{id}/subscribers",
            get(channel_subscribers),
        )
        .route("/api/users/{id}/subscriptions", get(subscribed_channels))
        .route("/api/users/{id}/tweets", get(user_tweets))
        .route("/api/users/{id}/playlists", get(user_playlists))
        .route("/api/playlists", post(create_playlist))
        .route(
            "/api/playlists/{id}",
            get(get_playlist)
                .patch(update_playlist)
                .delete(delete_playlist),
        )
        .route(
            "/api/playlists/{id}/videos/{video_id}",
            post(add_playlist_video).delete(remove_playlist_video),
        )
        .route("/api/tweets", post(create_tweet))
        .route("/api/tweets/{id}", patch(update_tweet).delete(delete_tweet))
        .with_state(state)
}

async fn shutdown_signal() {
    if let Err(err) = signal::ctrl_c().await {
        tracing::error!(%err, "failed to install Ctrl+C handler");
    }
}

/// Runs a synchronous service call on the blocking pool.
async fn run_blocking<T, F>(f: F) -> ApiResult<T>
where
    F: FnOnce() -> ApiResult<T> + Send + 'static,
    T: Send + 'static,
{
    task::spawn_blocking(f)
        .await
        .map_err(|err| ApiError::Internal(anyhow::anyhow!("task join error: {err}")))?
}

// ---- request/response bodies ---------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoListParams {
    page: Option<i64>,
    limit: Option<i64>,
    query: Option<String>,
    user_id: Option<String>,
    sort_by: Option<String>,
    sort_type: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PublishVideoBody {
    title: String,
    #[serde(default)]
    description: String,
    /// Staged upload paths the transport layer already received.
    video_file: PathBuf,
    thumbnail_file: PathBuf,
    #[serde(default = "default_publish")]
    publish: bool,
}

fn default_publish() -> bool {
    true
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateVideoBody {
    title: Option<String>,
    description: Option<String>,
    thumbnail_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ContentBody {
    content: String,
}

#[derive(Debug, Deserialize)]
struct PlaylistBody {
    name: Option<String>,
    description: Option<String>,
}

#[derive(serde::Serialize)]
struct ToggleBody {
    state: ToggleOutcome,
}

fn toggle_response(outcome: ToggleOutcome, what: &str) -> Json<Envelope<ToggleBody>> {
    let message = format!("{what} {}", outcome.as_str());
    Json(Envelope::ok(ToggleBody { state: outcome }, message))
}

// ---- video handlers -------------------------------------------------------

async fn list_videos(
    State(state): State<AppState>,
    Query(params): Query<VideoListParams>,
) -> ApiResult<impl IntoResponse> {
    let input = ListVideosInput {
        page: PageQuery {
            page: params.page,
            limit: params.limit,
        },
        search: params.query,
        owner_id: params.user_id,
        sort_by: params.sort_by,
        ascending: params.sort_type.as_deref() == Some("asc"),
    };
    let store = state.store.clone();
    let page = run_blocking(move || videos::list_videos(&store, input)).await?;
    Ok(Json(Envelope::ok(page, "Videos fetched successfully")))
}

async fn publish_video(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Json(body): Json<PublishVideoBody>,
) -> ApiResult<impl IntoResponse> {
    let input = PublishVideoInput {
        title: body.title,
        description: body.description,
        video_file: body.video_file,
        thumbnail_file: body.thumbnail_file,
        publish: body.publish,
    };
    let store = state.store.clone();
    let media = state.media.clone();
    let video =
        run_blocking(move || videos::publish_video(&store, media.as_ref(), &actor, input)).await?;
    Ok(Json(Envelope::ok(video, "Video published successfully")))
}

async fn get_video(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
) -> ApiResult<impl IntoResponse> {
    let store = state.store.clone();
    let video = run_blocking(move || videos::get_video(&store, &id)).await?;
    Ok(Json(Envelope::ok(video, "Video found successfully")))
}

async fn update_video(
    State(state): State<AppState>,
    Actor(actor): Actor,
    AxumPath(id): AxumPath<String>,
    Json(body): Json<UpdateVideoBody>,
) -> ApiResult<impl IntoResponse> {
    let input = UpdateVideoInput {
        title: body.title,
        description: body.description,
        thumbnail_url: body.thumbnail_url,
    };
    let store = state.store.clone();
    let video = run_blocking(move || videos::update_video(&store, &actor, &id, input)).await?;
    Ok(Json(Envelope::ok(video, "Video updated successfully")))
}

async fn delete_video(
    State(state): State<AppState>,
    Actor(actor): Actor,
    AxumPath(id): AxumPath<String>,
) -> ApiResult<impl IntoResponse> {
    let store = state.store.clone();
    let video = run_blocking(move || videos::delete_video(&store, &actor, &id)).await?;
    Ok(Json(Envelope::ok(video, "Video deleted successfully")))
}

async fn toggle_publish(
    State(state): State<AppState>,
    Actor(actor): Actor,
    AxumPath(id): AxumPath<String>,
) -> ApiResult<impl IntoResponse> {
    let store = state.store.clone();
    let video = run_blocking(move || videos::toggle_publish(&store, &actor, &id)).await?;
    Ok(Json(Envelope::ok(video, "Publish status updated")))
}

async fn stream_video(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
) -> ApiResult<Response> {
    let store = state.store.clone();
    let lookup_id = id.clone();
    let video = run_blocking(move || videos::get_video(&store, &lookup_id)).await?;

    let path = state
        .media
        .resolve_local(&video.video_url)
        .ok_or_else(|| ApiError::not_found("media file", &id))?;

    // Streaming counts as a view; losing the bump on failure is acceptable.
    let store = state.store.clone();
    task::spawn_blocking(move || {
        if let Err(err) = store.record_view(&id) {
            tracing::warn!(%err, "failed to record view");
        }
    });

    let file = File::open(&path)
        .await
        .map_err(|_| ApiError::not_found("media file", path.display().to_string()))?;
    let mime = MimeGuess::from_path(&path).first();
    let stream = ReaderStream::new(file);
    let mut response = Body::from_stream(stream).into_response();
    if let Some(mime) = mime {
        if let Ok(value) = mime.to_string().parse() {
            response.headers_mut().insert(header::CONTENT_TYPE, value);
        }
    }
    Ok(response)
}

// ---- comment handlers -----------------------------------------------------

async fn list_comments(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
    Query(page): Query<PageQuery>,
) -> ApiResult<impl IntoResponse> {
    let store = state.store.clone();
    let comments = run_blocking(move || comments::list_comments(&store, &id, page)).await?;
    Ok(Json(Envelope::ok(comments, "Comments fetched successfully")))
}

async fn add_comment(
    State(state): State<AppState>,
    Actor(actor): Actor,
    AxumPath(id): AxumPath<String>,
    Json(body): Json<ContentBody>,
) -> ApiResult<impl IntoResponse> {
    let store = state.store.clone();
    let comment =
        run_blocking(move || comments::add_comment(&store, &actor, &id, &body.content)).await?;
    Ok(Json(Envelope::ok(comment, "Comment added successfully")))
}

async fn update_comment(
    State(state): State<AppState>,
    Actor(actor): Actor,
    AxumPath(id): AxumPath<String>,
    Json(body): Json<ContentBody>,
) -> ApiResult<impl IntoResponse> {
    let store = state.store.clone();
    let comment =
        run_blocking(move || comments::update_comment(&store, &actor, &id, &body.content)).await?;
    Ok(Json(Envelope::ok(comment, "Comment updated successfully")))
}

async fn delete_comment(
    State(state): State<AppState>,
    Actor(actor): Actor,
    AxumPath(id): AxumPath<String>,
) -> ApiResult<impl IntoResponse> {
    let store = state.store.clone();
    let comment = run_blocking(move || comments::delete_comment(&store, &actor, &id)).await?;
    Ok(Json(Envelope::ok(comment, "Comment deleted successfully")))
}

// ---- like handlers --------------------------------------------------------

async fn toggle_video_like(
    state: State<AppState>,
    actor: Actor,
    path: AxumPath<String>,
) -> ApiResult<Json<Envelope<ToggleBody>>> {
    toggle_like(state, actor, path, LikeTarget::Video).await
}

async fn toggle_comment_like(
    state: State<AppState>,
    actor: Actor,
    path: AxumPath<String>,
) -> ApiResult<Json<Envelope<ToggleBody>>> {
    toggle_like(state, actor, path, LikeTarget::Comment).await
}

async fn toggle_tweet_like(
    state: State<AppState>,
    actor: Actor,
    path: AxumPath<String>,
) -> ApiResult<Json<Envelope<ToggleBody>>> {
    toggle_like(state, actor, path, LikeTarget::Tweet).await
}

async fn toggle_like(
    State(state): State<AppState>,
    Actor(actor): Actor,
    AxumPath(id): AxumPath<String>,
    target: LikeTarget,
) -> ApiResult<Json<Envelope<ToggleBody>>> {
    let store = state.store.clone();
    let outcome = run_blocking(move || likes::toggle_like(&store, &actor, target, &id)).await?;
    Ok(toggle_response(outcome, "like"))
}

async fn liked_videos(
    State(state): State<AppState>,
    Actor(actor): Actor,
) -> ApiResult<impl IntoResponse> {
    let store = state.store.clone();
    let ids = run_blocking(move || likes::liked_videos(&store, &actor)).await?;
    Ok(Json(Envelope::ok(ids, "Liked videos fetched successfully")))
}

// ---- subscription handlers ------------------------------------------------

async fn toggle_subscription(
    State(state): State<AppState>,
    Actor(actor): Actor,
    AxumPath(id): AxumPath<String>,
) -> ApiResult<Json<Envelope<ToggleBody>>> {
    let store = state.store.clone();
    let outcome =
        run_blocking(move || subscriptions::toggle_subscription(&store, &actor, &id)).await?;
    Ok(toggle_response(outcome, "subscription"))
}

async fn channel_subscribers(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
) -> ApiResult<impl IntoResponse> {
    let store = state.store.clone();
    let ids = run_blocking(move || subscriptions::channel_subscribers(&store, &id)).await?;
    Ok(Json(Envelope::ok(ids, "Subscribers fetched successfully")))
}

async fn subscribed_channels(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
) -> ApiResult<impl IntoResponse> {
    let store = state.store.clone();
    let ids = run_blocking(move || subscriptions::subscribed_channels(&store, &id)).await?;
    Ok(Json(Envelope::ok(ids, "Subscriptions fetched successfully")))
}

// ---- tweet handlers -------------------------------------------------------

async fn create_tweet(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Json(body): Json<ContentBody>,
) -> ApiResult<impl IntoResponse> {
    let store = state.store.clone();
    let tweet = run_blocking(move || tweets::create_tweet(&store, &actor, &body.content)).await?;
    Ok(Json(Envelope::ok(tweet, "Tweet created successfully")))
}

async fn user_tweets(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
) -> ApiResult<impl IntoResponse> {
    let store = state.store.clone();
    let list = run_blocking(move || tweets::user_tweets(&store, &id)).await?;
    Ok(Json(Envelope::ok(list, "Tweets fetched successfully")))
}

async fn update_tweet(
    State(state): State<AppState>,
    Actor(actor): Actor,
    AxumPath(id): AxumPath<String>,
    Json(body): Json<ContentBody>,
) -> ApiResult<impl IntoResponse> {
    let store = state.store.clone();
    let tweet =
        run_blocking(move || tweets::update_tweet(&store, &actor, &id, &body.content)).await?;
    Ok(Json(Envelope::ok(tweet, "Tweet updated successfully")))
}

async fn delete_tweet(
    State(state): State<AppState>,
    Actor(actor): Actor,
    AxumPath(id): AxumPath<String>,
) -> ApiResult<impl IntoResponse> {
    let store = state.store.clone();
    let tweet = run_blocking(move || tweets::delete_tweet(&store, &actor, &id)).await?;
    Ok(Json(Envelope::ok(tweet, "Tweet deleted successfully")))
}

// ---- playlist handlers ----------------------------------------------------

async fn create_playlist(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Json(body): Json<PlaylistBody>,
) -> ApiResult<impl IntoResponse> {
    let input = CreatePlaylistInput {
        name: body.name.unwrap_or_default(),
        description: body.description.unwrap_or_default(),
    };
    let store = state.store.clone();
    let playlist = run_blocking(move || playlists::create_playlist(&store, &actor, input)).await?;
    Ok(Json(Envelope::ok(playlist, "Playlist created successfully")))
}

async fn user_playlists(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
) -> ApiResult<impl IntoResponse> {
    let store = state.store.clone();
    let list = run_blocking(move || playlists::user_playlists(&store, &id)).await?;
    Ok(Json(Envelope::ok(list, "Playlists fetched successfully")))
}

async fn get_playlist(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
) -> ApiResult<impl IntoResponse> {
    let store = state.store.clone();
    let detail = run_blocking(move || playlists::playlist_detail(&store, &id)).await?;
    Ok(Json(Envelope::ok(detail, "Playlist fetched successfully")))
}

async fn update_playlist(
    State(state): State<AppState>,
    Actor(actor): Actor,
    AxumPath(id): AxumPath<String>,
    Json(body): Json<PlaylistBody>,
) -> ApiResult<impl IntoResponse> {
    let input = UpdatePlaylistInput {
        name: body.name,
        description: body.description,
    };
    let store = state.store.clone();
    let playlist =
        run_blocking(move || playlists::update_playlist(&store, &actor, &id, input)).await?;
    Ok(Json(Envelope::ok(playlist, "Playlist updated successfully")))
}

async fn delete_playlist(
    State(state): State<AppState>,
    Actor(actor): Actor,
    AxumPath(id): AxumPath<String>,
) -> ApiResult<impl IntoResponse> {
    let store = state.store.clone();
    let playlist = run_blocking(move || playlists::delete_playlist(&store, &actor, &id)).await?;
    Ok(Json(Envelope::ok(playlist, "Playlist deleted successfully")))
}

async fn add_playlist_video(
    State(state): State<AppState>,
    Actor(actor): Actor,
    AxumPath((id, video_id)): AxumPath<(String, String)>,
) -> ApiResult<impl IntoResponse> {
    let store = state.store.clone();
    let playlist =
        run_blocking(move || playlists::add_video(&store, &actor, &id, &video_id)).await?;
    Ok(Json(Envelope::ok(playlist, "Video added to playlist")))
}

async fn remove_playlist_video(
    State(state): State<AppState>,
    Actor(actor): Actor,
    AxumPath((id, video_id)): AxumPath<(String, String)>,
) -> ApiResult<impl IntoResponse> {
    let store = state.store.clone();
    let playlist =
        run_blocking(move || playlists::remove_video(&store, &actor, &id, &video_id)).await?;
    Ok(Json(Envelope::ok(playlist, "Video removed from playlist")))
}
