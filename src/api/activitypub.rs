//! ActivityPub endpoints
//!
//! - Actor profile
//! - Note documents for posts (content-negotiated)
//! - Create activities for posts

use axum::{
    Router,
    extract::{Path, State},
    http::{HeaderMap, header},
    response::{Html, IntoResponse, Json, Response},
    routing::get,
};

use crate::AppState;
use crate::data::UserScope;
use crate::error::AppError;
use crate::federation::activity;

const ACTIVITY_JSON: &str = "application/activity+json";

/// Create ActivityPub router
///
/// Routes:
/// - GET /@:username - Actor profile (matched as a handle segment)
/// - GET /posts/:id - Note document or HTML page
/// - GET /posts/:id/activity - Create activity
pub fn activitypub_router() -> Router<AppState> {
    Router::new()
        .route("/:handle", get(actor))
        .route("/posts/:id", get(show_post))
        .route("/posts/:id/activity", get(post_activity))
}

/// Whether the request negotiates for an ActivityPub document
fn wants_activity_json(headers: &HeaderMap) -> bool {
    headers
        .get(header::ACCEPT)
        .and_then(|value| value.to_str().ok())
        .map(|accept| {
            accept.contains("application/activity+json") || accept.contains("application/ld+json")
        })
        .unwrap_or(false)
}

/// GET /@:username
///
/// Returns the ActivityPub Actor document for the local user.
///
/// Content-Type: application/activity+json
async fn actor(
    State(state): State<AppState>,
    Path(handle): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    // Route segments are matched whole; the handle carries its @ prefix.
    let username = handle.strip_prefix('@').ok_or(AppError::NotFound)?;

    let record = state
        .db
        .find_user(username, &UserScope::Local)
        .await?
        .ok_or(AppError::NotFound)?;

    let key = record.key.ok_or_else(|| {
        AppError::Internal(anyhow::anyhow!(
            "local user {} has no key pair",
            record.user.username
        ))
    })?;

    let doc = activity::actor(&record.user, &key);

    Ok(([(header::CONTENT_TYPE, ACTIVITY_JSON)], Json(doc)))
}

/// GET /posts/:id
///
/// Content-negotiated: ActivityPub clients receive the Note document,
/// everyone else a minimal HTML page.
async fn show_post(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let view = state.db.get_post(&id).await?.ok_or(AppError::NotFound)?;
    let base_url = state.config.server.base_url();

    if wants_activity_json(&headers) {
        let doc = activity::note(
            &activity::post_url(&base_url, &view.id),
            &activity::actor_url(&base_url, &view.username),
            &view.content,
        );
        return Ok(([(header::CONTENT_TYPE, ACTIVITY_JSON)], Json(doc)).into_response());
    }

    let author = match &view.host {
        Some(host) => format!("@{}@{}", view.username, host),
        None => format!("@{}", view.username),
    };
    // Post content is escaped once at creation; it is inserted verbatim.
    let page = format!(
        "<!DOCTYPE html>\n<html>\n<head><title>{author}</title></head>\n<body>\n<article>\n<p>{content}</p>\n<footer>{author} &middot; <a href=\"{url}\">{url}</a></footer>\n</article>\n</body>\n</html>\n",
        content = view.content,
        url = view.url,
    );

    Ok(Html(page).into_response())
}

/// GET /posts/:id/activity
///
/// Returns the Create activity wrapping the post's Note.
async fn post_activity(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let view = state.db.get_post(&id).await?.ok_or(AppError::NotFound)?;
    let base_url = state.config.server.base_url();

    let actor_url = activity::actor_url(&base_url, &view.username);
    let note = activity::note(
        &activity::post_url(&base_url, &view.id),
        &actor_url,
        &view.content,
    );
    let doc = activity::create(&activity::activity_url(&base_url, &view.id), &actor_url, note);

    Ok(([(header::CONTENT_TYPE, ACTIVITY_JSON)], Json(doc)))
}
