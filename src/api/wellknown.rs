//! Well-known endpoints
//!
//! - /.well-known/webfinger

use axum::{
    Router,
    extract::{Query, State},
    http::header,
    response::{IntoResponse, Json},
    routing::get,
};
use serde::Deserialize;

use crate::AppState;
use crate::data::UserScope;
use crate::error::AppError;
use crate::federation::{AcctResource, generate_webfinger_response};

/// Create well-known router
///
/// Routes:
/// - GET /.well-known/webfinger
pub fn wellknown_router() -> Router<AppState> {
    Router::new().route("/.well-known/webfinger", get(webfinger))
}

/// WebFinger query parameters
#[derive(Debug, Deserialize)]
struct WebFingerQuery {
    resource: String,
}

/// GET /.well-known/webfinger
///
/// Responds to WebFinger queries for local accounts.
///
/// Query: ?resource=acct:user@domain
///
/// Returns 404 when the queried host is not this instance, regardless of
/// username.
async fn webfinger(
    State(state): State<AppState>,
    Query(query): Query<WebFingerQuery>,
) -> Result<impl IntoResponse, AppError> {
    let resource = AcctResource::parse(&query.resource)?;

    // Verify domain matches local domain
    if resource.host != state.config.server.domain {
        return Err(AppError::NotFound);
    }

    let record = state
        .db
        .find_user(&resource.username, &UserScope::Local)
        .await?
        .ok_or(AppError::NotFound)?;

    let response = generate_webfinger_response(&resource, &record.user.url);

    Ok((
        [(header::CONTENT_TYPE, "application/jrd+json")],
        Json(response),
    ))
}
