//! HTML surface
//!
//! Minimal inline pages for setup, login and the home feed. No template
//! engine; everything user-provided is escaped before interpolation.

use axum::{
    Form, Router,
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Deserialize;

use crate::AppState;
use crate::auth::{SESSION_COOKIE, Session, create_session_token, verify_session_token};
use crate::error::AppError;

/// Create pages router
///
/// Routes:
/// - GET / - setup form, login form, or feed
/// - GET /setup - setup form
/// - POST /setup/complete - one-time account creation
/// - POST /login - session login
/// - POST /post/create - create a post
pub fn pages_router() -> Router<AppState> {
    Router::new()
        .route("/", get(index))
        .route("/setup", get(setup_page))
        .route("/setup/complete", post(setup_complete))
        .route("/login", post(login))
        .route("/post/create", post(post_create))
}

/// Username/password form body
#[derive(Debug, Deserialize)]
struct CredentialsForm {
    username: String,
    password: String,
}

/// Post creation form body
#[derive(Debug, Deserialize)]
struct PostForm {
    content: String,
}

fn session_cookie(state: &AppState, token: String) -> Cookie<'static> {
    let mut cookie = Cookie::new(SESSION_COOKIE, token);
    cookie.set_path("/");
    cookie.set_http_only(true);
    cookie.set_same_site(SameSite::Strict);
    cookie.set_secure(state.config.should_use_secure_cookies());
    cookie
}

fn cleared_session_cookie() -> Cookie<'static> {
    let mut cookie = Cookie::new(SESSION_COOKIE, "");
    cookie.set_path("/");
    cookie
}

/// Username from a valid session cookie, if any
fn session_username(state: &AppState, jar: &CookieJar) -> Option<String> {
    let token = jar.get(SESSION_COOKIE)?.value().to_string();
    verify_session_token(&token, &state.config.auth.session_secret)
        .ok()
        .map(|session| session.username)
}

fn page(title: &str, body: &str) -> Html<String> {
    Html(format!(
        "<!DOCTYPE html>\n<html>\n<head><title>{title}</title></head>\n<body>\n{body}\n</body>\n</html>\n"
    ))
}

fn setup_form() -> Html<String> {
    page(
        "Setup",
        "<h1>Instance setup</h1>\n<form method=\"post\" action=\"/setup/complete\">\n<input name=\"username\" placeholder=\"username\">\n<input name=\"password\" type=\"password\" placeholder=\"password\">\n<button type=\"submit\">Create account</button>\n</form>",
    )
}

fn login_form() -> Html<String> {
    page(
        "Login",
        "<h1>Login</h1>\n<form method=\"post\" action=\"/login\">\n<input name=\"username\" placeholder=\"username\">\n<input name=\"password\" type=\"password\" placeholder=\"password\">\n<button type=\"submit\">Login</button>\n</form>",
    )
}

/// GET /
///
/// Shows the setup form until the instance has a local user, the login
/// form until a session exists, and the recent-posts feed afterwards.
async fn index(State(state): State<AppState>, jar: CookieJar) -> Result<Response, AppError> {
    if !state.db.local_user_exists().await? {
        return Ok(setup_form().into_response());
    }

    let Some(username) = session_username(&state, &jar) else {
        return Ok(login_form().into_response());
    };

    let posts = state.post_service().recent(10).await?;
    let mut items = String::new();
    for post in &posts {
        let author = match &post.host {
            Some(host) => format!("@{}@{}", post.username, host),
            None => format!("@{}", post.username),
        };
        // Content is already escaped at creation; author names are not.
        items.push_str(&format!(
            "<li><strong>{}</strong> {}</li>\n",
            html_escape::encode_text(&author),
            post.content
        ));
    }

    let body = format!(
        "<h1>Home</h1>\n<p>Logged in as @{username}</p>\n<form method=\"post\" action=\"/post/create\">\n<textarea name=\"content\"></textarea>\n<button type=\"submit\">Post</button>\n</form>\n<ul>\n{items}</ul>",
        username = html_escape::encode_text(&username),
    );

    Ok(page("Home", &body).into_response())
}

/// GET /setup
async fn setup_page(State(state): State<AppState>) -> Result<Response, AppError> {
    if state.db.local_user_exists().await? {
        return Ok(Redirect::to("/").into_response());
    }
    Ok(setup_form().into_response())
}

/// POST /setup/complete
///
/// One-time account creation. A second attempt fails with the setup
/// guard regardless of credentials.
async fn setup_complete(
    State(state): State<AppState>,
    Form(form): Form<CredentialsForm>,
) -> Result<impl IntoResponse, AppError> {
    state
        .account_service()
        .setup(&form.username, &form.password)
        .await?;

    Ok((
        StatusCode::OK,
        "Setup Complete! Login from the Root page!",
    ))
}

/// POST /login
///
/// Sets the signed session cookie on success.
async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<CredentialsForm>,
) -> Result<Response, AppError> {
    if !state.db.local_user_exists().await? {
        return Ok(Redirect::to("/setup").into_response());
    }

    if !state
        .account_service()
        .verify_password(&form.username, &form.password)
        .await?
    {
        return Ok((
            StatusCode::UNAUTHORIZED,
            "Login Failed; Incorrect username or password",
        )
            .into_response());
    }

    let session = Session::new(form.username, state.config.auth.session_max_age);
    let token = create_session_token(&session, &state.config.auth.session_secret)?;
    let jar = jar.add(session_cookie(&state, token));

    Ok((jar, Redirect::to("/")).into_response())
}

/// POST /post/create
///
/// Creates a post for the logged-in user and returns immediately; the
/// Create activity is delivered by the background queue.
async fn post_create(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<PostForm>,
) -> Result<Response, AppError> {
    let Some(username) = session_username(&state, &jar) else {
        let jar = jar.remove(cleared_session_cookie());
        return Ok((jar, (StatusCode::FORBIDDEN, "Forbidden")).into_response());
    };

    state.post_service().create(&username, &form.content).await?;

    Ok(Redirect::to("/").into_response())
}
