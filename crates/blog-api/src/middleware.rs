use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

use blog_db::models::UserRow;
use blog_types::models::User;

use crate::auth::{AppState, blocking};
use crate::session::UserId;

pub const SESSION_COOKIE: &str = "blog_session";

/// The identity behind the request's session cookie, if any. Present on every request.
#[derive(Debug, Clone, Default)]
pub struct CurrentUser(pub Option<UserRow>);

impl CurrentUser {
    pub fn id(&self) -> Option<UserId> {
        self.0.as_ref().map(|u| u.id)
    }

    pub fn view(&self) -> Option<User> {
        self.0.as_ref().map(user_view)
    }
}

/// Inserted by [`require_auth`]; protected handlers can rely on it being there.
#[derive(Debug, Clone)]
pub struct SignedIn(pub UserRow);

impl SignedIn {
    pub fn view(&self) -> User {
        user_view(&self.0)
    }
}

fn user_view(row: &UserRow) -> User {
    User {
        id: row.id,
        username: row.username.clone(),
    }
}

pub fn session_cookie(token: String, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .build()
}

pub fn expired_session_cookie() -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE).path("/").build()
}

/// Resolve the session cookie into a [`CurrentUser`] extension.
pub async fn resolve_session(
    State(state): State<AppState>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Response {
    let user = match jar.get(SESSION_COOKIE).map(|c| c.value().to_string()) {
        Some(token) => match blocking(&state, move |svc| svc.current_user(&token)).await {
            Ok(user) => user,
            Err(e) => return e.into_response(),
        },
        None => None,
    };

    req.extensions_mut().insert(CurrentUser(user));
    next.run(req).await
}

/// Send anonymous visitors to the login form.
pub async fn require_auth(mut req: Request, next: Next) -> Response {
    let user = req
        .extensions()
        .get::<CurrentUser>()
        .and_then(|current| current.0.clone());

    match user {
        Some(user) => {
            req.extensions_mut().insert(SignedIn(user));
            next.run(req).await
        }
        None => Redirect::to("/login").into_response(),
    }
}
