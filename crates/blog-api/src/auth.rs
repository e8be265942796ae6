use std::sync::Arc;

use axum::{
    Extension, Form,
    extract::State,
    response::{IntoResponse, Redirect},
};
use axum_extra::extract::cookie::CookieJar;
use tracing::info;

use blog_types::api::{FormKind, FormView, LoginForm, RegisterForm};

use crate::error::{BlogError, Result};
use crate::flash;
use crate::middleware::{self, CurrentUser, SESSION_COOKIE};
use crate::service::BlogService;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub service: BlogService,
    /// Mark the session cookie `Secure` (HTTPS deployments).
    pub cookie_secure: bool,
}

/// Run a service call off the async runtime; the store is synchronous.
pub async fn blocking<F, T>(state: &AppState, f: F) -> Result<T>
where
    F: FnOnce(&BlogService) -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state.service)).await?
}

pub async fn register_page(
    Extension(current): Extension<CurrentUser>,
    jar: CookieJar,
) -> impl IntoResponse {
    flash::render(
        jar,
        current.view(),
        FormView {
            form: FormKind::Register,
            article: None,
        },
    )
}

pub async fn register(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<RegisterForm>,
) -> Result<(CookieJar, Redirect)> {
    let outcome = blocking(&state, move |svc| {
        svc.register(&form.username, &form.email, &form.password)
    })
    .await;

    match outcome {
        Ok(_) => Ok(flash::redirect(
            jar,
            "Registration complete. Please log in.",
            "/login",
        )),
        Err(e) if e.is_recoverable() => Ok(flash::redirect(jar, &e.to_string(), "/register")),
        Err(e) => Err(e),
    }
}

pub async fn login_page(
    Extension(current): Extension<CurrentUser>,
    jar: CookieJar,
) -> impl IntoResponse {
    flash::render(
        jar,
        current.view(),
        FormView {
            form: FormKind::Login,
            article: None,
        },
    )
}

pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Result<(CookieJar, Redirect)> {
    let outcome = blocking(&state, move |svc| svc.login(&form.email, &form.password)).await;

    match outcome {
        Ok((_, token)) => {
            let cookie = middleware::session_cookie(token.into_string(), state.cookie_secure);
            Ok((jar.add(cookie), Redirect::to("/")))
        }
        Err(e @ BlogError::AuthenticationFailed) => {
            Ok(flash::redirect(jar, &e.to_string(), "/login"))
        }
        Err(e) => Err(e),
    }
}

pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> (CookieJar, Redirect) {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        if state.service.logout(cookie.value()) {
            info!("Session closed");
        }
    }

    (
        jar.remove(middleware::expired_session_cookie()),
        Redirect::to("/"),
    )
}
