use axum::{Json, response::Redirect};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD as B64;

use blog_types::api::Page;
use blog_types::models::User;

/// One-shot notice shown on the next page the browser renders.
pub const FLASH_COOKIE: &str = "blog_flash";

/// Redirect to `to`, leaving `message` for the page that follows.
pub fn redirect(jar: CookieJar, message: &str, to: &str) -> (CookieJar, Redirect) {
    let cookie = Cookie::build((FLASH_COOKIE, B64.encode(message)))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax);
    (jar.add(cookie), Redirect::to(to))
}

/// Pop the pending message, if any.
pub fn take(jar: CookieJar) -> (CookieJar, Option<String>) {
    let Some(cookie) = jar.get(FLASH_COOKIE) else {
        return (jar, None);
    };

    let message = B64
        .decode(cookie.value())
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok());

    (jar.remove(Cookie::build(FLASH_COOKIE).path("/")), message)
}

pub fn render<T>(
    jar: CookieJar,
    current_user: Option<User>,
    content: T,
) -> (CookieJar, Json<Page<T>>) {
    let (jar, flash) = take(jar);
    (
        jar,
        Json(Page {
            flash,
            current_user,
            content,
        }),
    )
}
