use axum::{Extension, extract::State, response::IntoResponse};
use axum_extra::extract::cookie::CookieJar;

use blog_types::api::CommentList;

use crate::auth::{AppState, blocking};
use crate::error::Result;
use crate::flash;
use crate::middleware::CurrentUser;

pub async fn list_comments(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    jar: CookieJar,
) -> Result<impl IntoResponse> {
    let comments = blocking(&state, |svc| svc.list_comments()).await?;
    Ok(flash::render(jar, current.view(), CommentList { comments }))
}
