use axum::{
    Extension, Form,
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;

use blog_types::api::{ArticleForm, ArticleList, CommentForm, FormKind, FormView};

use crate::auth::{AppState, blocking};
use crate::error::{BlogError, Result};
use crate::flash;
use crate::middleware::{CurrentUser, SignedIn};

pub async fn index(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    jar: CookieJar,
) -> Result<impl IntoResponse> {
    let articles = blocking(&state, |svc| svc.list_articles()).await?;
    Ok(flash::render(jar, current.view(), ArticleList { articles }))
}

pub async fn new_article_page(
    Extension(signed_in): Extension<SignedIn>,
    jar: CookieJar,
) -> impl IntoResponse {
    flash::render(
        jar,
        Some(signed_in.view()),
        FormView {
            form: FormKind::Article,
            article: None,
        },
    )
}

pub async fn create_article(
    State(state): State<AppState>,
    Extension(SignedIn(user)): Extension<SignedIn>,
    jar: CookieJar,
    Form(form): Form<ArticleForm>,
) -> Result<(CookieJar, Redirect)> {
    let outcome = blocking(&state, move |svc| {
        svc.create_article(user.id, &form.title, &form.body)
    })
    .await;

    match outcome {
        Ok(_) => Ok(flash::redirect(jar, "Article posted.", "/")),
        Err(e) if e.is_recoverable() => Ok(flash::redirect(jar, &e.to_string(), "/post")),
        Err(e) => Err(e),
    }
}

pub async fn edit_page(
    State(state): State<AppState>,
    Extension(signed_in): Extension<SignedIn>,
    jar: CookieJar,
    Path(id): Path<i64>,
) -> Result<Response> {
    let caller = signed_in.0.id;

    match blocking(&state, move |svc| svc.article_for_edit(caller, id)).await {
        Ok(article) => Ok(flash::render(
            jar,
            Some(signed_in.view()),
            FormView {
                form: FormKind::Article,
                article: Some(article),
            },
        )
        .into_response()),
        Err(e @ BlogError::Forbidden) => Ok(flash::redirect(jar, &e.to_string(), "/").into_response()),
        Err(e) => Err(e),
    }
}

pub async fn edit_article(
    State(state): State<AppState>,
    Extension(SignedIn(user)): Extension<SignedIn>,
    jar: CookieJar,
    Path(id): Path<i64>,
    Form(form): Form<ArticleForm>,
) -> Result<(CookieJar, Redirect)> {
    let outcome = blocking(&state, move |svc| {
        svc.edit_article(user.id, id, &form.title, &form.body)
    })
    .await;

    match outcome {
        Ok(_) => Ok(flash::redirect(jar, "Article updated.", &format!("/article/{id}"))),
        Err(e @ BlogError::Forbidden) => Ok(flash::redirect(jar, &e.to_string(), "/")),
        Err(e @ BlogError::ValidationFailed(_)) => {
            Ok(flash::redirect(jar, &e.to_string(), &format!("/edit/{id}")))
        }
        Err(e) => Err(e),
    }
}

pub async fn article_page(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    jar: CookieJar,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse> {
    let detail = blocking(&state, move |svc| svc.view_article(id)).await?;
    Ok(flash::render(jar, current.view(), detail))
}

/// Anonymous posts land back on the article with nothing stored.
pub async fn post_comment(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    jar: CookieJar,
    Path(id): Path<i64>,
    Form(form): Form<CommentForm>,
) -> Result<(CookieJar, Redirect)> {
    let caller = current.id();
    let target = format!("/article/{id}");

    match blocking(&state, move |svc| svc.add_comment(caller, id, &form.body)).await {
        Ok(Some(_)) => Ok(flash::redirect(jar, "Comment posted.", &target)),
        Ok(None) => Ok((jar, Redirect::to(&target))),
        Err(e @ BlogError::ValidationFailed(_)) => Ok(flash::redirect(jar, &e.to_string(), &target)),
        Err(e) => Err(e),
    }
}
