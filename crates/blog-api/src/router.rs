use axum::{
    Router,
    middleware::{from_fn, from_fn_with_state},
    routing::get,
};
use tower_http::trace::TraceLayer;

use crate::auth::{self, AppState};
use crate::middleware::{require_auth, resolve_session};
use crate::{articles, comments};

pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/", get(articles::index))
        .route("/register", get(auth::register_page).post(auth::register))
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/article/{id}", get(articles::article_page).post(articles::post_comment))
        .route("/comments", get(comments::list_comments));

    let protected_routes = Router::new()
        .route("/logout", get(auth::logout))
        .route("/post", get(articles::new_article_page).post(articles::create_article))
        .route("/edit/{id}", get(articles::edit_page).post(articles::edit_article))
        .route_layer(from_fn(require_auth));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(from_fn_with_state(state.clone(), resolve_session))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
