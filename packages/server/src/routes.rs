use axum::{
    Router,
    routing::{delete, get, post},
};

use crate::handlers;
use crate::state::AppState;

pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/users", user_routes())
        .nest("/images", image_routes())
}

fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(handlers::auth::register))
        .route("/login", post(handlers::auth::login))
        .route("/profile", get(handlers::auth::profile))
}

fn image_routes() -> Router<AppState> {
    let upload = Router::new()
        .route("/upload", post(handlers::image::upload))
        .layer(handlers::image::upload_body_limit());

    Router::new()
        .route("/", get(handlers::image::list))
        .route("/search", get(handlers::image::search))
        .route("/{id}", delete(handlers::image::delete))
        .merge(upload)
}
