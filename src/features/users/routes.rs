use crate::features::users::handlers::user_handler;
use crate::features::users::services::UserService;
use axum::{
    routing::{get, put},
    Router,
};
use std::sync::Arc;

pub fn routes(service: Arc<UserService>) -> Router {
    Router::new()
        .route(
            "/api/users",
            get(user_handler::list_users).post(user_handler::create_user),
        )
        .route("/api/users/me", get(user_handler::get_me))
        .route("/api/users/{id}", get(user_handler::get_user))
        .route("/api/users/{id}/role", put(user_handler::update_role))
        .with_state(service)
}
