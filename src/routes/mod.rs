pub mod admin;
pub mod review;
pub mod user;

use axum::{
    extract::State,
    http::{HeaderName, StatusCode, header},
    response::{IntoResponse, Response},
};
use axum_extra::extract::CookieJar;

use crate::{
    AppState,
    middleware::current_user,
    templates::{IndexTemplate, render_template},
};

/// 禁止浏览器缓存登录态相关页面
pub const NO_STORE_HEADERS: [(HeaderName, &str); 3] = [
    (
        header::CACHE_CONTROL,
        "no-store, no-cache, must-revalidate, max-age=0",
    ),
    (header::PRAGMA, "no-cache"),
    (header::EXPIRES, "0"),
];

/// 302 跳转
pub fn found(location: &'static str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location)]).into_response()
}

pub async fn index(State(state): State<AppState>, jar: CookieJar) -> Response {
    let user = current_user(&state, &jar).await;
    render_template(IndexTemplate { user })
}
