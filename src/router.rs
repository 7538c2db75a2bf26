use axum::{
    Router,
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
};
use tower_http::{services::ServeDir, trace::TraceLayer};

use crate::{
    AppState,
    middleware::{log_errors, require_admin, require_user, require_user_page},
    routes::{self, admin, review, user},
};

// 无需登录的页面和接口
fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(routes::index))
        .route("/signup", get(user::signup_page).post(user::signup))
        .route("/login", get(user::login_page).post(user::login))
        .route("/logout", get(user::logout))
        .route("/api/check-auth", get(user::check_auth))
        .route(
            "/admin/login",
            get(admin::admin_login_page).post(admin::admin_login),
        )
        .route("/admin/logout", get(admin::admin_logout))
}

// 创建主路由
pub fn create_router(state: AppState) -> Router {
    let review_page = Router::new()
        .route("/review", get(review::review_page))
        .route_layer(from_fn_with_state(state.clone(), require_user_page));

    let user_api = Router::new()
        .route("/predict", post(review::predict))
        .route("/api/user-reviews", get(review::user_reviews))
        .route_layer(from_fn_with_state(state.clone(), require_user));

    let admin_pages = Router::new()
        .route("/admin/dashboard", get(admin::admin_dashboard))
        .route_layer(from_fn_with_state(state.clone(), require_admin));

    let router = Router::new()
        .merge(public_routes())
        .merge(review_page)
        .merge(user_api)
        .merge(admin_pages)
        .nest_service("/static", ServeDir::new(&state.config.static_dir))
        .layer(from_fn(log_errors))
        .layer(TraceLayer::new_for_http());

    // 开发模式放开跨域
    #[cfg(debug_assertions)]
    let router = router.layer(tower_http::cors::CorsLayer::permissive());

    router.with_state(state)
}
