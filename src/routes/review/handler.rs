use axum::{
    extract::{Extension, Form, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::{
    AppState,
    error::AppError,
    middleware::CurrentUser,
    routes::{NO_STORE_HEADERS, user::User},
    templates::{ReviewTemplate, render_template},
    utils::success_to_api_response,
};

use super::model::{PredictForm, RECENT_REVIEW_LIMIT, Review};

#[axum::debug_handler]
pub async fn review_page(Extension(user): Extension<CurrentUser>) -> Response {
    (
        NO_STORE_HEADERS,
        render_template(ReviewTemplate { user: user.email }),
    )
        .into_response()
}

#[axum::debug_handler]
pub async fn predict(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Form(form): Form<PredictForm>,
) -> Result<impl IntoResponse, AppError> {
    // 只拒绝空文本，纯空白照常推理
    let text = form.text.unwrap_or_default();
    if text.is_empty() {
        return Err(AppError::Validation("No text provided".into()));
    }

    let owner = User::find_by_email(&state.pool, &user.email)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;

    // 推理是纯 CPU 计算，放到阻塞线程池
    let classifier = state.classifier.clone();
    let input = text.clone();
    let result = tokio::task::spawn_blocking(move || classifier.predict(&input))
        .await
        .map_err(|e| AppError::Internal(format!("inference task failed: {}", e)))??;

    let review = Review::create(&state.pool, owner.id, &text, &result).await?;
    tracing::info!(
        review_id = review.id,
        user_id = owner.id,
        sentiment = %result.predicted_sentiment,
        "Stored review"
    );

    Ok((StatusCode::OK, success_to_api_response(result)))
}

#[axum::debug_handler]
pub async fn user_reviews(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> Result<impl IntoResponse, AppError> {
    let owner = User::find_by_email(&state.pool, &user.email)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;

    let reviews = Review::recent_for_user(&state.pool, owner.id, RECENT_REVIEW_LIMIT).await?;
    Ok((StatusCode::OK, success_to_api_response(reviews)))
}
