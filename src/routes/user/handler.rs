use axum::{
    extract::{Form, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::CookieJar;

use crate::{
    AppState,
    error::AppError,
    middleware::current_user,
    routes::{NO_STORE_HEADERS, found},
    session::{SESSION_COOKIE, SessionData, SessionStore, removal_cookie, session_cookie},
    templates::{LoginTemplate, SignupTemplate, render_template, render_with_status},
    utils::{ApiResponse, error_codes, generate_token, success_to_api_response},
};

use super::model::{CheckAuthResponse, LoginForm, SignupForm, User, is_unique_violation};

pub async fn signup_page() -> Response {
    render_template(SignupTemplate { error: None })
}

fn signup_error(message: &str) -> Response {
    render_with_status(
        StatusCode::BAD_REQUEST,
        SignupTemplate {
            error: Some(message.to_string()),
        },
    )
}

#[axum::debug_handler]
pub async fn signup(
    State(state): State<AppState>,
    Form(form): Form<SignupForm>,
) -> Result<Response, AppError> {
    let Some(new_user) = form.into_new_user() else {
        return Ok(signup_error("All fields are required"));
    };

    if !new_user.email.contains('@') {
        return Ok(signup_error("Invalid email address"));
    }

    // 邮箱或身份证号已注册
    if User::exists_by_email_or_cnic(&state.pool, &new_user.email, &new_user.cnic).await? {
        return Ok(signup_error("Email or CNIC already registered"));
    }

    match User::create(&state.pool, new_user).await {
        Ok(_) => Ok(Redirect::to("/login").into_response()),
        // 并发注册时由唯一约束兜底
        Err(e) if is_unique_violation(&e) => Ok(signup_error("Email or CNIC already registered")),
        Err(e) => Err(e.into()),
    }
}

/// 销毁当前会话（如果有），返回移除了会话 Cookie 的 jar
async fn end_session(state: &AppState, jar: CookieJar) -> CookieJar {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        if let Err(e) = state.sessions.destroy(cookie.value()).await {
            tracing::error!("Failed to destroy session: {}", e);
        }
        return jar.remove(removal_cookie());
    }
    jar
}

#[axum::debug_handler]
pub async fn login_page(State(state): State<AppState>, jar: CookieJar) -> Response {
    let jar = end_session(&state, jar).await;
    (jar, render_template(LoginTemplate { error: None })).into_response()
}

#[axum::debug_handler]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    let Some((email, password)) = form.credentials() else {
        return Ok(render_with_status(
            StatusCode::BAD_REQUEST,
            LoginTemplate {
                error: Some("Email and password are required".into()),
            },
        ));
    };

    let user = match User::find_by_email(&state.pool, &email).await? {
        Some(user) => user,
        None => return Ok(invalid_credentials()),
    };

    let verified = user.verify_login(password).await?;
    if !verified {
        tracing::info!("Rejected login for user {}", user.id);
        return Ok(invalid_credentials());
    }

    let (token, _) = generate_token(&user.email, &state.config)
        .map_err(|e| AppError::Internal(format!("failed to issue token: {}", e)))?;

    // 登录时总是换新的会话ID
    let jar = end_session(&state, jar).await;
    let session_id = SessionStore::new_session_id();
    state
        .sessions
        .save(
            &session_id,
            &SessionData::for_user(&user.email, token),
            state.config.session_ttl(),
        )
        .await?;

    tracing::info!("User {} logged in", user.id);
    Ok((
        jar.add(session_cookie(session_id)),
        NO_STORE_HEADERS,
        Redirect::to("/review"),
    )
        .into_response())
}

fn invalid_credentials() -> Response {
    render_with_status(
        StatusCode::UNAUTHORIZED,
        LoginTemplate {
            error: Some("Invalid email or password".into()),
        },
    )
}

#[axum::debug_handler]
pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> Response {
    let jar = end_session(&state, jar).await;
    (jar, NO_STORE_HEADERS, found("/login")).into_response()
}

/// 检查当前会话是否已登录
#[axum::debug_handler]
pub async fn check_auth(State(state): State<AppState>, jar: CookieJar) -> Response {
    match current_user(&state, &jar).await {
        Some(email) => (
            StatusCode::OK,
            success_to_api_response(CheckAuthResponse {
                authenticated: true,
                user: Some(email),
            }),
        )
            .into_response(),
        None => (
            StatusCode::UNAUTHORIZED,
            axum::Json(ApiResponse {
                code: error_codes::AUTH_FAILED,
                msg: "Not authenticated".into(),
                resp_data: Some(CheckAuthResponse {
                    authenticated: false,
                    user: None,
                }),
            }),
        )
            .into_response(),
    }
}
