use axum::{
    extract::{Extension, Form, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::CookieJar;

use crate::{
    AppState,
    error::AppError,
    middleware::{CurrentAdmin, load_session},
    routes::{
        NO_STORE_HEADERS, found,
        review::Review,
        user::{User, UserRole, model::LoginForm},
    },
    session::{SessionData, SessionStore, session_cookie},
    templates::{AdminDashboardTemplate, AdminLoginTemplate, render_template, render_with_status},
    utils::generate_token,
};

fn admin_login_error(status: StatusCode, message: &str) -> Response {
    render_with_status(
        status,
        AdminLoginTemplate {
            error: Some(message.to_string()),
        },
    )
}

pub async fn admin_login_page() -> Response {
    render_template(AdminLoginTemplate { error: None })
}

#[axum::debug_handler]
pub async fn admin_login(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    let Some((email, password)) = form.credentials() else {
        return Ok(admin_login_error(
            StatusCode::BAD_REQUEST,
            "Email and password are required",
        ));
    };

    let user = match User::find_by_email(&state.pool, &email).await? {
        Some(user) => user,
        None => {
            return Ok(admin_login_error(
                StatusCode::UNAUTHORIZED,
                "Invalid email or password",
            ));
        }
    };

    let verified = user.verify_login(password).await?;
    if !verified {
        return Ok(admin_login_error(
            StatusCode::UNAUTHORIZED,
            "Invalid email or password",
        ));
    }

    if user.role() != Some(UserRole::Admin) {
        tracing::warn!("Non-admin user {} tried the admin login", user.id);
        return Ok(admin_login_error(
            StatusCode::FORBIDDEN,
            "Access denied: Not an admin",
        ));
    }

    let (token, _) = generate_token(&user.email, &state.config)
        .map_err(|e| AppError::Internal(format!("failed to issue token: {}", e)))?;

    // 保留已有会话内容，但总是换新的会话ID
    let mut data = match load_session(&state, &jar).await? {
        Some((old_id, data)) => {
            state.sessions.destroy(&old_id).await?;
            data
        }
        None => SessionData::default(),
    };
    data.admin_access_token = Some(token);
    let session_id = SessionStore::new_session_id();
    state
        .sessions
        .save(&session_id, &data, state.config.session_ttl())
        .await?;

    tracing::info!("Admin {} logged in", user.id);
    Ok((
        jar.add(session_cookie(session_id)),
        Redirect::to("/admin/dashboard"),
    )
        .into_response())
}

#[axum::debug_handler]
pub async fn admin_dashboard(
    State(state): State<AppState>,
    Extension(admin): Extension<CurrentAdmin>,
) -> Result<Response, AppError> {
    let users = User::list_all(&state.pool).await?;
    let reviews = Review::all_with_user(&state.pool).await?;

    Ok((
        NO_STORE_HEADERS,
        render_template(AdminDashboardTemplate {
            admin: admin.email,
            users,
            reviews,
        }),
    )
        .into_response())
}

#[axum::debug_handler]
pub async fn admin_logout(State(state): State<AppState>, jar: CookieJar) -> Response {
    match load_session(&state, &jar).await {
        Ok(Some((session_id, mut data))) => {
            data.admin_access_token = None;
            let result = if data.is_empty() {
                state.sessions.destroy(&session_id).await
            } else {
                state
                    .sessions
                    .save(&session_id, &data, state.config.session_ttl())
                    .await
            };
            if let Err(e) = result {
                tracing::error!("Failed to clear admin session: {}", e);
            }
        }
        Ok(None) => {}
        Err(e) => tracing::error!("Failed to load session: {}", e),
    }

    (NO_STORE_HEADERS, found("/admin/login")).into_response()
}
