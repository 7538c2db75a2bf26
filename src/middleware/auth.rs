use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::CookieJar;

use crate::{
    AppState,
    error::AppError,
    routes::{found, user::{User, UserRole}},
    session::{SESSION_COOKIE, SessionData, SessionError},
    utils::verify_token,
};

/// 通过认证的普通用户，由中间件注入
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub email: String,
}

/// 通过认证的管理员
#[derive(Debug, Clone)]
pub struct CurrentAdmin {
    pub email: String,
}

/// 读取 Cookie 对应的服务端会话
pub async fn load_session(
    state: &AppState,
    jar: &CookieJar,
) -> Result<Option<(String, SessionData)>, SessionError> {
    let Some(cookie) = jar.get(SESSION_COOKIE) else {
        return Ok(None);
    };
    let session_id = cookie.value().to_string();
    Ok(state
        .sessions
        .load(&session_id)
        .await?
        .map(|data| (session_id, data)))
}

/// 会话里需要同时有用户邮箱和有效令牌，且令牌主体一致
pub async fn current_user(state: &AppState, jar: &CookieJar) -> Option<String> {
    let data = match load_session(state, jar).await {
        Ok(Some((_, data))) => data,
        Ok(None) => return None,
        Err(e) => {
            tracing::error!("Failed to load session: {}", e);
            return None;
        }
    };

    let email = data.user?;
    let token = data.access_token?;
    match verify_token(&token, &state.config) {
        Ok(claims) if claims.sub == email => Some(email),
        Ok(_) => {
            tracing::warn!("Session token subject does not match session user");
            None
        }
        Err(e) => {
            tracing::debug!("Rejected session token: {}", e);
            None
        }
    }
}

/// JSON 接口：未登录返回 401
pub async fn require_user(
    State(state): State<AppState>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Response {
    match current_user(&state, &jar).await {
        Some(email) => {
            req.extensions_mut().insert(CurrentUser { email });
            next.run(req).await
        }
        None => AppError::Unauthorized.into_response(),
    }
}

/// 页面：未登录跳转到登录页
pub async fn require_user_page(
    State(state): State<AppState>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Response {
    match current_user(&state, &jar).await {
        Some(email) => {
            req.extensions_mut().insert(CurrentUser { email });
            next.run(req).await
        }
        None => found("/login"),
    }
}

/// 管理后台：令牌无效跳转管理员登录页，角色不符返回 403
pub async fn require_admin(
    State(state): State<AppState>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Response {
    let token = match load_session(&state, &jar).await {
        Ok(Some((_, data))) => data.admin_access_token,
        Ok(None) => None,
        Err(e) => {
            tracing::error!("Failed to load session: {}", e);
            None
        }
    };
    let Some(token) = token else {
        return found("/admin/login");
    };
    let claims = match verify_token(&token, &state.config) {
        Ok(claims) => claims,
        Err(e) => {
            tracing::debug!("Rejected admin token: {}", e);
            return found("/admin/login");
        }
    };

    // 角色以数据库为准
    match User::role_of(&state.pool, &claims.sub).await {
        Ok(Some(UserRole::Admin)) => {
            req.extensions_mut().insert(CurrentAdmin { email: claims.sub });
            next.run(req).await
        }
        Ok(_) => AppError::Forbidden.into_response(),
        Err(e) => AppError::Database(e).into_response(),
    }
}
