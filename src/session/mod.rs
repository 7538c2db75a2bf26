// 会话模块
// 浏览器只持有会话ID，登录状态保存在服务端

mod model;
mod store;

use axum_extra::extract::cookie::{Cookie, SameSite};

pub use model::SessionData;
pub use store::{SessionError, SessionStore};

/// 会话 Cookie 名称
pub const SESSION_COOKIE: &str = "session";

pub fn session_cookie(session_id: String) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, session_id))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}

/// 删除 Cookie 时 path 必须与设置时一致
pub fn removal_cookie() -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE).path("/").build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_cookie_is_http_only() {
        let cookie = session_cookie("abc".into());
        assert_eq!(cookie.name(), SESSION_COOKIE);
        assert_eq!(cookie.value(), "abc");
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
    }
}
