use serde::{Deserialize, Serialize};

/// 会话数据模型
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionData {
    /// 已登录用户邮箱
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub access_token: Option<String>,
    /// 管理后台令牌，与普通登录分开保存
    #[serde(default)]
    pub admin_access_token: Option<String>,
}

impl SessionData {
    pub fn for_user(email: &str, access_token: String) -> Self {
        Self {
            user: Some(email.to_string()),
            access_token: Some(access_token),
            admin_access_token: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.user.is_none() && self.access_token.is_none() && self.admin_access_token.is_none()
    }
}
