use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use redis::{AsyncCommands, Client as RedisClient};
use thiserror::Error;
use tokio::sync::RwLock;

use super::model::SessionData;

const SESSION_KEY_PREFIX: &str = "session:";

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),
    #[error("session serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

#[derive(Debug)]
pub struct MemoryEntry {
    data: SessionData,
    expires_at: i64,
}

/// 服务端会话存储
///
/// 配置了 Redis 时使用 `session:{id}` 键并设置过期时间；否则退化为进程内存表。
#[derive(Clone)]
pub enum SessionStore {
    Redis(Arc<RedisClient>),
    Memory(Arc<RwLock<HashMap<String, MemoryEntry>>>),
}

impl SessionStore {
    pub fn redis(client: RedisClient) -> Self {
        SessionStore::Redis(Arc::new(client))
    }

    pub fn memory() -> Self {
        SessionStore::Memory(Arc::new(RwLock::new(HashMap::new())))
    }

    pub fn new_session_id() -> String {
        uuid::Uuid::new_v4().to_string()
    }

    fn key(session_id: &str) -> String {
        format!("{}{}", SESSION_KEY_PREFIX, session_id)
    }

    /// 获取会话
    pub async fn load(&self, session_id: &str) -> Result<Option<SessionData>, SessionError> {
        match self {
            SessionStore::Redis(redis) => {
                let mut conn = redis.get_multiplexed_async_connection().await?;
                let result: Option<String> = conn.get(Self::key(session_id)).await?;
                match result {
                    Some(json) => Ok(Some(serde_json::from_str(&json)?)),
                    None => Ok(None),
                }
            }
            SessionStore::Memory(map) => {
                let now = chrono::Utc::now().timestamp();
                let sessions = map.read().await;
                Ok(sessions
                    .get(session_id)
                    .filter(|entry| entry.expires_at > now)
                    .map(|entry| entry.data.clone()))
            }
        }
    }

    /// 保存会话，并刷新过期时间
    pub async fn save(
        &self,
        session_id: &str,
        data: &SessionData,
        ttl: Duration,
    ) -> Result<(), SessionError> {
        match self {
            SessionStore::Redis(redis) => {
                let mut conn = redis.get_multiplexed_async_connection().await?;
                let json = serde_json::to_string(data)?;
                let _: () = conn.set_ex(Self::key(session_id), json, ttl.as_secs().max(1)).await?;
                Ok(())
            }
            SessionStore::Memory(map) => {
                let now = chrono::Utc::now().timestamp();
                let mut sessions = map.write().await;
                // 顺手清理过期会话
                sessions.retain(|_, entry| entry.expires_at > now);
                sessions.insert(
                    session_id.to_string(),
                    MemoryEntry {
                        data: data.clone(),
                        expires_at: now + ttl.as_secs() as i64,
                    },
                );
                Ok(())
            }
        }
    }

    /// 删除会话
    pub async fn destroy(&self, session_id: &str) -> Result<(), SessionError> {
        match self {
            SessionStore::Redis(redis) => {
                let mut conn = redis.get_multiplexed_async_connection().await?;
                let _: () = conn.del(Self::key(session_id)).await?;
                Ok(())
            }
            SessionStore::Memory(map) => {
                map.write().await.remove(session_id);
                Ok(())
            }
        }
    }
}
