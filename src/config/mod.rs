use std::env;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, serde::Deserialize)]
pub struct Config {
    pub database_url: String,
    pub redis_url: Option<String>,
    pub jwt_secret: String,
    pub access_token_expire_minutes: u64,
    pub session_ttl_secs: u64,
    pub server_host: String,
    pub server_port: u16,
    pub model_dir: PathBuf,
    pub static_dir: PathBuf,
    pub max_sequence_len: usize,
}

impl Config {
    /// 只给出必填项，其余取默认值
    pub fn new(database_url: &str, jwt_secret: &str) -> Self {
        Config {
            database_url: database_url.to_string(),
            redis_url: None,
            jwt_secret: jwt_secret.to_string(),
            access_token_expire_minutes: 30,
            session_ttl_secs: 24 * 3600,
            server_host: "0.0.0.0".to_string(),
            server_port: 8000,
            model_dir: PathBuf::from("models"),
            static_dir: PathBuf::from("static"),
            max_sequence_len: crate::inference::DEFAULT_MAX_LEN,
        }
    }

    pub fn from_env() -> Result<Self, env::VarError> {
        dotenv::dotenv().ok();

        let mut config = Config::new(&env::var("DATABASE_URL")?, &env::var("JWT_SECRET")?);

        config.redis_url = env::var("REDIS_URL").ok().filter(|url| !url.trim().is_empty());
        if let Ok(host) = env::var("SERVER_HOST") {
            config.server_host = host;
        }
        config.server_port = parse_or("SERVER_PORT", config.server_port);
        config.access_token_expire_minutes =
            parse_or("ACCESS_TOKEN_EXPIRE_MINUTES", config.access_token_expire_minutes);
        config.session_ttl_secs = parse_or("SESSION_TTL_SECS", config.session_ttl_secs);
        config.max_sequence_len = parse_or("MAX_SEQUENCE_LEN", config.max_sequence_len);
        if let Ok(dir) = env::var("MODEL_DIR") {
            config.model_dir = PathBuf::from(dir);
        }
        if let Ok(dir) = env::var("STATIC_DIR") {
            config.static_dir = PathBuf::from(dir);
        }

        Ok(config)
    }

    pub fn access_token_expiration(&self) -> Duration {
        Duration::from_secs(self.access_token_expire_minutes * 60)
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }
}

fn parse_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!("Invalid {}={:?}, using default", key, raw);
            default
        }),
        Err(_) => default,
    }
}
