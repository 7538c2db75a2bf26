use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use sentiment_backend::{
    AppState,
    config::Config,
    database,
    inference::SentimentClassifier,
    router::create_router,
    routes::user::{AdminCreation, NewUser, User, normalize_email},
    session::SessionStore,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "sentiment-backend", version, about = "Review sentiment web service")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// 启动 HTTP 服务（默认）
    Serve,
    /// 创建管理员账号，邮箱已存在时跳过
    CreateAdmin {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        cnic: String,
        #[arg(long, env = "ADMIN_PASSWORD", hide_env_values = true)]
        password: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 初始化日志
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    // 加载配置
    let config = Config::from_env().context("DATABASE_URL and JWT_SECRET must be set")?;

    let pool = database::connect(&config)
        .await
        .context("Failed to connect to Postgres")?;
    database::init_schema(&pool)
        .await
        .context("Failed to initialize database schema")?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config, pool).await,
        Command::CreateAdmin {
            name,
            email,
            cnic,
            password,
        } => {
            let new_user = NewUser {
                name: name.trim().to_string(),
                email: normalize_email(&email),
                cnic: cnic.trim().to_string(),
                password,
            };
            if new_user.name.is_empty()
                || new_user.email.is_empty()
                || new_user.cnic.is_empty()
                || new_user.password.is_empty()
            {
                bail!("name, email, cnic and password must not be empty");
            }
            match User::create_admin(&pool, new_user).await? {
                AdminCreation::Created(user) => {
                    tracing::info!("Admin user {} created with id {}", user.email, user.id)
                }
                AdminCreation::AlreadyExists => {
                    tracing::warn!("A user with this email already exists, nothing created")
                }
            }
            Ok(())
        }
    }
}

async fn serve(config: Config, pool: sqlx::PgPool) -> anyhow::Result<()> {
    #[cfg(debug_assertions)]
    tracing::info!("Running in debug mode with CORS enabled");

    #[cfg(not(debug_assertions))]
    tracing::info!("Running in production mode with CORS disabled");

    // 会话存储：配置了 Redis 就用 Redis
    let sessions = match &config.redis_url {
        Some(url) => {
            let client = redis::Client::open(url.as_str()).context("Invalid REDIS_URL")?;
            tracing::info!("Using Redis session store");
            SessionStore::redis(client)
        }
        None => {
            tracing::warn!("REDIS_URL not set, sessions are kept in memory");
            SessionStore::memory()
        }
    };

    // 模型加载失败直接退出
    let model_dir = config.model_dir.clone();
    let max_len = config.max_sequence_len;
    let classifier =
        tokio::task::spawn_blocking(move || SentimentClassifier::load(&model_dir, max_len))
            .await
            .context("Model loading task panicked")?
            .with_context(|| {
                format!(
                    "Failed to load sentiment model from {}",
                    config.model_dir.display()
                )
            })?;

    let state = AppState {
        pool,
        config: config.clone(),
        sessions,
        classifier: Arc::new(classifier),
    };
    let app = create_router(state);

    // 启动服务器
    let addr = SocketAddr::new(
        config.server_host.parse().unwrap_or_else(|_| {
            tracing::warn!("Invalid server_host, falling back to dual-stack default");
            IpAddr::V6(std::net::Ipv6Addr::UNSPECIFIED)
        }),
        config.server_port,
    );
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!("Server listening on {}", addr);
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .context("Server error")?;
    Ok(())
}
