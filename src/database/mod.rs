// 数据库模块
// 连接池与建表

use sqlx::Executor;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use crate::config::Config;

const INITIAL_SCHEMA: &str = include_str!("../../migrations/001_initial.sql");

pub async fn connect(config: &Config) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .after_connect(|conn, _meta| {
            Box::pin(async move {
                conn.execute("SET application_name = 'sentiment_backend';")
                    .await?;
                Ok(())
            })
        })
        .connect(&config.database_url)
        .await
}

/// 逐条执行建表语句，可重复执行
pub async fn init_schema(pool: &PgPool) -> Result<(), sqlx::Error> {
    for statement in split_statements(INITIAL_SCHEMA) {
        sqlx::query(&statement).execute(pool).await?;
    }
    tracing::info!("Database schema ready");
    Ok(())
}

fn split_statements(sql: &str) -> Vec<String> {
    sql.split(';')
        .map(|statement| {
            statement
                .lines()
                .filter(|line| !line.trim().starts_with("--"))
                .collect::<Vec<_>>()
                .join("\n")
        })
        .map(|statement| statement.trim().to_string())
        .filter(|statement| !statement.is_empty())
        .collect()
}
