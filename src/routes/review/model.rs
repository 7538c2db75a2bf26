use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};

use crate::inference::SentimentResult;

/// 用户历史记录默认条数
pub const RECENT_REVIEW_LIMIT: i64 = 5;

#[derive(Debug, FromRow)]
struct ReviewRow {
    id: i32,
    user_id: i32,
    review_text: String,
    sentiment_results: String,
    created_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
struct ReviewWithUserRow {
    id: i32,
    user_id: i32,
    review_text: String,
    sentiment_results: String,
    created_at: DateTime<Utc>,
    user_name: String,
    user_email: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Review {
    pub id: i32,
    pub user_id: i32,
    pub review_text: String,
    pub sentiment_results: SentimentResult,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReviewWithUser {
    pub id: i32,
    pub user_id: i32,
    pub review_text: String,
    pub sentiment_results: SentimentResult,
    pub created_at: DateTime<Utc>,
    pub user_name: String,
    pub user_email: String,
}

#[derive(Debug, Deserialize)]
pub struct PredictForm {
    pub text: Option<String>,
}

// 结果以 JSON 文本存库
fn parse_results(raw: &str) -> Result<SentimentResult, sqlx::Error> {
    serde_json::from_str(raw).map_err(|e| sqlx::Error::Decode(Box::new(e)))
}

impl TryFrom<ReviewRow> for Review {
    type Error = sqlx::Error;

    fn try_from(row: ReviewRow) -> Result<Self, Self::Error> {
        Ok(Review {
            sentiment_results: parse_results(&row.sentiment_results)?,
            id: row.id,
            user_id: row.user_id,
            review_text: row.review_text,
            created_at: row.created_at,
        })
    }
}

impl TryFrom<ReviewWithUserRow> for ReviewWithUser {
    type Error = sqlx::Error;

    fn try_from(row: ReviewWithUserRow) -> Result<Self, Self::Error> {
        Ok(ReviewWithUser {
            sentiment_results: parse_results(&row.sentiment_results)?,
            id: row.id,
            user_id: row.user_id,
            review_text: row.review_text,
            created_at: row.created_at,
            user_name: row.user_name,
            user_email: row.user_email,
        })
    }
}

impl Review {
    pub async fn create(
        pool: &PgPool,
        user_id: i32,
        review_text: &str,
        results: &SentimentResult,
    ) -> Result<Self, sqlx::Error> {
        let results_json =
            serde_json::to_string(results).map_err(|e| sqlx::Error::Encode(Box::new(e)))?;

        let row = sqlx::query_as::<_, ReviewRow>(
            r#"
            INSERT INTO reviews (user_id, review_text, sentiment_results)
            VALUES ($1, $2, $3)
            RETURNING id, user_id, review_text, sentiment_results, created_at
            "#,
        )
        .bind(user_id)
        .bind(review_text)
        .bind(results_json)
        .fetch_one(pool)
        .await?;

        row.try_into()
    }

    /// 最新的在前
    pub async fn recent_for_user(
        pool: &PgPool,
        user_id: i32,
        limit: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let rows = sqlx::query_as::<_, ReviewRow>(
            r#"
            SELECT id, user_id, review_text, sentiment_results, created_at
            FROM reviews
            WHERE user_id = $1
            ORDER BY created_at DESC, id DESC
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(pool)
        .await?;

        rows.into_iter().map(Review::try_from).collect()
    }

    pub async fn all_with_user(pool: &PgPool) -> Result<Vec<ReviewWithUser>, sqlx::Error> {
        let rows = sqlx::query_as::<_, ReviewWithUserRow>(
            r#"
            SELECT r.id, r.user_id, r.review_text, r.sentiment_results, r.created_at,
                   u.name AS user_name, u.email AS user_email
            FROM reviews r
            JOIN users u ON r.user_id = u.id
            ORDER BY r.created_at DESC, r.id DESC
            "#,
        )
        .fetch_all(pool)
        .await?;

        rows.into_iter().map(ReviewWithUser::try_from).collect()
    }
}
