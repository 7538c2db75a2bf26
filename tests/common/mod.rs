// 集成测试公共工具
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, Response, header},
};
use http_body_util::BodyExt;
use ndarray::{Array1, Array2};
use sentiment_backend::{
    AppState,
    config::Config,
    database,
    inference::{LabelEncoder, LstmClassifier, LstmWeights, SentimentClassifier, WordTokenizer},
    router::create_router,
    session::SessionStore,
};
use sqlx::postgres::PgPoolOptions;

pub const TEST_SECRET: &str = "integration-test-secret";

pub fn database_url() -> String {
    std::env::var("DATABASE_URL")
        .unwrap_or_else(|_| "postgres://postgres@localhost/sentiment_test".to_string())
}

/// 固定权重的小模型，只用于跑通推理流程
pub fn synthetic_classifier() -> SentimentClassifier {
    let words = ["<OOV>", "good", "bad", "movie", "boring", "great"];
    let word_index: HashMap<String, u32> = words
        .iter()
        .enumerate()
        .map(|(i, w)| (w.to_string(), i as u32 + 1))
        .collect();
    let tokenizer = WordTokenizer::new(word_index, None, Some("<OOV>")).unwrap();
    let labels = LabelEncoder::new(vec![
        "negative".to_string(),
        "neutral".to_string(),
        "positive".to_string(),
    ])
    .unwrap();

    let (vocab, embed, hidden, dense, classes) = (words.len() + 1, 4, 3, 5, 3);
    let wave = |seed: usize| move |(r, c): (usize, usize)| ((r * 7 + c * 3 + seed) as f32).sin() * 0.5;
    let weights = LstmWeights {
        embedding: Array2::from_shape_fn((vocab, embed), wave(1)),
        weight_ih: Array2::from_shape_fn((4 * hidden, embed), wave(2)),
        weight_hh: Array2::from_shape_fn((4 * hidden, hidden), wave(3)),
        bias_ih: Array1::zeros(4 * hidden),
        bias_hh: Array1::zeros(4 * hidden),
        fc1_weight: Array2::from_shape_fn((dense, hidden), wave(4)),
        fc1_bias: Array1::from_elem(dense, 0.1),
        fc2_weight: Array2::from_shape_fn((classes, dense), wave(5)),
        fc2_bias: Array1::zeros(classes),
    };
    let model = LstmClassifier::new(weights).unwrap();
    SentimentClassifier::new(tokenizer, labels, model, 16).unwrap()
}

/// 数据库连接延迟建立，不访问数据库的用例无需 Postgres
pub fn lazy_app() -> Router {
    let config = Config::new(&database_url(), TEST_SECRET);
    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect_lazy(&config.database_url)
        .unwrap();
    create_router(AppState {
        pool,
        config,
        sessions: SessionStore::memory(),
        classifier: Arc::new(synthetic_classifier()),
    })
}

/// 连接真实数据库并建表
pub async fn db_app() -> (Router, sqlx::PgPool) {
    let config = Config::new(&database_url(), TEST_SECRET);
    let pool = database::connect(&config).await.unwrap();
    database::init_schema(&pool).await.unwrap();
    let app = create_router(AppState {
        pool: pool.clone(),
        config,
        sessions: SessionStore::memory(),
        classifier: Arc::new(synthetic_classifier()),
    });
    (app, pool)
}

pub fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

pub fn post_form(uri: &str, body: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub async fn body_string(response: Response<Body>) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_str(&body_string(response).await).unwrap()
}

pub fn location(response: &Response<Body>) -> Option<&str> {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
}

/// 取出 `session=<id>` 部分，用作后续请求的 Cookie 头
pub fn session_cookie(response: &Response<Body>) -> Option<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with("session="))
        .and_then(|v| v.split(';').next())
        .map(str::to_string)
}

/// 每个用例使用不同的邮箱和身份证号
pub fn unique_identity() -> (String, String) {
    let id = uuid::Uuid::new_v4().simple().to_string();
    (format!("user-{}@example.com", &id[..12]), format!("cnic-{}", &id[..12]))
}
