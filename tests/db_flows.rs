// 需要可用的 Postgres，运行方式：
// DATABASE_URL=postgres://... cargo test -- --ignored
mod common;

use axum::{Router, http::StatusCode};
use sentiment_backend::routes::user::{AdminCreation, NewUser, User};
use tower::ServiceExt;

use common::*;

async fn signup(app: &Router, email: &str, cnic: &str, password: &str) -> StatusCode {
    let body = format!(
        "name=Test+User&email={}&cnic={}&password={}",
        email.replace('@', "%40"),
        cnic,
        password
    );
    app.clone()
        .oneshot(post_form("/signup", &body, None))
        .await
        .unwrap()
        .status()
}

async fn login(app: &Router, uri: &str, email: &str, password: &str) -> axum::http::Response<axum::body::Body> {
    login_with_cookie(app, uri, email, password, None).await
}

async fn login_with_cookie(
    app: &Router,
    uri: &str,
    email: &str,
    password: &str,
    cookie: Option<&str>,
) -> axum::http::Response<axum::body::Body> {
    let body = format!("email={}&password={}", email.replace('@', "%40"), password);
    app.clone()
        .oneshot(post_form(uri, &body, cookie))
        .await
        .unwrap()
}

async fn create_admin(pool: &sqlx::PgPool, password: &str) -> String {
    let (email, cnic) = unique_identity();
    let created = User::create_admin(
        pool,
        NewUser {
            name: "Admin".into(),
            email: email.clone(),
            cnic,
            password: password.into(),
        },
    )
    .await
    .unwrap();
    assert!(matches!(created, AdminCreation::Created(_)));
    email
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn signup_then_login_opens_review_page() {
    let (app, _pool) = db_app().await;
    let (email, cnic) = unique_identity();

    assert_eq!(signup(&app, &email, &cnic, "secret123").await, StatusCode::SEE_OTHER);

    let response = login(&app, "/login", &email, "secret123").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), Some("/review"));
    let cookie = session_cookie(&response).expect("session cookie");

    let page = app.clone().oneshot(get("/review", Some(&cookie))).await.unwrap();
    assert_eq!(page.status(), StatusCode::OK);
    assert!(body_string(page).await.contains(&email));

    let auth = app.clone().oneshot(get("/api/check-auth", Some(&cookie))).await.unwrap();
    assert_eq!(auth.status(), StatusCode::OK);
    let json = body_json(auth).await;
    assert_eq!(json["resp_data"]["authenticated"], true);
    assert_eq!(json["resp_data"]["user"], email.as_str());

    // 退出后会话失效
    let out = app.clone().oneshot(get("/logout", Some(&cookie))).await.unwrap();
    assert_eq!(out.status(), StatusCode::FOUND);
    let page = app.oneshot(get("/review", Some(&cookie))).await.unwrap();
    assert_eq!(page.status(), StatusCode::FOUND);
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn duplicate_email_or_cnic_is_rejected() {
    let (app, _pool) = db_app().await;
    let (email, cnic) = unique_identity();
    let (other_email, other_cnic) = unique_identity();

    assert_eq!(signup(&app, &email, &cnic, "pw").await, StatusCode::SEE_OTHER);
    assert_eq!(signup(&app, &email, &other_cnic, "pw").await, StatusCode::BAD_REQUEST);
    assert_eq!(signup(&app, &other_email, &cnic, "pw").await, StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn wrong_password_does_not_create_session() {
    let (app, _pool) = db_app().await;
    let (email, cnic) = unique_identity();
    signup(&app, &email, &cnic, "right").await;

    let response = login(&app, "/login", &email, "wrong").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(session_cookie(&response).is_none());

    let response = login(&app, "/login", "nobody@example.com", "whatever").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn predictions_are_stored_and_listed_newest_first() {
    let (app, _pool) = db_app().await;
    let (email, cnic) = unique_identity();
    signup(&app, &email, &cnic, "pw").await;
    let cookie = session_cookie(&login(&app, "/login", &email, "pw").await).unwrap();

    let empty = app
        .clone()
        .oneshot(post_form("/predict", "text=", Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(empty.status(), StatusCode::BAD_REQUEST);

    // 纯空白文本按空串推理，不报错
    let blank = app
        .clone()
        .oneshot(post_form("/predict", "text=+++", Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(blank.status(), StatusCode::OK);

    for i in 0..6 {
        let body = format!("text=review+number+{}+great+movie", i);
        let response = app
            .clone()
            .oneshot(post_form("/predict", &body, Some(&cookie)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        let result = &json["resp_data"];
        assert_eq!(result["chart_data"].as_array().unwrap().len(), 3);
        let total: f64 = result["confidences"]
            .as_object()
            .unwrap()
            .values()
            .map(|v| v.as_f64().unwrap())
            .sum();
        assert!((total - 100.0).abs() < 1e-3);
    }

    let response = app
        .oneshot(get("/api/user-reviews", Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    let reviews = json["resp_data"].as_array().unwrap();
    assert_eq!(reviews.len(), 5);
    assert_eq!(reviews[0]["review_text"], "review number 5 great movie");
    assert_eq!(reviews[4]["review_text"], "review number 1 great movie");
    assert!(reviews[0]["sentiment_results"]["predicted_sentiment"].is_string());
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn admin_access_requires_admin_role() {
    let (app, pool) = db_app().await;

    let (email, cnic) = unique_identity();
    signup(&app, &email, &cnic, "pw").await;
    let response = login(&app, "/admin/login", &email, "pw").await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let (admin_email, admin_cnic) = unique_identity();
    let created = User::create_admin(
        &pool,
        NewUser {
            name: "Admin".into(),
            email: admin_email.clone(),
            cnic: admin_cnic.clone(),
            password: "adminpw".into(),
        },
    )
    .await
    .unwrap();
    assert!(matches!(created, AdminCreation::Created(_)));

    let response = login(&app, "/admin/login", &admin_email, "adminpw").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), Some("/admin/dashboard"));
    let cookie = session_cookie(&response).unwrap();

    let dashboard = app
        .clone()
        .oneshot(get("/admin/dashboard", Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(dashboard.status(), StatusCode::OK);
    assert!(body_string(dashboard).await.contains(&email));

    // 管理员退出后不能再访问后台
    let out = app
        .clone()
        .oneshot(get("/admin/logout", Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(location(&out), Some("/admin/login"));
    let dashboard = app
        .oneshot(get("/admin/dashboard", Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(dashboard.status(), StatusCode::FOUND);

    // 重复创建同一管理员不会报错
    let again = User::create_admin(
        &pool,
        NewUser {
            name: "Admin".into(),
            email: admin_email,
            cnic: admin_cnic,
            password: "adminpw".into(),
        },
    )
    .await
    .unwrap();
    assert!(matches!(again, AdminCreation::AlreadyExists));
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn email_matching_ignores_case() {
    let (app, _pool) = db_app().await;
    let (email, cnic) = unique_identity();
    let (_, other_cnic) = unique_identity();

    assert_eq!(signup(&app, &email, &cnic, "pw").await, StatusCode::SEE_OTHER);
    assert_eq!(
        signup(&app, &email.to_uppercase(), &other_cnic, "pw").await,
        StatusCode::BAD_REQUEST
    );

    let response = login(&app, "/login", &email.to_uppercase(), "pw").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let cookie = session_cookie(&response).unwrap();
    let auth = app.oneshot(get("/api/check-auth", Some(&cookie))).await.unwrap();
    assert_eq!(body_json(auth).await["resp_data"]["user"], email.as_str());
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn admin_login_issues_a_fresh_session_id() {
    let (app, pool) = db_app().await;
    let admin_email = create_admin(&pool, "adminpw").await;

    let response = login(&app, "/login", &admin_email, "adminpw").await;
    let user_cookie = session_cookie(&response).unwrap();

    let response =
        login_with_cookie(&app, "/admin/login", &admin_email, "adminpw", Some(&user_cookie)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let admin_cookie = session_cookie(&response).unwrap();
    assert_ne!(admin_cookie, user_cookie);

    // 旧会话ID失效
    let old = app
        .clone()
        .oneshot(get("/admin/dashboard", Some(&user_cookie)))
        .await
        .unwrap();
    assert_eq!(old.status(), StatusCode::FOUND);
    let old = app.clone().oneshot(get("/review", Some(&user_cookie))).await.unwrap();
    assert_eq!(old.status(), StatusCode::FOUND);

    // 新会话同时保留普通登录和管理员令牌
    let dashboard = app
        .clone()
        .oneshot(get("/admin/dashboard", Some(&admin_cookie)))
        .await
        .unwrap();
    assert_eq!(dashboard.status(), StatusCode::OK);
    let review = app.oneshot(get("/review", Some(&admin_cookie))).await.unwrap();
    assert_eq!(review.status(), StatusCode::OK);
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn demoted_admin_loses_dashboard_access() {
    let (app, pool) = db_app().await;
    let admin_email = create_admin(&pool, "adminpw").await;

    let response = login(&app, "/admin/login", &admin_email, "adminpw").await;
    let cookie = session_cookie(&response).unwrap();

    sqlx::query("UPDATE users SET role = 'user' WHERE email = $1")
        .bind(&admin_email)
        .execute(&pool)
        .await
        .unwrap();

    let dashboard = app
        .oneshot(get("/admin/dashboard", Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(dashboard.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_json(dashboard).await["code"], 1003);
}
