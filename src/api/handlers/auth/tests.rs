//! Auth handler tests against a mocked upstream.

use crate::api::handlers::test_support::{
    app, can_bind_localhost, get, json_body, post_json, post_json_with_cookie, send, set_cookies,
};
use anyhow::Result;
use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use serde_json::json;
use wiremock::matchers::{
    body_partial_json, body_string_contains, header, method, path, query_param,
};
use wiremock::{Mock, MockServer, ResponseTemplate};

const VERIFY_PATH: &str = "/v1/auth/verify-login-otp";
const SEND_PATH: &str = "/v1/auth/send-login-otp";

/// `name=value` pairs from `Set-Cookie` headers, joined for a `Cookie` header.
fn cookie_header(set_cookies: &[String]) -> String {
    set_cookies
        .iter()
        .filter_map(|cookie| cookie.split(';').next())
        .collect::<Vec<_>>()
        .join("; ")
}

#[tokio::test]
async fn verify_sets_cookies_that_authenticate_later_requests() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return Ok(());
    }
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(VERIFY_PATH))
        .and(body_partial_json(json!({"session_id": "s-1", "otp": "123456"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "tok-abc",
            "user": {"name": "Agent Seven"},
            "message": "Welcome"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/logistics/bulk-update"))
        .and(header("authorization", "Bearer tok-abc"))
        .and(header("x-consumer", "nucleus"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"data": {"ids": ["a", "b"]}})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let app = app(&server.uri());

    let response = send(
        app.clone(),
        post_json(
            "/api/auth/verify-otp",
            &json!({"sessionId": "s-1", "otp": "123456"}),
        ),
    )
    .await;
    let cookies = set_cookies(&response);
    let (status, body) = json_body(response).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], json!(true));
    assert_eq!(body["user"], json!({"name": "Agent Seven"}));
    assert_eq!(body["message"], json!("Welcome"));
    assert_eq!(body["variant"], json!("code=otp,encoding=json,origin=with"));
    assert!(body.get("token").is_none());
    assert_eq!(
        cookies,
        vec![
            "smv_token=tok-abc; Path=/; HttpOnly; SameSite=Lax; Max-Age=3600".to_string(),
            "smv_auth=1; Path=/; HttpOnly; SameSite=Lax; Max-Age=3600".to_string(),
        ]
    );

    let cookie = cookie_header(&cookies);
    let session = Request::get("/api/auth/session")
        .header("cookie", cookie.as_str())
        .body(Body::empty())?;
    let (status, body) = json_body(send(app.clone(), session).await).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"authenticated": true}));

    let response = send(
        app.clone(),
        post_json_with_cookie(
            "/api/smv/logistics/bulk-update",
            &json!({"ids": ["a", "b"], "status": "DISPATCHED"}),
            &cookie,
        ),
    )
    .await;
    let (status, body) = json_body(response).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["updated"], json!(["a", "b"]));

    let response = send(app.clone(), post_json("/api/auth/logout", &json!({}))).await;
    assert_eq!(
        response
            .headers()
            .get("clear-site-data")
            .and_then(|value| value.to_str().ok()),
        Some("\"cookies\", \"storage\"")
    );
    let cleared = set_cookies(&response);
    assert_eq!(cleared.len(), 2);
    assert!(cleared.iter().all(|cookie| cookie.contains("Max-Age=0")));
    assert_eq!(cookie_header(&cleared), "smv_token=; smv_auth=");

    // The browser now sends the cleared cookies.
    let session = Request::get("/api/auth/session")
        .header("cookie", cookie_header(&cleared))
        .body(Body::empty())?;
    let response = send(app.clone(), session).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = send(
        app,
        post_json_with_cookie(
            "/api/smv/logistics/bulk-update",
            &json!({"ids": ["a"], "status": "DISPATCHED"}),
            &cookie_header(&cleared),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn verify_falls_back_to_form_encoding_on_415() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return Ok(());
    }
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(VERIFY_PATH))
        .and(header("content-type", "application/x-www-form-urlencoded"))
        .and(body_string_contains("otp=123456"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": "tok-form"})))
        .with_priority(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(VERIFY_PATH))
        .respond_with(ResponseTemplate::new(415))
        .expect(2)
        .mount(&server)
        .await;

    let response = send(
        app(&server.uri()),
        post_json(
            "/api/auth/verify-otp",
            &json!({"session_id": "s-1", "otp": 123_456}),
        ),
    )
    .await;
    let cookies = set_cookies(&response);
    let (status, body) = json_body(response).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["variant"], json!("code=otp,encoding=form,origin=with"));
    assert!(cookies
        .first()
        .is_some_and(|cookie| cookie.starts_with("smv_token=tok-form;")));
    Ok(())
}

#[tokio::test]
async fn verify_without_token_sets_no_cookie() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return Ok(());
    }
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(VERIFY_PATH))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"data": {"status": "OTP verified"}})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let response = send(
        app(&server.uri()),
        post_json(
            "/api/auth/verify-otp",
            &json!({"sessionId": "s-1", "otp": "123456"}),
        ),
    )
    .await;
    assert!(set_cookies(&response).is_empty());
    let (status, body) = json_body(response).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(
        body["error"],
        json!("verify-otp failed: upstream returned no session token")
    );
    Ok(())
}

#[tokio::test]
async fn verify_rejects_missing_fields_without_calling_upstream() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return Ok(());
    }
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let response = send(
        app(&server.uri()),
        post_json("/api/auth/verify-otp", &json!({"sessionId": "s-1", "otp": "  "})),
    )
    .await;
    let (status, body) = json_body(response).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body,
        json!({"error": "sessionId/session_id and otp are required"})
    );
    Ok(())
}

#[tokio::test]
async fn send_otp_classifies_email_identifier() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return Ok(());
    }
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(SEND_PATH))
        .and(body_partial_json(json!({
            "consumer": "nucleus",
            "method": "EMAIL",
            "email": "alice@example.com",
            "phone": "",
            "retry": true
        })))
        .and(header("origin", "https://console.example.com"))
        .and(header("referer", "https://console.example.com/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"session_id": "s-9", "status": "OTP sent to email"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let request = Request::post("/api/auth/send-otp")
        .header("content-type", "application/json")
        .header("origin", "https://console.example.com")
        .body(Body::from(json!({"identifier": "alice@example.com"}).to_string()))?;
    let (status, body) = json_body(send(app(&server.uri()), request).await).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["sessionId"], json!("s-9"));
    assert_eq!(body["message"], json!("OTP sent to email"));
    assert_eq!(body["upstream"]["data"]["session_id"], json!("s-9"));
    Ok(())
}

#[tokio::test]
async fn send_otp_classifies_phone_identifier() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return Ok(());
    }
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(SEND_PATH))
        .and(body_partial_json(json!({
            "method": "PHONE",
            "email": "",
            "phone": "+14155550123"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"sessionId": "s-3"})))
        .expect(1)
        .mount(&server)
        .await;

    let response = send(
        app(&server.uri()),
        post_json("/api/auth/send-otp", &json!({"identifier": "+14155550123"})),
    )
    .await;
    let (status, body) = json_body(response).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["sessionId"], json!("s-3"));
    assert_eq!(body["message"], json!("OTP sent"));
    Ok(())
}

#[tokio::test]
async fn send_otp_mirrors_terminal_rejection() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return Ok(());
    }
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(SEND_PATH))
        .respond_with(
            ResponseTemplate::new(429).set_body_json(json!({"message": "Too many requests"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let response = send(
        app(&server.uri()),
        post_json("/api/auth/send-otp", &json!({"identifier": "alice@example.com"})),
    )
    .await;
    let (status, body) = json_body(response).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["error"], json!("send-otp failed"));
    assert_eq!(body["upstreamStatus"], json!(429));
    assert_eq!(body["attempts"], json!(["origin=with"]));
    Ok(())
}

#[tokio::test]
async fn verify_wrong_code_is_sent_once_and_mirrored() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return Ok(());
    }
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(VERIFY_PATH))
        .respond_with(
            ResponseTemplate::new(400)
                .set_body_json(json!({"message": "Invalid OTP: 6 digit code expected"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let response = send(
        app(&server.uri()),
        post_json(
            "/api/auth/verify-otp",
            &json!({"sessionId": "s-1", "otp": "000000"}),
        ),
    )
    .await;
    let (status, body) = json_body(response).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["upstreamStatus"], json!(400));
    assert_eq!(body["attempts"], json!(["code=otp,encoding=json,origin=with"]));
    Ok(())
}

#[tokio::test]
async fn malformed_json_body_is_a_json_bad_request() -> Result<()> {
    let request = Request::post("/api/auth/send-otp")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))?;
    let response = send(app("http://127.0.0.1:9"), request).await;
    let content_type = response
        .headers()
        .get("content-type")
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    let (status, body) = json_body(response).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(content_type.as_deref(), Some("application/json"));
    assert_eq!(body, json!({"error": "request body must be a JSON object"}));
    Ok(())
}

#[tokio::test]
async fn send_otp_requires_identifier() -> Result<()> {
    let response = send(
        app("http://127.0.0.1:9"),
        post_json("/api/auth/send-otp", &json!({"identifier": "   "})),
    )
    .await;
    let (status, body) = json_body(response).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": "identifier required"}));
    Ok(())
}

#[tokio::test]
async fn check_user_sends_query_for_guessed_method() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return Ok(());
    }
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/auth/check-user"))
        .and(query_param("method", "PHONE"))
        .and(query_param("phone", "+14155550123"))
        .and(query_param("email", ""))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"exists": true})))
        .expect(1)
        .mount(&server)
        .await;

    let response = send(
        app(&server.uri()),
        get("/api/auth/check-user?identifier=%2B14155550123"),
    )
    .await;
    let (status, body) = json_body(response).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({"ok": true, "data": {"exists": true}, "message": "User exists"})
    );
    Ok(())
}

#[tokio::test]
async fn check_user_relays_unknown_user() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return Ok(());
    }
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/auth/check-user"))
        .and(query_param("method", "EMAIL"))
        .and(query_param("email", "bob@example.com"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"message": "not found"})))
        .expect(1)
        .mount(&server)
        .await;

    let response = send(
        app(&server.uri()),
        get("/api/auth/check-user?identifier=bob%40example.com&method=EMAIL"),
    )
    .await;
    let (status, body) = json_body(response).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(
        body,
        json!({"error": "check-user failed", "data": {"message": "not found"}})
    );
    Ok(())
}

#[tokio::test]
async fn check_user_requires_identifier() -> Result<()> {
    let response = send(app("http://127.0.0.1:9"), get("/api/auth/check-user")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn session_without_cookie_is_no_content() -> Result<()> {
    let response = send(app("http://127.0.0.1:9"), get("/api/auth/session")).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    Ok(())
}
