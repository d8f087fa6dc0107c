use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use tower::ServiceExt;

use vetrina_core::error::ExtractError;
use vetrina_core::testutil::MockPage;

use crate::integration::common::{app_with_error, app_with_page};

fn extract_request(url: &str) -> Request<Body> {
    let body = serde_json::json!({ "url": url });
    Request::post("/v1/extract")
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(&body).unwrap()))
        .unwrap()
}

#[tokio::test]
async fn health_returns_200() {
    let app = app_with_page(MockPage::new());

    let response = app
        .router
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["renderer"], "mock");
}

#[tokio::test]
async fn extract_returns_image_and_matched_rule() {
    let page = MockPage::new().with_attr(r#"meta[property="og:image"]"#, "content", "/img/42.jpg");
    let app = app_with_page(page);

    let response = app
        .router
        .oneshot(extract_request("https://shop.example/p/42"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["image"], "https://shop.example/img/42.jpg");
    assert_eq!(json["matched_rule"], "og:image");
}

#[tokio::test]
async fn malformed_url_returns_400_without_rendering() {
    let app = app_with_page(MockPage::new());

    let response = app
        .router
        .clone()
        .oneshot(extract_request("not a url"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["error_kind"], "invalid_input");

    // The request must be rejected before any fetch happens.
    assert_eq!(app.renderer.render_calls(), 0);
}

#[tokio::test]
async fn missing_url_field_returns_400_envelope() {
    let app = app_with_page(MockPage::new());

    let response = app
        .router
        .oneshot(
            Request::post("/v1/extract")
                .header("content-type", "application/json")
                .body(Body::from("{}"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["error_kind"], "invalid_input");
    assert!(json["tried_rules"].as_array().unwrap().is_empty());
    assert_eq!(app.renderer.render_calls(), 0);
}

#[tokio::test]
async fn non_json_body_returns_400_envelope() {
    let app = app_with_page(MockPage::new());

    let response = app
        .router
        .oneshot(
            Request::post("/v1/extract")
                .header("content-type", "application/json")
                .body(Body::from("url=https://shop.example"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["error_kind"], "invalid_input");
}

#[tokio::test]
async fn unsupported_scheme_returns_400() {
    let app = app_with_page(MockPage::new());

    let response = app
        .router
        .oneshot(extract_request("ftp://shop.example/p/42"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn no_match_returns_404_with_tried_rules() {
    // Empty page: every rule in the generic cascade comes up empty.
    let app = app_with_page(MockPage::new());

    let response = app
        .router
        .oneshot(extract_request("https://shop.example/p/42"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["error_kind"], "no_match_found");

    let tried = json["tried_rules"].as_array().unwrap();
    assert_eq!(tried.len(), 6);
    assert_eq!(tried[0]["rule"], "og:image");
    assert!(tried[0]["reason"].as_str().is_some());
}

#[tokio::test]
async fn renderer_failure_returns_500() {
    let app = app_with_error(ExtractError::Navigation("HTTP 503 for upstream".into()));

    let response = app
        .router
        .oneshot(extract_request("https://shop.example/p/42"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["error_kind"], "navigation_error");
    assert!(json["tried_rules"].as_array().unwrap().is_empty());
}
