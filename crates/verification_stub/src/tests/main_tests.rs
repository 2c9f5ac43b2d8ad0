use super::*;
use axum::{
    body::{self, Body},
    http::Request,
    response::Response,
};
use tower::ServiceExt;

const BOUNDARY: &str = "kyc-test-boundary";

fn test_app(max_upload_bytes: usize) -> Router {
    let api = ApiContext {
        store: KycStore::default(),
        sessions: SessionConfig {
            secret: "devsecret".into(),
            ttl_seconds: 60,
        },
    };
    build_router(Arc::new(AppState { api }), max_upload_bytes)
}

async fn json_body<T: serde::de::DeserializeOwned>(response: Response) -> T {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    serde_json::from_slice(&bytes).expect("json")
}

async fn sign_in(app: &Router, username: &str) -> SessionResponse {
    let request = Request::post("/auth/login")
        .header("content-type", "application/json")
        .body(Body::from(
            serde_json::json!({ "username": username }).to_string(),
        ))
        .expect("request");
    let response = app.clone().oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    json_body(response).await
}

fn multipart_body(fields: &[(&str, &str)], files: &[(&str, &str, &str, &[u8])]) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    for (name, filename, mime, bytes) in files {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\nContent-Type: {mime}\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

const FIELDS: [(&str, &str); 10] = [
    ("firstName", "Ada"),
    ("lastName", "Lovelace"),
    ("dateOfBirth", "1990-04-12"),
    ("nationality", "GB"),
    ("phoneNumber", "+12025551234"),
    ("address.street", "1 Main St"),
    ("address.city", "Springfield"),
    ("address.state", "IL"),
    ("address.postalCode", "62701"),
    ("address.country", "US"),
];

fn submit_request(token: &str, body: Vec<u8>) -> Request<Body> {
    Request::post("/kyc/submit")
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .header(header::CONTENT_LENGTH, body.len())
        .body(Body::from(body))
        .expect("request")
}

fn status_request(token: &str) -> Request<Body> {
    Request::get("/kyc/status")
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .expect("request")
}

#[tokio::test]
async fn healthz_reports_ok() {
    let app = test_app(1024);
    let request = Request::get("/healthz")
        .body(Body::empty())
        .expect("request");
    let response = app.oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    let body = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    assert_eq!(body.as_ref(), b"ok");
}

#[tokio::test]
async fn status_requires_a_valid_token() {
    let app = test_app(1024);
    let request = Request::get("/kyc/status")
        .body(Body::empty())
        .expect("request");
    let response = app.clone().oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .oneshot(status_request("forged"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let error: ApiError = json_body(response).await;
    assert_eq!(error.code, Some(ErrorCode::Unauthorized));
}

#[tokio::test]
async fn login_status_and_refresh_routes_work() {
    let app = test_app(1024);
    let session = sign_in(&app, "ada").await;

    let response = app
        .clone()
        .oneshot(status_request(&session.token))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let status: StatusResponse = json_body(response).await;
    assert_eq!(status.status, shared::domain::VerificationStatus::NotStarted);

    let request = Request::post("/auth/refresh")
        .header(header::AUTHORIZATION, format!("Bearer {}", session.token))
        .body(Body::empty())
        .expect("request");
    let response = app.oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let refreshed: SessionResponse = json_body(response).await;
    assert_eq!(refreshed.user_id, session.user_id);
}

#[tokio::test]
async fn complete_submission_is_accepted_once() {
    let app = test_app(1024 * 1024);
    let session = sign_in(&app, "ada").await;
    let files: [(&str, &str, &str, &[u8]); 2] = [
        ("passport", "passport.jpg", "image/jpeg", b"jpeg-bytes"),
        ("proof_of_address", "bill.pdf", "application/pdf", b"%PDF-1.4"),
    ];

    let response = app
        .clone()
        .oneshot(submit_request(&session.token, multipart_body(&FIELDS, &files)))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let receipt: SubmissionReceipt = json_body(response).await;
    assert_eq!(receipt.submission.documents_uploaded, 2);

    let response = app
        .clone()
        .oneshot(status_request(&session.token))
        .await
        .expect("response");
    let status: StatusResponse = json_body(response).await;
    assert_eq!(status.status, shared::domain::VerificationStatus::Pending);

    let response = app
        .oneshot(submit_request(&session.token, multipart_body(&FIELDS, &files)))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn submission_without_proof_of_address_is_a_validation_error() {
    let app = test_app(1024 * 1024);
    let session = sign_in(&app, "ada").await;
    let files: [(&str, &str, &str, &[u8]); 1] =
        [("passport", "passport.jpg", "image/jpeg", b"jpeg-bytes")];

    let response = app
        .oneshot(submit_request(&session.token, multipart_body(&FIELDS, &files)))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let error: ApiError = json_body(response).await;
    assert_eq!(error.code, Some(ErrorCode::Validation));
    assert!(error.message.contains("proof of address"));
}

#[tokio::test]
async fn unsupported_document_type_is_refused() {
    let app = test_app(1024 * 1024);
    let session = sign_in(&app, "ada").await;
    let files: [(&str, &str, &str, &[u8]); 1] =
        [("passport", "passport.txt", "text/plain", b"hello")];

    let response = app
        .oneshot(submit_request(&session.token, multipart_body(&FIELDS, &files)))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn oversized_upload_is_refused() {
    let app = test_app(256);
    let session = sign_in(&app, "ada").await;
    let big = vec![0u8; 4096];
    let files: [(&str, &str, &str, &[u8]); 1] =
        [("passport", "passport.jpg", "image/jpeg", &big)];

    let response = app
        .oneshot(submit_request(&session.token, multipart_body(&FIELDS, &files)))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}
