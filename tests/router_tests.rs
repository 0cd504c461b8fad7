mod common;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use common::{TestContext, PASSWORD};
use school_backend::model::user::Role;
use serde_json::{json, Value};
use tower::ServiceExt;

async fn send(router: &Router, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

fn multipart_body(boundary: &str, school_id: &str, csv: &str) -> String {
    format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"schoolId\"\r\n\r\n{school}\r\n\
         --{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"students.csv\"\r\n\
         Content-Type: text/csv\r\n\r\n{csv}\r\n--{b}--\r\n",
        b = boundary,
        school = school_id,
        csv = csv
    )
}

#[tokio::test]
async fn test_health() {
    let ctx = TestContext::new();
    let response = ctx
        .router
        .clone()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"OK");
}

#[tokio::test]
async fn test_protected_routes_require_token() {
    let ctx = TestContext::new();

    let (status, body) = send(&ctx.router, Method::GET, "/schools", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Unauthorized");
    assert_eq!(body["message"], "Missing authorization header");

    let (status, _) = send(&ctx.router, Method::GET, "/students", Some("garbage"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let request = Request::builder()
        .uri("/schools")
        .header(header::AUTHORIZATION, "Basic dXNlcjpwYXNz")
        .body(Body::empty())
        .unwrap();
    let response = ctx.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["message"], "Invalid authorization header");
}

#[tokio::test]
async fn test_login_then_me() {
    let ctx = TestContext::new();
    let admin = ctx.user(Role::Admin, None).await;

    let (status, body) = send(
        &ctx.router,
        Method::POST,
        "/auth/login",
        None,
        Some(json!({ "email": admin.email, "password": PASSWORD })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Login successful");
    let token = body["data"]["tokens"]["accessToken"].as_str().unwrap().to_string();
    assert!(body["data"]["user"].get("passwordHash").is_none());

    let (status, body) = send(&ctx.router, Method::GET, "/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["email"], admin.email.as_str());
    assert_eq!(body["data"]["role"], "admin");
}

#[tokio::test]
async fn test_login_failures() {
    let ctx = TestContext::new();
    let admin = ctx.user(Role::Admin, None).await;

    let (status, body) = send(
        &ctx.router,
        Method::POST,
        "/auth/login",
        None,
        Some(json!({ "email": admin.email, "password": "Wrong0ne!" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid email or password");

    let (status, body) = send(
        &ctx.router,
        Method::POST,
        "/auth/login",
        None,
        Some(json!({ "email": "not-an-email", "password": PASSWORD })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Validation");
}

#[tokio::test]
async fn test_role_guard_blocks_teacher_writes() {
    let ctx = TestContext::new();
    let admin = ctx.user(Role::Admin, None).await;
    let school = ctx.school(&admin, "Hillside").await;
    let teacher = ctx.user(Role::Teacher, school.id).await;
    let token = ctx.token(&teacher);

    let (status, body) = send(
        &ctx.router,
        Method::POST,
        "/classes",
        Some(&token),
        Some(json!({ "name": "Grade 5", "schoolId": school.id.unwrap().to_hex() })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "You do not have permission to perform this action");

    let (status, _) = send(&ctx.router, Method::GET, "/users", Some(&token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(&ctx.router, Method::GET, "/classes", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total"], 0);
}

#[tokio::test]
async fn test_school_crud_over_http() {
    let ctx = TestContext::new();
    let admin = ctx.user(Role::Admin, None).await;
    let token = ctx.token(&admin);

    let (status, body) = send(
        &ctx.router,
        Method::POST,
        "/schools",
        Some(&token),
        Some(json!({ "name": "Hillside", "principalName": "Dr. Okeke", "address": "12 Palm Road" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "School created");
    assert_eq!(body["data"]["totalStudents"], 0);
    let id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = send(&ctx.router, Method::GET, "/schools?page=1&limit=5", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total"], 1);
    assert_eq!(body["data"]["limit"], 5);
    assert_eq!(body["data"]["totalPages"], 1);

    let (status, body) = send(
        &ctx.router,
        Method::PUT,
        &format!("/schools/{}", id),
        Some(&token),
        Some(json!({ "principalName": "Mrs. Adeyemi" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["principalName"], "Mrs. Adeyemi");

    let (status, body) = send(&ctx.router, Method::DELETE, &format!("/schools/{}", id), Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "School deleted");

    let (status, body) = send(&ctx.router, Method::GET, &format!("/schools/{}", id), Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], Value::Null);
    assert_eq!(body["error"], "NotFound");
}

#[tokio::test]
async fn test_bad_input_maps_to_400() {
    let ctx = TestContext::new();
    let admin = ctx.user(Role::Admin, None).await;
    let token = ctx.token(&admin);

    let (status, body) = send(&ctx.router, Method::GET, "/schools/not-an-id", Some(&token), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid school id");

    let (status, body) = send(
        &ctx.router,
        Method::POST,
        "/schools",
        Some(&token),
        Some(json!({ "name": "H", "principalName": "Dr. Okeke", "address": "12 Palm Road" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Validation");
    assert!(body["details"].as_str().unwrap().contains("name"));
}

#[tokio::test]
async fn test_duplicate_maps_to_409() {
    let ctx = TestContext::new();
    let admin = ctx.user(Role::Admin, None).await;
    let token = ctx.token(&admin);
    let school = json!({ "name": "Hillside", "principalName": "Dr. Okeke", "address": "12 Palm Road" });

    let (status, _) = send(&ctx.router, Method::POST, "/schools", Some(&token), Some(school.clone())).await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, body) = send(&ctx.router, Method::POST, "/schools", Some(&token), Some(school)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "Conflict");
}

#[tokio::test]
async fn test_csv_import_over_multipart() {
    let ctx = TestContext::new();
    let admin = ctx.user(Role::Admin, None).await;
    let school = ctx.school(&admin, "Hillside").await;
    let token = ctx.token(&admin);
    let boundary = "X-SCHOOL-BOUNDARY";
    let csv = "firstName,lastName,admissionNumber\nAda,Obi,A-1\nChidi,,A-2\n";

    let request = Request::builder()
        .method(Method::POST)
        .uri("/students/import")
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={}", boundary))
        .body(Body::from(multipart_body(boundary, &school.id.unwrap().to_hex(), csv)))
        .unwrap();
    let response = ctx.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["message"], "Imported 1 of 2 rows");
    assert_eq!(body["data"]["imported"], 1);
    assert_eq!(body["data"]["failed"], 1);
    assert_eq!(body["data"]["errors"][0]["row"], 3);
    assert_eq!(body["data"]["errors"][0]["message"], "lastName is required");
}

#[tokio::test]
async fn test_csv_import_requires_file() {
    let ctx = TestContext::new();
    let admin = ctx.user(Role::Admin, None).await;
    let token = ctx.token(&admin);
    let boundary = "X-SCHOOL-BOUNDARY";
    let body = format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"schoolId\"\r\n\r\n{id}\r\n--{b}--\r\n",
        b = boundary,
        id = bson::oid::ObjectId::new().to_hex()
    );

    let request = Request::builder()
        .method(Method::POST)
        .uri("/students/import")
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={}", boundary))
        .body(Body::from(body))
        .unwrap();
    let response = ctx.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

async fn send_raw(router: &Router, method: Method, uri: &str, token: &str, content_type: &str, body: String) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .header(header::CONTENT_TYPE, content_type)
        .body(Body::from(body))
        .unwrap();
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

#[tokio::test]
async fn test_unreadable_requests_use_error_body() {
    let ctx = TestContext::new();
    let admin = ctx.user(Role::Admin, None).await;
    let token = ctx.token(&admin);

    let (status, body) = send(
        &ctx.router,
        Method::POST,
        "/schools",
        Some(&token),
        Some(json!({ "principalName": "Dr. Okeke", "address": "12 Palm Road" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Validation");
    assert!(body["details"].as_str().unwrap().contains("name"));

    let (status, body) =
        send_raw(&ctx.router, Method::POST, "/schools", &token, "application/json", "{\"name\": ".to_string()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "BadRequest");
    assert_eq!(body["message"], "Malformed JSON body");

    let (status, body) = send(&ctx.router, Method::GET, "/schools?page=abc", Some(&token), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "BadRequest");
    assert_eq!(body["message"], "Invalid query string");
}

#[tokio::test]
async fn test_csv_import_over_size_cap() {
    let ctx = TestContext::new();
    let admin = ctx.user(Role::Admin, None).await;
    let school = ctx.school(&admin, "Hillside").await;
    let token = ctx.token(&admin);
    let boundary = "X-SCHOOL-BOUNDARY";

    let mut csv = String::from("firstName,lastName,admissionNumber\n");
    for i in 0..4000 {
        csv.push_str(&format!("Student{},Surname{},ADM-{:06}\n", i, i, i));
    }
    assert!(csv.len() > 64 * 1024);

    let (status, body) = send_raw(
        &ctx.router,
        Method::POST,
        "/students/import",
        &token,
        &format!("multipart/form-data; boundary={}", boundary),
        multipart_body(boundary, &school.id.unwrap().to_hex(), &csv),
    )
    .await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body["error"], "PayloadTooLarge");
    assert_eq!(ctx.students.0.lock().unwrap().len(), 0);
}
