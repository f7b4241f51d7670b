use axum::body::Body;
use axum::http::{Request, StatusCode};
use granthalaya_ledger::api::handlers::AppState;
use granthalaya_ledger::api::router::create_router;
use granthalaya_ledger::api::types::*;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;

mod common;

// ============================================================================
// E2Eテスト用のヘルパー関数
// ============================================================================

/// メモリ実装と実際のAPIルーターでアプリケーションを組み立てる
fn setup_app() -> axum::Router {
    let app_state = Arc::new(AppState {
        service_deps: common::memory_deps(),
    });
    create_router(app_state)
}

async fn send(
    app: &axum::Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Vec<u8>) {
    let request = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => request
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_string(&body).unwrap())),
        None => request.body(Body::empty()),
    }
    .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();

    (status, body.to_vec())
}

fn parse<T: DeserializeOwned>(body: &[u8]) -> T {
    serde_json::from_slice(body).unwrap()
}

/// 書籍と学生を登録し、書籍IDを返す
async fn seed(app: &axum::Router) -> i64 {
    let (status, body) = send(
        app,
        "POST",
        "/books",
        Some(json!({
            "title": "Introduction to Algorithms",
            "author": "Cormen",
            "department": "Computer Science",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let book: BookResponse = parse(&body);

    for (id, email) in [("S1", "s1@college.example"), ("S2", "s2@college.example")] {
        let (status, _) = send(
            app,
            "POST",
            "/students",
            Some(json!({
                "studentId": id,
                "name": format!("Student {}", id),
                "email": email,
                "department": "Computer Science",
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    book.book_id
}

// ============================================================================
// E2Eテスト: 正常系フロー
// ============================================================================

#[tokio::test]
async fn test_e2e_health_check() {
    let app = setup_app();
    let (status, body) = send(&app, "GET", "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"OK");
}

#[tokio::test]
async fn test_e2e_full_borrow_flow() {
    let app = setup_app();
    let book_id = seed(&app).await;

    // Step 1: 貸出（POST /borrow）
    let (status, body) = send(
        &app,
        "POST",
        "/borrow",
        Some(json!({"bookId": book_id, "studentId": "S1"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let created: BorrowCreatedResponse = parse(&body);
    assert!(created.due_date > created.borrowed_at);

    // Step 2: 貸出不可になっている
    let (status, body) = send(&app, "GET", &format!("/books/{}/availability", book_id), None).await;
    assert_eq!(status, StatusCode::OK);
    let availability: AvailabilityResponse = parse(&body);
    assert!(!availability.available);
    assert_eq!(
        availability.borrower.map(|record| record.record_id),
        Some(created.record_id)
    );

    // Step 3: 貸出記録の取得（GET /borrow/:id）
    let (status, body) = send(&app, "GET", &format!("/borrow/{}", created.record_id), None).await;
    assert_eq!(status, StatusCode::OK);
    let record: BorrowRecordResponse = parse(&body);
    assert_eq!(record.status, "active");
    assert_eq!(record.book_title, "Introduction to Algorithms");
    assert_eq!(record.student_id, "S1");
    assert_eq!(record.borrowed_at, created.borrowed_at);
    assert_eq!(record.due_date, created.due_date);
    assert!(!record.overdue);
    // 夏時間の切り替えをまたぐと1時間ずれることがある
    assert!(matches!(record.days_remaining, Some(15) | Some(16)));

    // Step 4: 返却（POST /borrow/:id/return）
    let (status, body) = send(
        &app,
        "POST",
        &format!("/borrow/{}/return", created.record_id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let returned: ReturnResponse = parse(&body);
    assert!(returned.ok);
    assert_eq!(returned.record_id, created.record_id);

    // Step 5: 再び貸出可能
    let (_, body) = send(&app, "GET", &format!("/books/{}/availability", book_id), None).await;
    let availability: AvailabilityResponse = parse(&body);
    assert!(availability.available);

    // Step 6: 履歴と統計
    let (status, body) = send(&app, "GET", "/students/S1/history", None).await;
    assert_eq!(status, StatusCode::OK);
    let history: Vec<BorrowRecordResponse> = parse(&body);
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].status, "returned");
    assert!(history[0].returned_at.is_some());
    assert_eq!(history[0].days_remaining, None);

    let (status, body) = send(&app, "GET", "/students/S1/stats", None).await;
    assert_eq!(status, StatusCode::OK);
    let stats: Value = parse(&body);
    assert_eq!(
        stats,
        json!({"totalBorrowed": 1, "currentlyHolding": 0, "returned": 1, "overdue": 0})
    );
}

#[tokio::test]
async fn test_e2e_list_records_by_status() {
    let app = setup_app();
    let book_id = seed(&app).await;

    send(
        &app,
        "POST",
        "/borrow",
        Some(json!({"bookId": book_id, "studentId": "S2"})),
    )
    .await;

    let (status, body) = send(&app, "GET", "/borrow?status=active&studentId=S2", None).await;
    assert_eq!(status, StatusCode::OK);
    let active: Vec<BorrowRecordResponse> = parse(&body);
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].book_id, book_id);

    let (_, body) = send(&app, "GET", "/borrow?status=returned", None).await;
    let returned: Vec<BorrowRecordResponse> = parse(&body);
    assert!(returned.is_empty());

    let (_, body) = send(&app, "GET", "/borrow?status=overdue", None).await;
    let overdue: Vec<BorrowRecordResponse> = parse(&body);
    assert!(overdue.is_empty());

    let (status, body) = send(&app, "GET", "/borrow?status=lost", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let error: ErrorResponse = parse(&body);
    assert_eq!(error.error, "BAD_REQUEST");
}

#[tokio::test]
async fn test_e2e_student_profile_and_login() {
    let app = setup_app();
    seed(&app).await;

    let (status, body) = send(&app, "POST", "/students/S1/logins", None).await;
    assert_eq!(status, StatusCode::OK);
    let student: StudentResponse = parse(&body);
    assert!(student.last_login.is_some());
    assert_eq!(student.login_history.len(), 1);

    let (status, body) = send(&app, "GET", "/students/S1", None).await;
    assert_eq!(status, StatusCode::OK);
    let profile: Value = parse(&body);
    assert_eq!(profile["studentId"], "S1");
    assert_eq!(profile["email"], "s1@college.example");
    assert_eq!(profile["stats"]["totalBorrowed"], 0);

    let (_, body) = send(&app, "GET", "/students", None).await;
    let all: Vec<StudentResponse> = parse(&body);
    assert_eq!(all.len(), 2);
}

#[tokio::test]
async fn test_e2e_catalog_delete_and_restore() {
    let app = setup_app();
    let book_id = seed(&app).await;

    let (status, body) = send(
        &app,
        "PUT",
        &format!("/books/{}", book_id),
        Some(json!({
            "title": "Algorithms, 4th edition",
            "author": "Cormen",
            "department": "Computer Science",
            "coverImage": "https://covers.example/clrs.png",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let book: BookResponse = parse(&body);
    assert_eq!(book.title, "Algorithms, 4th edition");
    assert_eq!(book.cover_image.as_deref(), Some("https://covers.example/clrs.png"));

    let (status, _) = send(&app, "DELETE", &format!("/books/{}", book_id), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, "GET", &format!("/books/{}", book_id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, body) = send(&app, "GET", "/books/deleted", None).await;
    let deleted: Vec<BookResponse> = parse(&body);
    assert_eq!(deleted.len(), 1);

    let (status, _) = send(&app, "POST", &format!("/books/{}/restore", book_id), None).await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = send(&app, "GET", "/books?department=Computer%20Science", None).await;
    let books: Vec<BookResponse> = parse(&body);
    assert_eq!(books.len(), 1);
}

// ============================================================================
// E2Eテスト: エラーケース
// ============================================================================

#[tokio::test]
async fn test_e2e_double_borrow_conflicts() {
    let app = setup_app();
    let book_id = seed(&app).await;

    let (status, _) = send(
        &app,
        "POST",
        "/borrow",
        Some(json!({"bookId": book_id, "studentId": "S1"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(
        &app,
        "POST",
        "/borrow",
        Some(json!({"bookId": book_id, "studentId": "S2"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    let error: ErrorResponse = parse(&body);
    assert_eq!(error.error, "BOOK_ALREADY_BORROWED");

    // 貸出中の書籍は削除できない
    let (status, body) = send(&app, "DELETE", &format!("/books/{}", book_id), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    let error: ErrorResponse = parse(&body);
    assert_eq!(error.error, "BOOK_CURRENTLY_BORROWED");
}

#[tokio::test]
async fn test_e2e_double_return_conflicts() {
    let app = setup_app();
    let book_id = seed(&app).await;

    let (_, body) = send(
        &app,
        "POST",
        "/borrow",
        Some(json!({"bookId": book_id, "studentId": "S1"})),
    )
    .await;
    let created: BorrowCreatedResponse = parse(&body);
    let uri = format!("/borrow/{}/return", created.record_id);

    let (status, _) = send(&app, "POST", &uri, None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, "POST", &uri, None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    let error: ErrorResponse = parse(&body);
    assert_eq!(error.error, "ALREADY_RETURNED");
}

#[tokio::test]
async fn test_e2e_not_found_errors() {
    let app = setup_app();
    seed(&app).await;

    let (status, body) = send(
        &app,
        "POST",
        "/borrow",
        Some(json!({"bookId": 999, "studentId": "S1"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let error: ErrorResponse = parse(&body);
    assert_eq!(error.error, "BOOK_NOT_FOUND");

    let (status, _) = send(
        &app,
        "GET",
        "/borrow/00000000-0000-4000-8000-000000000000",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, "GET", "/students/NOBODY", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    for route in ["/students/NOBODY/history", "/students/NOBODY/stats"] {
        let (status, body) = send(&app, "GET", route, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{}", route);
        let error: ErrorResponse = parse(&body);
        assert_eq!(error.error, "STUDENT_NOT_FOUND");
    }
}

#[tokio::test]
async fn test_e2e_validation_errors() {
    let app = setup_app();
    let book_id = seed(&app).await;

    // studentIdが欠けている
    let (status, body) = send(&app, "POST", "/borrow", Some(json!({"bookId": book_id}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let error: ErrorResponse = parse(&body);
    assert_eq!(error.error, "VALIDATION_ERROR");

    // JSONとして解析できない
    let request = Request::builder()
        .method("POST")
        .uri("/borrow")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // 形式不正なID
    let (status, _) = send(&app, "GET", "/borrow/not-a-uuid", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, "GET", "/books/abc", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // 重複登録
    let (status, body) = send(
        &app,
        "POST",
        "/students",
        Some(json!({
            "studentId": "S3",
            "name": "Another",
            "email": "S1@college.example",
            "department": "Physics",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    let error: ErrorResponse = parse(&body);
    assert_eq!(error.error, "EMAIL_TAKEN");
}
