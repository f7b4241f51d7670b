use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use super::handlers::{
    AppState, add_book, book_availability, borrow_book, delete_book, get_book, get_record,
    list_books, list_deleted_books, list_records, list_students, record_login, register_student,
    restore_book, return_book, student_history, student_profile, student_stats, update_book,
};

/// 貸出台帳APIのルーターを作成する
///
/// Borrow ledger:
/// - POST /borrow - 書籍を借りる
/// - GET /borrow - 貸出記録の一覧（status, studentId, bookIdで絞り込み）
/// - GET /borrow/:id - 貸出記録の取得
/// - POST /borrow/:id/return - 返却
///
/// Catalog:
/// - GET, POST /books
/// - GET /books/deleted
/// - GET, PUT, DELETE /books/:id
/// - POST /books/:id/restore
/// - GET /books/:id/availability
///
/// Students:
/// - GET, POST /students
/// - GET /students/:id（プロフィールと統計）
/// - GET /students/:id/history
/// - GET /students/:id/stats
/// - POST /students/:id/logins
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Health check endpoint
        .route("/health", get(health_check))
        // Borrow ledger
        .route("/borrow", post(borrow_book).get(list_records))
        .route("/borrow/:id", get(get_record))
        .route("/borrow/:id/return", post(return_book))
        // Catalog
        .route("/books", get(list_books).post(add_book))
        .route("/books/deleted", get(list_deleted_books))
        .route(
            "/books/:id",
            get(get_book).put(update_book).delete(delete_book),
        )
        .route("/books/:id/restore", post(restore_book))
        .route("/books/:id/availability", get(book_availability))
        // Students
        .route("/students", get(list_students).post(register_student))
        .route("/students/:id", get(student_profile))
        .route("/students/:id/history", get(student_history))
        .route("/students/:id/stats", get(student_stats))
        .route("/students/:id/logins", post(record_login))
        // Add tracing middleware
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        // Add application state
        .with_state(state)
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}
