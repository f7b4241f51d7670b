use crate::application::{ServiceDependencies, catalog, ledger, students};
use crate::domain::{
    BookId, BorrowRecord, Department, RecordId, StudentId,
    commands::{AddBook, RecordLogin, ReturnBook},
};
use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
};
use chrono::{DateTime, SubsecRound, Utc};
use std::sync::Arc;
use uuid::Uuid;

use super::{
    error::ApiError,
    types::{
        AvailabilityResponse, BookRequest, BookResponse, BorrowCreatedResponse,
        BorrowRecordResponse, BorrowRequest, ListBooksQuery, ListRecordsQuery, ProfileResponse,
        RegisterStudentRequest, ReturnResponse, StatsResponse, StudentResponse,
    },
};

// ============================================================================
// State
// ============================================================================

/// ハンドラー間で共有されるアプリケーション状態
#[derive(Clone)]
pub struct AppState {
    pub service_deps: ServiceDependencies,
}

/// 現在時刻（マイクロ秒に切り捨て）
///
/// PostgreSQLのTIMESTAMPTZに保存した値と一致させる。
fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

// ============================================================================
// Path parameters
// ============================================================================

fn parse_record_id(raw: &str) -> Result<RecordId, ApiError> {
    Uuid::parse_str(raw)
        .map(RecordId::from_uuid)
        .map_err(|_| ApiError::BadRequest(format!("Invalid record id: {}", raw)))
}

fn parse_book_id(raw: &str) -> Result<BookId, ApiError> {
    raw.parse::<i64>()
        .map(BookId::new)
        .map_err(|_| ApiError::BadRequest(format!("Invalid book id: {}", raw)))
}

fn parse_student_id(raw: String) -> Result<StudentId, ApiError> {
    Ok(StudentId::parse(raw)?)
}

// ============================================================================
// Borrow ledger
// ============================================================================

/// POST /borrow - 書籍を借りる
///
/// 強制されるビジネスルール:
/// - 書籍が存在し、論理削除されていないこと
/// - 書籍が貸出中でないこと（書籍1冊につき貸出中の記録は高々1件）
/// - 学生が登録されていること
pub async fn borrow_book(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<BorrowRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<BorrowCreatedResponse>), ApiError> {
    let Json(req) = payload?;
    let cmd = req.into_command(now())?;

    let record = ledger::borrow_book(&state.service_deps, cmd).await?;

    let response = BorrowCreatedResponse {
        record_id: record.record_id.value(),
        due_date: record.due_date,
        borrowed_at: record.borrowed_at,
    };

    Ok((StatusCode::CREATED, Json(response)))
}

/// POST /borrow/:id/return - 書籍を返却する
///
/// 延滞中の貸出も返却できる。返却済みの記録は409。
pub async fn return_book(
    State(state): State<Arc<AppState>>,
    Path(record_id): Path<String>,
) -> Result<Json<ReturnResponse>, ApiError> {
    let cmd = ReturnBook {
        record_id: parse_record_id(&record_id)?,
        returned_at: now(),
    };

    let returned = ledger::return_book(&state.service_deps, cmd).await?;

    Ok(Json(ReturnResponse {
        ok: true,
        record_id: returned.record_id.value(),
        returned_at: returned.returned_at,
    }))
}

/// GET /borrow/:id - 貸出記録をIDで取得
pub async fn get_record(
    State(state): State<Arc<AppState>>,
    Path(record_id): Path<String>,
) -> Result<Json<BorrowRecordResponse>, ApiError> {
    let record = ledger::get_record(&state.service_deps, parse_record_id(&record_id)?).await?;
    Ok(Json(BorrowRecordResponse::new(&record, now())))
}

/// GET /borrow - 貸出記録の一覧（貸出日時の新しい順）
///
/// クエリパラメータ:
/// - status: active, returned, overdue, all（省略時はall）
/// - studentId: 学生で絞り込む
/// - bookId: 書籍で絞り込む
pub async fn list_records(
    State(state): State<Arc<AppState>>,
    query: Result<Query<ListRecordsQuery>, QueryRejection>,
) -> Result<Json<Vec<BorrowRecordResponse>>, ApiError> {
    let Query(query) = query?;

    let status = match &query.status {
        Some(raw) => raw
            .parse::<ledger::StatusFilter>()
            .map_err(ApiError::BadRequest)?,
        None => ledger::StatusFilter::default(),
    };
    let record_query = ledger::RecordQuery {
        status,
        student_id: query.student_id.map(parse_student_id).transpose()?,
        book_id: query.book_id.map(BookId::new),
    };

    let now = now();
    let records = ledger::list_records(&state.service_deps, &record_query, now).await?;

    Ok(Json(BorrowRecordResponse::list(&records, now)))
}

// ============================================================================
// Catalog
// ============================================================================

/// GET /books - 論理削除されていない書籍の一覧（追加日時の新しい順）
pub async fn list_books(
    State(state): State<Arc<AppState>>,
    query: Result<Query<ListBooksQuery>, QueryRejection>,
) -> Result<Json<Vec<BookResponse>>, ApiError> {
    let Query(query) = query?;
    let department = query.department.map(Department::parse).transpose()?;

    let books = catalog::list_books(&state.service_deps, department).await?;
    Ok(Json(books.into_iter().map(BookResponse::from).collect()))
}

/// POST /books - 書籍を追加
pub async fn add_book(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<BookRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<BookResponse>), ApiError> {
    let Json(req) = payload?;
    let cmd = AddBook {
        details: req.into_details()?,
        added_at: now(),
    };

    let book = catalog::add_book(&state.service_deps, cmd).await?;
    Ok((StatusCode::CREATED, Json(BookResponse::from(book))))
}

/// GET /books/deleted - 論理削除された書籍の一覧
pub async fn list_deleted_books(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<BookResponse>>, ApiError> {
    let books = catalog::list_deleted_books(&state.service_deps).await?;
    Ok(Json(books.into_iter().map(BookResponse::from).collect()))
}

/// GET /books/:id - 書籍を取得
pub async fn get_book(
    State(state): State<Arc<AppState>>,
    Path(book_id): Path<String>,
) -> Result<Json<BookResponse>, ApiError> {
    let book = catalog::get_book(&state.service_deps, parse_book_id(&book_id)?).await?;
    Ok(Json(BookResponse::from(book)))
}

/// PUT /books/:id - 書誌情報を更新
pub async fn update_book(
    State(state): State<Arc<AppState>>,
    Path(book_id): Path<String>,
    payload: Result<Json<BookRequest>, JsonRejection>,
) -> Result<Json<BookResponse>, ApiError> {
    let book_id = parse_book_id(&book_id)?;
    let Json(req) = payload?;

    let book = catalog::update_book(&state.service_deps, book_id, req.into_details()?).await?;
    Ok(Json(BookResponse::from(book)))
}

/// DELETE /books/:id - 書籍を論理削除
///
/// 貸出中の書籍は削除できない（409）。
pub async fn delete_book(
    State(state): State<Arc<AppState>>,
    Path(book_id): Path<String>,
) -> Result<Json<BookResponse>, ApiError> {
    let book_id = parse_book_id(&book_id)?;
    let book = catalog::delete_book(&state.service_deps, book_id, now()).await?;
    Ok(Json(BookResponse::from(book)))
}

/// POST /books/:id/restore - 論理削除された書籍を復元
pub async fn restore_book(
    State(state): State<Arc<AppState>>,
    Path(book_id): Path<String>,
) -> Result<Json<BookResponse>, ApiError> {
    let book = catalog::restore_book(&state.service_deps, parse_book_id(&book_id)?).await?;
    Ok(Json(BookResponse::from(book)))
}

/// GET /books/:id/availability - 書籍の貸出可否
pub async fn book_availability(
    State(state): State<Arc<AppState>>,
    Path(book_id): Path<String>,
) -> Result<Json<AvailabilityResponse>, ApiError> {
    let availability =
        ledger::availability(&state.service_deps, parse_book_id(&book_id)?).await?;

    let now = now();
    Ok(Json(AvailabilityResponse {
        book_id: availability.book_id.value(),
        available: availability.available,
        borrower: availability
            .borrower
            .map(|active| BorrowRecordResponse::new(&BorrowRecord::from(active), now)),
    }))
}

// ============================================================================
// Students
// ============================================================================

/// GET /students - 学生の一覧（学籍番号順）
pub async fn list_students(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<StudentResponse>>, ApiError> {
    let registered = students::list_students(&state.service_deps).await?;
    Ok(Json(registered.into_iter().map(StudentResponse::from).collect()))
}

/// POST /students - 学生を登録
///
/// 学籍番号またはメールアドレスが登録済みの場合は409。
pub async fn register_student(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<RegisterStudentRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<StudentResponse>), ApiError> {
    let Json(req) = payload?;
    let cmd = req.into_command(now())?;

    let student = students::register_student(&state.service_deps, cmd).await?;
    Ok((StatusCode::CREATED, Json(StudentResponse::from(student))))
}

/// GET /students/:id - 学生のプロフィール（学生情報と貸出統計）
pub async fn student_profile(
    State(state): State<Arc<AppState>>,
    Path(student_id): Path<String>,
) -> Result<Json<ProfileResponse>, ApiError> {
    let student_id = parse_student_id(student_id)?;
    let profile = students::student_profile(&state.service_deps, &student_id, now()).await?;

    Ok(Json(ProfileResponse {
        student: StudentResponse::from(profile.student),
        stats: StatsResponse::from(profile.stats),
    }))
}

/// GET /students/:id/history - 学生の貸出履歴（貸出日時の新しい順）
///
/// 未登録の学生は404。
pub async fn student_history(
    State(state): State<Arc<AppState>>,
    Path(student_id): Path<String>,
) -> Result<Json<Vec<BorrowRecordResponse>>, ApiError> {
    let student_id = parse_student_id(student_id)?;
    students::get_student(&state.service_deps, &student_id).await?;

    let records = ledger::history(&state.service_deps, &student_id).await?;

    Ok(Json(BorrowRecordResponse::list(&records, now())))
}

/// GET /students/:id/stats - 学生の貸出統計
///
/// 未登録の学生は404。
pub async fn student_stats(
    State(state): State<Arc<AppState>>,
    Path(student_id): Path<String>,
) -> Result<Json<StatsResponse>, ApiError> {
    let student_id = parse_student_id(student_id)?;
    students::get_student(&state.service_deps, &student_id).await?;

    let stats = ledger::stats(&state.service_deps, &student_id, now()).await?;

    Ok(Json(StatsResponse::from(stats)))
}

/// POST /students/:id/logins - ログインを記録
pub async fn record_login(
    State(state): State<Arc<AppState>>,
    Path(student_id): Path<String>,
) -> Result<Json<StudentResponse>, ApiError> {
    let cmd = RecordLogin {
        student_id: parse_student_id(student_id)?,
        logged_in_at: now(),
    };

    let student = students::record_login(&state.service_deps, cmd).await?;
    Ok(Json(StudentResponse::from(student)))
}
