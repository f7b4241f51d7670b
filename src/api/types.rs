use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{
    Book, BookDetails, BookId, BorrowRecord, BorrowStats, Department, Email, Student, StudentId,
    ValidationError,
    borrow::{days_remaining, is_overdue},
    commands::{BorrowBook, RegisterStudent},
};

// ============================================================================
// Requests
// ============================================================================

/// 貸出リクエスト（POST /borrow）
///
/// 識別子が欠けている場合はバリデーションエラーにするため、どちらも任意で受け取る。
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BorrowRequest {
    pub book_id: Option<i64>,
    pub student_id: Option<String>,
}

impl BorrowRequest {
    pub fn into_command(self, borrowed_at: DateTime<Utc>) -> Result<BorrowBook, ValidationError> {
        let book_id = self.book_id.ok_or(ValidationError::Empty("bookId"))?;
        let student_id = StudentId::parse(self.student_id.unwrap_or_default())
            .map_err(|_| ValidationError::Empty("studentId"))?;

        Ok(BorrowBook {
            book_id: BookId::new(book_id),
            student_id,
            borrowed_at,
        })
    }
}

/// 書籍の追加・更新リクエスト（POST /books, PUT /books/:id）
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BookRequest {
    pub title: String,
    pub author: String,
    pub department: String,
    pub description: Option<String>,
    pub cover_image: Option<String>,
    pub file_ref: Option<String>,
}

impl BookRequest {
    pub fn into_details(self) -> Result<BookDetails, ValidationError> {
        let department = Department::parse(self.department)?;
        Ok(BookDetails::new(self.title, self.author, department)?
            .with_description(self.description)
            .with_cover_image(self.cover_image)
            .with_file_ref(self.file_ref))
    }
}

/// 学生登録リクエスト（POST /students）
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RegisterStudentRequest {
    pub student_id: String,
    pub name: String,
    pub email: String,
    pub department: String,
}

impl RegisterStudentRequest {
    pub fn into_command(
        self,
        registered_at: DateTime<Utc>,
    ) -> Result<RegisterStudent, ValidationError> {
        Ok(RegisterStudent {
            student_id: StudentId::parse(self.student_id)?,
            name: self.name,
            email: Email::parse(self.email)?,
            department: Department::parse(self.department)?,
            registered_at,
        })
    }
}

/// 貸出記録一覧のクエリパラメータ（GET /borrow）
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListRecordsQuery {
    /// active, returned, overdue, all のいずれか
    pub status: Option<String>,
    pub student_id: Option<String>,
    pub book_id: Option<i64>,
}

/// 書籍一覧のクエリパラメータ（GET /books）
#[derive(Debug, Default, Deserialize)]
pub struct ListBooksQuery {
    pub department: Option<String>,
}

// ============================================================================
// Responses
// ============================================================================

/// 貸出作成レスポンス
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BorrowCreatedResponse {
    pub record_id: Uuid,
    pub due_date: DateTime<Utc>,
    pub borrowed_at: DateTime<Utc>,
}

/// 返却レスポンス
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReturnResponse {
    pub ok: bool,
    pub record_id: Uuid,
    pub returned_at: DateTime<Utc>,
}

/// 貸出記録レスポンス
///
/// `overdue`と`daysRemaining`はレスポンス生成時点で計算する。
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BorrowRecordResponse {
    pub record_id: Uuid,
    pub book_id: i64,
    pub student_id: String,
    pub book_title: String,
    pub book_department: String,
    pub student_name: String,
    pub student_email: String,
    pub student_department: String,
    pub borrowed_at: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub returned_at: Option<DateTime<Utc>>,
    pub status: String,
    pub overdue: bool,
    pub days_remaining: Option<i64>,
}

impl BorrowRecordResponse {
    pub fn new(record: &BorrowRecord, now: DateTime<Utc>) -> Self {
        let core = record.core();
        Self {
            record_id: core.record_id.value(),
            book_id: core.book_id.value(),
            student_id: core.student_id.to_string(),
            book_title: core.book.title.clone(),
            book_department: core.book.department.to_string(),
            student_name: core.student.name.clone(),
            student_email: core.student.email.to_string(),
            student_department: core.student.department.to_string(),
            borrowed_at: core.borrowed_at,
            due_date: core.due_date,
            returned_at: record.returned_at(),
            status: record.status().as_str().to_string(),
            overdue: is_overdue(record, now),
            days_remaining: days_remaining(record, now),
        }
    }

    pub fn list(records: &[BorrowRecord], now: DateTime<Utc>) -> Vec<Self> {
        records
            .iter()
            .map(|record| Self::new(record, now))
            .collect()
    }
}

/// 貸出可否レスポンス（GET /books/:id/availability）
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityResponse {
    pub book_id: i64,
    pub available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub borrower: Option<BorrowRecordResponse>,
}

/// 書籍レスポンス
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookResponse {
    pub book_id: i64,
    pub title: String,
    pub author: String,
    pub department: String,
    pub description: Option<String>,
    pub cover_image: Option<String>,
    pub file_ref: Option<String>,
    pub added_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl From<Book> for BookResponse {
    fn from(book: Book) -> Self {
        Self {
            book_id: book.book_id.value(),
            title: book.details.title,
            author: book.details.author,
            department: book.details.department.to_string(),
            description: book.details.description,
            cover_image: book.details.cover_image,
            file_ref: book.details.file_ref,
            added_at: book.added_at,
            deleted_at: book.deleted_at,
        }
    }
}

/// 学生レスポンス
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentResponse {
    pub student_id: String,
    pub name: String,
    pub email: String,
    pub department: String,
    pub registered_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
    pub login_history: Vec<DateTime<Utc>>,
}

impl From<Student> for StudentResponse {
    fn from(student: Student) -> Self {
        Self {
            student_id: student.student_id.to_string(),
            name: student.name,
            email: student.email.to_string(),
            department: student.department.to_string(),
            registered_at: student.registered_at,
            last_login: student.last_login,
            login_history: student.login_history,
        }
    }
}

/// 貸出統計レスポンス
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    pub total_borrowed: usize,
    pub currently_holding: usize,
    pub returned: usize,
    pub overdue: usize,
}

impl From<BorrowStats> for StatsResponse {
    fn from(stats: BorrowStats) -> Self {
        Self {
            total_borrowed: stats.total_borrowed,
            currently_holding: stats.currently_holding,
            returned: stats.returned,
            overdue: stats.overdue,
        }
    }
}

/// 学生プロフィールレスポンス（GET /students/:id）
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileResponse {
    #[serde(flatten)]
    pub student: StudentResponse,
    pub stats: StatsResponse,
}

/// エラーレスポンス
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
        }
    }
}
