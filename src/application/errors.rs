use crate::domain::{BookId, Email, RecordId, StudentId, ValidationError};
use thiserror::Error;

/// エラーの分類
///
/// HTTP層はこの分類だけを見てステータスコードを決める。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// 参照先（書籍・学生・貸出記録）が存在しない
    NotFound,
    /// 不変条件違反（二重貸出・二重返却など）
    Conflict,
    /// 識別子や入力値の欠落・形式不正
    Validation,
    /// ストアや外部サービスの障害
    Internal,
}

/// アプリケーション層のエラー
///
/// どのエラーも状態を変更する前に検出されるため、台帳の整合性は保たれる。
#[derive(Debug, Error)]
pub enum ApplicationError {
    /// 書籍が存在しない（論理削除済みを含む）
    #[error("Book {0} not found")]
    BookNotFound(BookId),

    /// 学生が存在しない
    #[error("Student {0} not found")]
    StudentNotFound(StudentId),

    /// 貸出記録が存在しない
    #[error("Borrow record {0} not found")]
    RecordNotFound(RecordId),

    /// 書籍が貸出中
    #[error("Book {0} is already borrowed")]
    BookAlreadyBorrowed(BookId),

    /// 既に返却済み
    #[error("Borrow record {0} is already returned")]
    AlreadyReturned(RecordId),

    /// 貸出中の書籍は削除できない
    #[error("Cannot delete book {0} while it is borrowed")]
    BookCurrentlyBorrowed(BookId),

    /// 削除されていない書籍は復元できない
    #[error("Book {0} is not deleted")]
    BookNotDeleted(BookId),

    /// 学籍番号が登録済み
    #[error("Student ID {0} is already registered")]
    StudentIdTaken(StudentId),

    /// メールアドレスが登録済み
    #[error("Email {0} is already registered")]
    EmailTaken(Email),

    /// 入力値が不正
    #[error("Validation error: {0}")]
    Validation(String),

    /// 貸出記録ストアのエラー
    #[error("Borrow record store error")]
    StoreError(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// カタログのエラー
    #[error("Catalog error")]
    CatalogError(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// 学生名簿のエラー
    #[error("Student directory error")]
    DirectoryError(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ApplicationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ApplicationError::BookNotFound(_)
            | ApplicationError::StudentNotFound(_)
            | ApplicationError::RecordNotFound(_) => ErrorKind::NotFound,

            ApplicationError::BookAlreadyBorrowed(_)
            | ApplicationError::AlreadyReturned(_)
            | ApplicationError::BookCurrentlyBorrowed(_)
            | ApplicationError::BookNotDeleted(_)
            | ApplicationError::StudentIdTaken(_)
            | ApplicationError::EmailTaken(_) => ErrorKind::Conflict,

            ApplicationError::Validation(_) => ErrorKind::Validation,

            ApplicationError::StoreError(_)
            | ApplicationError::CatalogError(_)
            | ApplicationError::DirectoryError(_) => ErrorKind::Internal,
        }
    }
}

impl From<ValidationError> for ApplicationError {
    fn from(err: ValidationError) -> Self {
        ApplicationError::Validation(err.to_string())
    }
}

/// アプリケーション層の Result型
pub type Result<T> = std::result::Result<T, ApplicationError>;
