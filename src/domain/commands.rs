use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{BookDetails, BookId, Department, Email, RecordId, StudentId};

/// コマンド：書籍を借りる
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BorrowBook {
    pub book_id: BookId,
    pub student_id: StudentId,
    pub borrowed_at: DateTime<Utc>,
}

/// コマンド：書籍を返却する
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnBook {
    pub record_id: RecordId,
    pub returned_at: DateTime<Utc>,
}

/// コマンド：書籍をカタログに追加する
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddBook {
    pub details: BookDetails,
    pub added_at: DateTime<Utc>,
}

/// コマンド：学生を登録する
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterStudent {
    pub student_id: StudentId,
    pub name: String,
    pub email: Email,
    pub department: Department,
    pub registered_at: DateTime<Utc>,
}

/// コマンド：ログインを記録する
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordLogin {
    pub student_id: StudentId,
    pub logged_in_at: DateTime<Utc>,
}
