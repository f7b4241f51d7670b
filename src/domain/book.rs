use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{BookId, DeleteBookError, Department, RestoreBookError, ValidationError};

/// 書籍の書誌情報（管理者が編集できる部分）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookDetails {
    pub title: String,
    pub author: String,
    pub department: Department,
    pub description: Option<String>,
    /// 表紙画像のURL
    pub cover_image: Option<String>,
    /// 電子書籍ファイルへの参照（アップロード処理は扱わない）
    pub file_ref: Option<String>,
}

impl BookDetails {
    /// タイトルと著者は必須。空白のみの任意項目はNoneに正規化する。
    pub fn new(
        title: impl Into<String>,
        author: impl Into<String>,
        department: Department,
    ) -> Result<Self, ValidationError> {
        let title = title.into().trim().to_string();
        if title.is_empty() {
            return Err(ValidationError::Empty("title"));
        }
        let author = author.into().trim().to_string();
        if author.is_empty() {
            return Err(ValidationError::Empty("author"));
        }

        Ok(Self {
            title,
            author,
            department,
            description: None,
            cover_image: None,
            file_ref: None,
        })
    }

    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = blank_to_none(description);
        self
    }

    pub fn with_cover_image(mut self, cover_image: Option<String>) -> Self {
        self.cover_image = blank_to_none(cover_image);
        self
    }

    pub fn with_file_ref(mut self, file_ref: Option<String>) -> Self {
        self.file_ref = blank_to_none(file_ref);
        self
    }
}

fn blank_to_none(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// 書籍 - カタログ集約
///
/// 貸出履歴から参照され続けるため物理削除はせず、`deleted_at`で論理削除する。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    pub book_id: BookId,
    #[serde(flatten)]
    pub details: BookDetails,
    pub added_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl std::ops::Deref for Book {
    type Target = BookDetails;

    fn deref(&self) -> &Self::Target {
        &self.details
    }
}

impl Book {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// 貸出記録に焼き付ける書籍情報
    pub fn snapshot(&self) -> BookSnapshot {
        BookSnapshot {
            title: self.details.title.clone(),
            department: self.details.department.clone(),
        }
    }
}

/// 貸出時点の書籍情報のスナップショット
///
/// 後で書籍が編集されても更新しない（履歴表示用）。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookSnapshot {
    pub title: String,
    pub department: Department,
}

/// 純粋関数：書誌情報を差し替える
pub fn revise(book: &Book, details: BookDetails) -> Book {
    Book {
        details,
        ..book.clone()
    }
}

/// 純粋関数：書籍を論理削除する
pub fn soft_delete(book: &Book, deleted_at: DateTime<Utc>) -> Result<Book, DeleteBookError> {
    if book.is_deleted() {
        return Err(DeleteBookError::AlreadyDeleted);
    }

    Ok(Book {
        deleted_at: Some(deleted_at),
        ..book.clone()
    })
}

/// 純粋関数：論理削除された書籍を復元する
pub fn restore(book: &Book) -> Result<Book, RestoreBookError> {
    if !book.is_deleted() {
        return Err(RestoreBookError::NotDeleted);
    }

    Ok(Book {
        deleted_at: None,
        ..book.clone()
    })
}
