use crate::domain::{Book, BookDetails, BookId, BookSnapshot, Department};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// 書籍一覧の検索条件
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookFilter {
    /// 学科で絞り込む
    pub department: Option<Department>,
    /// trueなら論理削除済みの書籍のみ、falseなら未削除の書籍のみ
    pub deleted: bool,
}

/// カタログポート
///
/// 貸出台帳とカタログ管理の境界を維持する。
/// 台帳が必要とするのは書籍の存在・削除状態・スナップショットのみ。
#[async_trait]
pub trait Catalog: Send + Sync {
    /// 書籍を追加し、採番したIDを持つ書籍を返す
    async fn insert_book(&self, details: BookDetails, added_at: DateTime<Utc>) -> Result<Book>;

    /// IDで書籍を取得する（論理削除済みも含む）
    async fn find_book(&self, book_id: BookId) -> Result<Option<Book>>;

    /// 条件に一致する書籍を取得する（順序は規定しない）
    async fn list_books(&self, filter: &BookFilter) -> Result<Vec<Book>>;

    /// 既存の書籍を上書き保存する
    async fn save_book(&self, book: &Book) -> Result<()>;

    /// 貸出可能な書籍のスナップショットを取得する
    ///
    /// 書籍が存在しない、または論理削除済みの場合はNone。
    async fn book_snapshot(&self, book_id: BookId) -> Result<Option<BookSnapshot>> {
        Ok(self
            .find_book(book_id)
            .await?
            .filter(|book| !book.is_deleted())
            .map(|book| book.snapshot()))
    }
}
