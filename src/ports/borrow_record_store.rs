use crate::domain::{ActiveBorrow, BookId, BorrowRecord, BorrowStatus, RecordId, ReturnedBorrow, StudentId};
use async_trait::async_trait;

pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// 貸出中記録の挿入結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActiveInsert {
    /// 挿入した
    Inserted,
    /// 同じ書籍の貸出中記録が既にあるため挿入しなかった
    BookAlreadyBorrowed,
}

/// 貸出記録の検索条件
///
/// 各項目はAND条件。Noneの項目は絞り込まない。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordFilter {
    pub book_id: Option<BookId>,
    pub student_id: Option<StudentId>,
    pub status: Option<BorrowStatus>,
}

impl RecordFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn active_for_book(book_id: BookId) -> Self {
        Self {
            book_id: Some(book_id),
            status: Some(BorrowStatus::Active),
            ..Self::default()
        }
    }

    pub fn for_student(student_id: StudentId) -> Self {
        Self {
            student_id: Some(student_id),
            ..Self::default()
        }
    }

    pub fn matches(&self, record: &BorrowRecord) -> bool {
        let core = record.core();
        self.book_id.is_none_or(|id| core.book_id == id)
            && self
                .student_id
                .as_ref()
                .is_none_or(|id| &core.student_id == id)
            && self.status.is_none_or(|status| record.status() == status)
    }
}

/// 貸出記録ストアポート
///
/// 永続化方式（メモリ、PostgreSQLなど）を貸出台帳から切り離す。
#[async_trait]
pub trait BorrowRecordStore: Send + Sync {
    /// 貸出中記録を原子的に挿入する
    ///
    /// 同じ書籍の貸出中記録の有無の確認と挿入を不可分に行う。
    /// 既に存在する場合は何もせず`ActiveInsert::BookAlreadyBorrowed`を返す。
    async fn insert_active(&self, record: ActiveBorrow) -> Result<ActiveInsert>;

    /// IDで貸出記録を取得する
    async fn find_by_id(&self, record_id: RecordId) -> Result<Option<BorrowRecord>>;

    /// 条件に一致する貸出記録をすべて取得する（順序は規定しない）
    async fn find_matching(&self, filter: &RecordFilter) -> Result<Vec<BorrowRecord>>;

    /// 貸出中の記録を返却済みに更新する
    ///
    /// 記録が貸出中の場合のみ更新し、trueを返す。
    /// 既に返却済み、または存在しない場合はfalse。
    async fn mark_returned(&self, record: &ReturnedBorrow) -> Result<bool>;
}
