use crate::domain::{
    ActiveBorrow, BookId, BorrowRecord, BorrowStats, BorrowStatus, RecordId, StudentId,
    borrow::{is_overdue, sort_most_recent_first},
};
use crate::ports::RecordFilter;
use chrono::{DateTime, Utc};

use crate::application::{ApplicationError, Result, ServiceDependencies};

/// 書籍の貸出可否
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Availability {
    pub book_id: BookId,
    /// 論理削除されておらず、貸出中の記録がない
    pub available: bool,
    /// 貸出中の記録（あれば）
    pub borrower: Option<ActiveBorrow>,
}

/// 貸出記録一覧のステータス条件
///
/// `Overdue`は保存された状態ではなく、読み取り時点で延滞している貸出中記録。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
    #[default]
    All,
    Active,
    Returned,
    Overdue,
}

impl std::str::FromStr for StatusFilter {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "all" => Ok(StatusFilter::All),
            "active" => Ok(StatusFilter::Active),
            "returned" => Ok(StatusFilter::Returned),
            "overdue" => Ok(StatusFilter::Overdue),
            _ => Err(format!(
                "Invalid status filter: {} (expected active, returned, overdue or all)",
                s
            )),
        }
    }
}

/// 貸出記録一覧の検索条件
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordQuery {
    pub status: StatusFilter,
    pub student_id: Option<StudentId>,
    pub book_id: Option<BookId>,
}

/// IDで貸出記録を取得する
pub async fn get_record(deps: &ServiceDependencies, record_id: RecordId) -> Result<BorrowRecord> {
    deps.borrow_records
        .find_by_id(record_id)
        .await
        .map_err(ApplicationError::StoreError)?
        .ok_or(ApplicationError::RecordNotFound(record_id))
}

/// 書籍の貸出中記録を取得する
pub async fn active_borrower(
    deps: &ServiceDependencies,
    book_id: BookId,
) -> Result<Option<ActiveBorrow>> {
    let mut records = deps
        .borrow_records
        .find_matching(&RecordFilter::active_for_book(book_id))
        .await
        .map_err(ApplicationError::StoreError)?;

    sort_most_recent_first(&mut records);

    Ok(records.into_iter().find_map(|record| match record {
        BorrowRecord::Active(active) => Some(active),
        BorrowRecord::Returned(_) => None,
    }))
}

/// 書籍の貸出可否を判定する
///
/// 論理削除済みの書籍は常に貸出不可。存在しない書籍はNotFound。
pub async fn availability(deps: &ServiceDependencies, book_id: BookId) -> Result<Availability> {
    let book = deps
        .catalog
        .find_book(book_id)
        .await
        .map_err(ApplicationError::CatalogError)?
        .ok_or(ApplicationError::BookNotFound(book_id))?;

    let borrower = active_borrower(deps, book_id).await?;

    Ok(Availability {
        book_id,
        available: !book.is_deleted() && borrower.is_none(),
        borrower,
    })
}

/// 学生の貸出履歴（貸出日時の新しい順）
pub async fn history(
    deps: &ServiceDependencies,
    student_id: &StudentId,
) -> Result<Vec<BorrowRecord>> {
    let mut records = deps
        .borrow_records
        .find_matching(&RecordFilter::for_student(student_id.clone()))
        .await
        .map_err(ApplicationError::StoreError)?;

    sort_most_recent_first(&mut records);
    Ok(records)
}

/// 学生の貸出統計
pub async fn stats(
    deps: &ServiceDependencies,
    student_id: &StudentId,
    now: DateTime<Utc>,
) -> Result<BorrowStats> {
    let records = history(deps, student_id).await?;
    Ok(BorrowStats::tally(&records, now))
}

/// 条件に一致する貸出記録の一覧（貸出日時の新しい順）
pub async fn list_records(
    deps: &ServiceDependencies,
    query: &RecordQuery,
    now: DateTime<Utc>,
) -> Result<Vec<BorrowRecord>> {
    let filter = RecordFilter {
        book_id: query.book_id,
        student_id: query.student_id.clone(),
        status: match query.status {
            StatusFilter::All => None,
            StatusFilter::Active | StatusFilter::Overdue => Some(BorrowStatus::Active),
            StatusFilter::Returned => Some(BorrowStatus::Returned),
        },
    };

    let mut records = deps
        .borrow_records
        .find_matching(&filter)
        .await
        .map_err(ApplicationError::StoreError)?;

    if query.status == StatusFilter::Overdue {
        records.retain(|record| is_overdue(record, now));
    }

    sort_most_recent_first(&mut records);
    Ok(records)
}
