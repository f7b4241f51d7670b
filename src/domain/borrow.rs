use chrono::{DateTime, Days, Duration, Local, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use super::{BookId, BookSnapshot, RecordId, ReturnBookError, StudentId, StudentSnapshot};

/// 貸出期間（日数）
pub const BORROW_PERIOD_DAYS: u64 = 15;

const MILLIS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

// ============================================================================
// 返却期限
// ============================================================================

/// 指定タイムゾーンの暦で返却期限を計算する
///
/// 貸出日時の現地時刻に暦日で15日を足す。月の長さや夏時間の切り替えは
/// そのタイムゾーンの暦に従う（86400秒×15の固定加算ではない）。
/// 加算後の現地時刻が存在しない場合（夏時間の開始直後など）は固定の15日後とする。
pub fn due_date_in<Tz: TimeZone>(borrowed_at: DateTime<Utc>, tz: &Tz) -> DateTime<Utc> {
    let local = borrowed_at.with_timezone(tz).naive_local();

    local
        .checked_add_days(Days::new(BORROW_PERIOD_DAYS))
        .and_then(|due| tz.from_local_datetime(&due).earliest())
        .map(|due| due.with_timezone(&Utc))
        .unwrap_or_else(|| borrowed_at + Duration::days(BORROW_PERIOD_DAYS as i64))
}

/// サーバのローカルタイムゾーンで返却期限を計算する
pub fn due_date(borrowed_at: DateTime<Utc>) -> DateTime<Utc> {
    due_date_in(borrowed_at, &Local)
}

// ============================================================================
// 型安全な状態パターン
// ============================================================================

/// 貸出記録の共通フィールド
///
/// `book`と`student`は貸出時点のスナップショット。後から書籍や学生が
/// 編集されても書き換えない。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BorrowCore {
    // 識別子
    pub record_id: RecordId,

    // 他の集約への参照（IDのみ）
    pub book_id: BookId,
    pub student_id: StudentId,

    // 履歴表示用のスナップショット
    pub book: BookSnapshot,
    pub student: StudentSnapshot,

    // 貸出管理
    pub borrowed_at: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
}

/// 貸出中状態
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveBorrow {
    #[serde(flatten)]
    pub core: BorrowCore,
}

impl std::ops::Deref for ActiveBorrow {
    type Target = BorrowCore;

    fn deref(&self) -> &Self::Target {
        &self.core
    }
}

/// 返却済み状態（終端）
///
/// returned_atが必須（型で保証）。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnedBorrow {
    #[serde(flatten)]
    pub core: BorrowCore,
    pub returned_at: DateTime<Utc>,
}

impl std::ops::Deref for ReturnedBorrow {
    type Target = BorrowCore;

    fn deref(&self) -> &Self::Target {
        &self.core
    }
}

/// 貸出記録
///
/// 状態遷移は `(なし) → Active → Returned` のみ。Returnedから戻る遷移はない。
/// 延滞は状態ではなく、読み取り時に`is_overdue`で判定するビュー。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BorrowRecord {
    Active(ActiveBorrow),
    Returned(ReturnedBorrow),
}

impl BorrowRecord {
    pub fn core(&self) -> &BorrowCore {
        match self {
            BorrowRecord::Active(active) => &active.core,
            BorrowRecord::Returned(returned) => &returned.core,
        }
    }

    pub fn status(&self) -> BorrowStatus {
        match self {
            BorrowRecord::Active(_) => BorrowStatus::Active,
            BorrowRecord::Returned(_) => BorrowStatus::Returned,
        }
    }

    pub fn returned_at(&self) -> Option<DateTime<Utc>> {
        match self {
            BorrowRecord::Active(_) => None,
            BorrowRecord::Returned(returned) => Some(returned.returned_at),
        }
    }

    pub fn as_active(&self) -> Option<&ActiveBorrow> {
        match self {
            BorrowRecord::Active(active) => Some(active),
            BorrowRecord::Returned(_) => None,
        }
    }
}

impl From<ActiveBorrow> for BorrowRecord {
    fn from(active: ActiveBorrow) -> Self {
        BorrowRecord::Active(active)
    }
}

impl From<ReturnedBorrow> for BorrowRecord {
    fn from(returned: ReturnedBorrow) -> Self {
        BorrowRecord::Returned(returned)
    }
}

/// 貸出ステータス（永続化・フィルタ用）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BorrowStatus {
    /// 貸出中
    Active,
    /// 返却済み
    Returned,
}

impl BorrowStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BorrowStatus::Active => "active",
            BorrowStatus::Returned => "returned",
        }
    }
}

impl std::str::FromStr for BorrowStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(BorrowStatus::Active),
            "returned" => Ok(BorrowStatus::Returned),
            _ => Err(format!("Invalid borrow status: {}", s)),
        }
    }
}

// ============================================================================
// 純粋関数
// ============================================================================

/// 純粋関数：書籍を借りる
///
/// ビジネスルール：
/// - 返却期限は貸出日時から暦日で15日後
/// - 状態はActive
/// - 書籍・学生の情報はこの時点の値を焼き付ける
///
/// 「同じ書籍に貸出中の記録が既にないこと」はストアの原子的な挿入で保証する。
pub fn borrow_book(
    book_id: BookId,
    book: BookSnapshot,
    student_id: StudentId,
    student: StudentSnapshot,
    borrowed_at: DateTime<Utc>,
) -> ActiveBorrow {
    ActiveBorrow {
        core: BorrowCore {
            record_id: RecordId::new(),
            book_id,
            student_id,
            book,
            student,
            borrowed_at,
            due_date: due_date(borrowed_at),
        },
    }
}

/// 純粋関数：書籍を返却する
///
/// ビジネスルール：
/// - 延滞していても返却は受け付ける
/// - 返却済みの記録は再返却できない（冪等ではない）
pub fn return_book(
    record: BorrowRecord,
    returned_at: DateTime<Utc>,
) -> Result<ReturnedBorrow, ReturnBookError> {
    match record {
        BorrowRecord::Active(active) => Ok(ReturnedBorrow {
            core: active.core,
            returned_at,
        }),
        BorrowRecord::Returned(_) => Err(ReturnBookError::AlreadyReturned),
    }
}

/// 純粋関数：延滞判定
///
/// 貸出中かつ現在時刻が返却期限を過ぎている場合のみ延滞。
pub fn is_overdue(record: &BorrowRecord, now: DateTime<Utc>) -> bool {
    match record {
        BorrowRecord::Active(active) => now > active.due_date,
        BorrowRecord::Returned(_) => false,
    }
}

/// 返却期限までの残り日数（切り上げ）。負の値は延滞日数。
///
/// 返却済みの記録はNone。
pub fn days_remaining(record: &BorrowRecord, now: DateTime<Utc>) -> Option<i64> {
    let active = record.as_active()?;
    let millis = (active.due_date - now).num_milliseconds();
    Some(-(-millis).div_euclid(MILLIS_PER_DAY))
}

/// 履歴表示順（貸出日時の新しい順）に並べ替える
pub fn sort_most_recent_first(records: &mut [BorrowRecord]) {
    records.sort_by(|a, b| {
        b.core()
            .borrowed_at
            .cmp(&a.core().borrowed_at)
            .then_with(|| b.core().record_id.cmp(&a.core().record_id))
    });
}

/// 学生ごとの貸出統計
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BorrowStats {
    pub total_borrowed: usize,
    pub currently_holding: usize,
    pub returned: usize,
    pub overdue: usize,
}

impl BorrowStats {
    pub fn tally(records: &[BorrowRecord], now: DateTime<Utc>) -> Self {
        records.iter().fold(Self::default(), |mut stats, record| {
            stats.total_borrowed += 1;
            match record.status() {
                BorrowStatus::Active => stats.currently_holding += 1,
                BorrowStatus::Returned => stats.returned += 1,
            }
            if is_overdue(record, now) {
                stats.overdue += 1;
            }
            stats
        })
    }
}
