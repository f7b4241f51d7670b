use crate::domain::{
    ActiveBorrow, BookId, BookSnapshot, BorrowCore, BorrowRecord, BorrowStatus, Department,
    Email, RecordId, ReturnedBorrow, StudentId, StudentSnapshot,
};
use crate::ports::borrow_record_store::{
    ActiveInsert, BorrowRecordStore as BorrowRecordStoreTrait, RecordFilter, Result,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder, Row, postgres::PgRow};
use std::str::FromStr;

use super::invalid_data;

const SELECT_RECORD: &str = r#"
    SELECT
        record_id,
        book_id,
        student_id,
        book_title,
        book_department,
        student_name,
        student_email,
        student_department,
        borrowed_at,
        due_date,
        returned_at,
        status
    FROM borrow_records
"#;

/// PostgreSQLの行データをBorrowRecordに変換する
///
/// statusが'returned'の行はreturned_atが必須（テーブルのCHECK制約と同じ条件）。
fn map_row_to_record(row: &PgRow) -> Result<BorrowRecord> {
    let status_str: &str = row.try_get("status")?;
    let status = BorrowStatus::from_str(status_str).map_err(invalid_data)?;

    let core = BorrowCore {
        record_id: RecordId::from_uuid(row.try_get("record_id")?),
        book_id: BookId::new(row.try_get("book_id")?),
        student_id: StudentId::parse(row.try_get::<String, _>("student_id")?)?,
        book: BookSnapshot {
            title: row.try_get("book_title")?,
            department: Department::parse(row.try_get::<String, _>("book_department")?)?,
        },
        student: StudentSnapshot {
            name: row.try_get("student_name")?,
            email: Email::parse(row.try_get::<String, _>("student_email")?)?,
            department: Department::parse(row.try_get::<String, _>("student_department")?)?,
        },
        borrowed_at: row.try_get("borrowed_at")?,
        due_date: row.try_get("due_date")?,
    };

    match status {
        BorrowStatus::Active => Ok(BorrowRecord::Active(ActiveBorrow { core })),
        BorrowStatus::Returned => {
            let returned_at: Option<DateTime<Utc>> = row.try_get("returned_at")?;
            let returned_at = returned_at.ok_or_else(|| {
                invalid_data(format!(
                    "returned record {} has no returned_at",
                    core.record_id
                ))
            })?;
            Ok(BorrowRecord::Returned(ReturnedBorrow { core, returned_at }))
        }
    }
}

/// BorrowRecordStoreのPostgreSQL実装
///
/// 「書籍1冊につき貸出中の記録は高々1件」は部分ユニークインデックス
/// `idx_borrow_records_one_active_per_book`で保証する。
pub struct BorrowRecordStore {
    pool: PgPool,
}

impl BorrowRecordStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BorrowRecordStoreTrait for BorrowRecordStore {
    /// 貸出中記録を挿入する
    ///
    /// ON CONFLICT ... DO NOTHING により、同じ書籍の貸出中記録が既にあれば
    /// 1行も挿入されない。確認と挿入が1つの文で行われるため競合しない。
    async fn insert_active(&self, record: ActiveBorrow) -> Result<ActiveInsert> {
        let result = sqlx::query(
            r#"
            INSERT INTO borrow_records (
                record_id,
                book_id,
                student_id,
                book_title,
                book_department,
                student_name,
                student_email,
                student_department,
                borrowed_at,
                due_date,
                returned_at,
                status
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, NULL, 'active')
            ON CONFLICT (book_id) WHERE status = 'active'
            DO NOTHING
            "#,
        )
        .bind(record.record_id.value())
        .bind(record.book_id.value())
        .bind(record.student_id.as_str())
        .bind(&record.book.title)
        .bind(record.book.department.as_str())
        .bind(&record.student.name)
        .bind(record.student.email.as_str())
        .bind(record.student.department.as_str())
        .bind(record.borrowed_at)
        .bind(record.due_date)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 1 {
            Ok(ActiveInsert::Inserted)
        } else {
            Ok(ActiveInsert::BookAlreadyBorrowed)
        }
    }

    async fn find_by_id(&self, record_id: RecordId) -> Result<Option<BorrowRecord>> {
        let row = sqlx::query(&format!("{SELECT_RECORD} WHERE record_id = $1"))
            .bind(record_id.value())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(map_row_to_record).transpose()
    }

    async fn find_matching(&self, filter: &RecordFilter) -> Result<Vec<BorrowRecord>> {
        let mut query = QueryBuilder::<Postgres>::new(SELECT_RECORD);
        query.push(" WHERE TRUE");

        if let Some(book_id) = filter.book_id {
            query.push(" AND book_id = ").push_bind(book_id.value());
        }
        if let Some(student_id) = &filter.student_id {
            query
                .push(" AND student_id = ")
                .push_bind(student_id.as_str().to_string());
        }
        if let Some(status) = filter.status {
            query.push(" AND status = ").push_bind(status.as_str());
        }
        query.push(" ORDER BY borrowed_at DESC");

        let rows = query.build().fetch_all(&self.pool).await?;
        rows.iter().map(map_row_to_record).collect()
    }

    /// 貸出中の場合のみ返却済みに更新する
    async fn mark_returned(&self, record: &ReturnedBorrow) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE borrow_records
            SET status = 'returned',
                returned_at = $2
            WHERE record_id = $1
              AND status = 'active'
            "#,
        )
        .bind(record.record_id.value())
        .bind(record.returned_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}
