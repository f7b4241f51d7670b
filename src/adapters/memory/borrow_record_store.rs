use crate::domain::{ActiveBorrow, BookId, BorrowRecord, RecordId, ReturnedBorrow};
use crate::ports::borrow_record_store::{
    ActiveInsert, BorrowRecordStore as BorrowRecordStoreTrait, RecordFilter, Result,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

#[derive(Default)]
struct Records {
    by_id: HashMap<RecordId, BorrowRecord>,
    /// 書籍ごとの貸出中記録（書籍1冊につき高々1件）
    active_by_book: HashMap<BookId, RecordId>,
}

/// In-memory implementation of BorrowRecordStore
///
/// A single mutex guards both the records and the active-per-book index,
/// so the availability check and the insert in `insert_active` happen
/// atomically.
pub struct BorrowRecordStore {
    records: Mutex<Records>,
}

impl BorrowRecordStore {
    pub fn new() -> Self {
        Self {
            records: Mutex::new(Records::default()),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Records>> {
        self.records
            .lock()
            .map_err(|_| "borrow record store lock poisoned".into())
    }
}

impl Default for BorrowRecordStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BorrowRecordStoreTrait for BorrowRecordStore {
    async fn insert_active(&self, record: ActiveBorrow) -> Result<ActiveInsert> {
        let mut records = self.lock()?;

        if records.active_by_book.contains_key(&record.book_id) {
            return Ok(ActiveInsert::BookAlreadyBorrowed);
        }

        records
            .active_by_book
            .insert(record.book_id, record.record_id);
        records
            .by_id
            .insert(record.record_id, BorrowRecord::Active(record));
        Ok(ActiveInsert::Inserted)
    }

    async fn find_by_id(&self, record_id: RecordId) -> Result<Option<BorrowRecord>> {
        Ok(self.lock()?.by_id.get(&record_id).cloned())
    }

    async fn find_matching(&self, filter: &RecordFilter) -> Result<Vec<BorrowRecord>> {
        Ok(self
            .lock()?
            .by_id
            .values()
            .filter(|record| filter.matches(record))
            .cloned()
            .collect())
    }

    async fn mark_returned(&self, record: &ReturnedBorrow) -> Result<bool> {
        let mut records = self.lock()?;

        let still_active = matches!(
            records.by_id.get(&record.record_id),
            Some(BorrowRecord::Active(_))
        );
        if !still_active {
            return Ok(false);
        }

        records.active_by_book.remove(&record.book_id);
        records
            .by_id
            .insert(record.record_id, BorrowRecord::Returned(record.clone()));
        Ok(true)
    }
}
