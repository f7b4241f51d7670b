pub mod borrow_record_store;
pub mod catalog;
pub mod student_directory;

pub use borrow_record_store::{ActiveInsert, BorrowRecordStore, RecordFilter};
pub use catalog::{BookFilter, Catalog};
pub use student_directory::{Registration, StudentDirectory};
