pub mod borrow_record_store;
pub mod catalog;
pub mod student_directory;

pub use borrow_record_store::BorrowRecordStore;
pub use catalog::Catalog;
pub use student_directory::StudentDirectory;

use crate::application::ServiceDependencies;
use std::sync::Arc;

/// すべてのポートをメモリ実装で組み立てる
pub fn service_dependencies() -> ServiceDependencies {
    ServiceDependencies {
        borrow_records: Arc::new(BorrowRecordStore::new()),
        catalog: Arc::new(Catalog::new()),
        students: Arc::new(StudentDirectory::new()),
    }
}
