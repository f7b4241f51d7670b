pub mod borrow_record_store;
pub mod catalog;
pub mod student_directory;

// パブリックに型を再エクスポート
pub use borrow_record_store::BorrowRecordStore as PostgresBorrowRecordStore;
pub use catalog::Catalog as PostgresCatalog;
pub use student_directory::StudentDirectory as PostgresStudentDirectory;

use crate::application::ServiceDependencies;
use sqlx::PgPool;
use std::sync::Arc;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// 行データがドメインの不変条件を満たさない場合のエラー
fn invalid_data(message: impl Into<String>) -> BoxError {
    Box::new(std::io::Error::new(
        std::io::ErrorKind::InvalidData,
        message.into(),
    ))
}

/// すべてのポートをPostgreSQL実装で組み立てる
pub fn service_dependencies(pool: PgPool) -> ServiceDependencies {
    ServiceDependencies {
        borrow_records: Arc::new(PostgresBorrowRecordStore::new(pool.clone())),
        catalog: Arc::new(PostgresCatalog::new(pool.clone())),
        students: Arc::new(PostgresStudentDirectory::new(pool)),
    }
}
