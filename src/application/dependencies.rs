use crate::ports::{BorrowRecordStore, Catalog, StudentDirectory};
use std::sync::Arc;

/// サービスの依存関係
///
/// プロセス起動時に一度だけ組み立て、すべての操作に参照で渡す。
/// 振る舞いは持たず、アプリケーション層の関数が引数として受け取る。
#[derive(Clone)]
pub struct ServiceDependencies {
    pub borrow_records: Arc<dyn BorrowRecordStore>,
    pub catalog: Arc<dyn Catalog>,
    pub students: Arc<dyn StudentDirectory>,
}
