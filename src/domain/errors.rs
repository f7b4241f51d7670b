/// 返却のエラー
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReturnBookError {
    /// 既に返却済み
    AlreadyReturned,
}

/// 書籍削除（論理削除）のエラー
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteBookError {
    /// 既に削除済み
    AlreadyDeleted,
}

/// 書籍復元のエラー
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestoreBookError {
    /// 削除されていない
    NotDeleted,
}
