use crate::domain::{
    self, Book, BookDetails, BookId, DeleteBookError, Department, RestoreBookError,
    commands::AddBook,
};
use crate::ports::BookFilter;
use chrono::{DateTime, Utc};

use crate::application::{ApplicationError, Result, ServiceDependencies, ledger};

/// 未削除の書籍を取得する（論理削除済みはNotFound）
async fn load_live_book(deps: &ServiceDependencies, book_id: BookId) -> Result<Book> {
    deps.catalog
        .find_book(book_id)
        .await
        .map_err(ApplicationError::CatalogError)?
        .filter(|book| !book.is_deleted())
        .ok_or(ApplicationError::BookNotFound(book_id))
}

async fn save(deps: &ServiceDependencies, book: &Book) -> Result<()> {
    deps.catalog
        .save_book(book)
        .await
        .map_err(ApplicationError::CatalogError)
}

/// 書籍をカタログに追加する
pub async fn add_book(deps: &ServiceDependencies, cmd: AddBook) -> Result<Book> {
    let book = deps
        .catalog
        .insert_book(cmd.details, cmd.added_at)
        .await
        .map_err(ApplicationError::CatalogError)?;

    tracing::info!(book_id = %book.book_id, title = %book.title, "book added");
    Ok(book)
}

/// 書籍を取得する
pub async fn get_book(deps: &ServiceDependencies, book_id: BookId) -> Result<Book> {
    load_live_book(deps, book_id).await
}

/// 未削除の書籍一覧（追加日時の新しい順）
pub async fn list_books(
    deps: &ServiceDependencies,
    department: Option<Department>,
) -> Result<Vec<Book>> {
    let mut books = deps
        .catalog
        .list_books(&BookFilter {
            department,
            deleted: false,
        })
        .await
        .map_err(ApplicationError::CatalogError)?;

    books.sort_by(|a, b| {
        b.added_at
            .cmp(&a.added_at)
            .then_with(|| b.book_id.cmp(&a.book_id))
    });
    Ok(books)
}

/// 論理削除済みの書籍一覧（削除日時の新しい順）
pub async fn list_deleted_books(deps: &ServiceDependencies) -> Result<Vec<Book>> {
    let mut books = deps
        .catalog
        .list_books(&BookFilter {
            department: None,
            deleted: true,
        })
        .await
        .map_err(ApplicationError::CatalogError)?;

    books.sort_by(|a, b| {
        b.deleted_at
            .cmp(&a.deleted_at)
            .then_with(|| b.book_id.cmp(&a.book_id))
    });
    Ok(books)
}

/// 書誌情報を更新する
///
/// 既存の貸出記録のスナップショットは更新しない。
pub async fn update_book(
    deps: &ServiceDependencies,
    book_id: BookId,
    details: BookDetails,
) -> Result<Book> {
    let book = load_live_book(deps, book_id).await?;
    let revised = domain::book::revise(&book, details);
    save(deps, &revised).await?;

    tracing::info!(book_id = %book_id, "book updated");
    Ok(revised)
}

/// 書籍を論理削除する
///
/// ビジネスルール：貸出中の書籍は削除できない（Conflict）
pub async fn delete_book(
    deps: &ServiceDependencies,
    book_id: BookId,
    deleted_at: DateTime<Utc>,
) -> Result<Book> {
    let book = load_live_book(deps, book_id).await?;

    if ledger::active_borrower(deps, book_id).await?.is_some() {
        return Err(ApplicationError::BookCurrentlyBorrowed(book_id));
    }

    let deleted = domain::book::soft_delete(&book, deleted_at).map_err(|e| match e {
        DeleteBookError::AlreadyDeleted => ApplicationError::BookNotFound(book_id),
    })?;
    save(deps, &deleted).await?;

    tracing::info!(book_id = %book_id, "book deleted");
    Ok(deleted)
}

/// 論理削除された書籍を復元する
pub async fn restore_book(deps: &ServiceDependencies, book_id: BookId) -> Result<Book> {
    let book = deps
        .catalog
        .find_book(book_id)
        .await
        .map_err(ApplicationError::CatalogError)?
        .ok_or(ApplicationError::BookNotFound(book_id))?;

    let restored = domain::book::restore(&book).map_err(|e| match e {
        RestoreBookError::NotDeleted => ApplicationError::BookNotDeleted(book_id),
    })?;
    save(deps, &restored).await?;

    tracing::info!(book_id = %book_id, "book restored");
    Ok(restored)
}
