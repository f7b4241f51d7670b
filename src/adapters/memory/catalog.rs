use crate::domain::{Book, BookDetails, BookId};
use crate::ports::catalog::{BookFilter, Catalog as CatalogTrait, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

struct Shelf {
    books: BTreeMap<BookId, Book>,
    next_id: i64,
}

/// In-memory implementation of Catalog
///
/// Book ids are assigned sequentially starting at 1.
pub struct Catalog {
    shelf: Mutex<Shelf>,
}

impl Catalog {
    pub fn new() -> Self {
        Self {
            shelf: Mutex::new(Shelf {
                books: BTreeMap::new(),
                next_id: 1,
            }),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Shelf>> {
        self.shelf.lock().map_err(|_| "catalog lock poisoned".into())
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CatalogTrait for Catalog {
    async fn insert_book(&self, details: BookDetails, added_at: DateTime<Utc>) -> Result<Book> {
        let mut shelf = self.lock()?;

        let book = Book {
            book_id: BookId::new(shelf.next_id),
            details,
            added_at,
            deleted_at: None,
        };
        shelf.next_id += 1;
        shelf.books.insert(book.book_id, book.clone());
        Ok(book)
    }

    async fn find_book(&self, book_id: BookId) -> Result<Option<Book>> {
        Ok(self.lock()?.books.get(&book_id).cloned())
    }

    async fn list_books(&self, filter: &BookFilter) -> Result<Vec<Book>> {
        Ok(self
            .lock()?
            .books
            .values()
            .filter(|book| book.is_deleted() == filter.deleted)
            .filter(|book| {
                filter
                    .department
                    .as_ref()
                    .is_none_or(|department| &book.department == department)
            })
            .cloned()
            .collect())
    }

    async fn save_book(&self, book: &Book) -> Result<()> {
        let mut shelf = self.lock()?;
        match shelf.books.get_mut(&book.book_id) {
            Some(existing) => {
                *existing = book.clone();
                Ok(())
            }
            None => Err(format!("book {} does not exist", book.book_id).into()),
        }
    }
}
