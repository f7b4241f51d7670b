use crate::domain::{Book, BookDetails, BookId, Department};
use crate::ports::catalog::{BookFilter, Catalog as CatalogTrait, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder, Row, postgres::PgRow};

use super::invalid_data;

const SELECT_BOOK: &str = r#"
    SELECT
        book_id,
        title,
        author,
        department,
        description,
        cover_image,
        file_ref,
        added_at,
        deleted_at
    FROM books
"#;

fn map_row_to_book(row: &PgRow) -> Result<Book> {
    Ok(Book {
        book_id: BookId::new(row.try_get("book_id")?),
        details: BookDetails {
            title: row.try_get("title")?,
            author: row.try_get("author")?,
            department: Department::parse(row.try_get::<String, _>("department")?)?,
            description: row.try_get("description")?,
            cover_image: row.try_get("cover_image")?,
            file_ref: row.try_get("file_ref")?,
        },
        added_at: row.try_get("added_at")?,
        deleted_at: row.try_get("deleted_at")?,
    })
}

/// CatalogのPostgreSQL実装
///
/// 書籍IDはBIGSERIALで採番する。
pub struct Catalog {
    pool: PgPool,
}

impl Catalog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CatalogTrait for Catalog {
    async fn insert_book(&self, details: BookDetails, added_at: DateTime<Utc>) -> Result<Book> {
        let row = sqlx::query(
            r#"
            INSERT INTO books (
                title,
                author,
                department,
                description,
                cover_image,
                file_ref,
                added_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING book_id
            "#,
        )
        .bind(&details.title)
        .bind(&details.author)
        .bind(details.department.as_str())
        .bind(&details.description)
        .bind(&details.cover_image)
        .bind(&details.file_ref)
        .bind(added_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(Book {
            book_id: BookId::new(row.try_get("book_id")?),
            details,
            added_at,
            deleted_at: None,
        })
    }

    async fn find_book(&self, book_id: BookId) -> Result<Option<Book>> {
        let row = sqlx::query(&format!("{SELECT_BOOK} WHERE book_id = $1"))
            .bind(book_id.value())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(map_row_to_book).transpose()
    }

    async fn list_books(&self, filter: &BookFilter) -> Result<Vec<Book>> {
        let mut query = QueryBuilder::<Postgres>::new(SELECT_BOOK);
        if filter.deleted {
            query.push(" WHERE deleted_at IS NOT NULL");
        } else {
            query.push(" WHERE deleted_at IS NULL");
        }
        if let Some(department) = &filter.department {
            query
                .push(" AND department = ")
                .push_bind(department.as_str().to_string());
        }

        let rows = query.build().fetch_all(&self.pool).await?;
        rows.iter().map(map_row_to_book).collect()
    }

    async fn save_book(&self, book: &Book) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE books
            SET title = $2,
                author = $3,
                department = $4,
                description = $5,
                cover_image = $6,
                file_ref = $7,
                deleted_at = $8
            WHERE book_id = $1
            "#,
        )
        .bind(book.book_id.value())
        .bind(&book.title)
        .bind(&book.author)
        .bind(book.department.as_str())
        .bind(&book.description)
        .bind(&book.cover_image)
        .bind(&book.file_ref)
        .bind(book.deleted_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(invalid_data(format!("book {} does not exist", book.book_id)));
        }
        Ok(())
    }
}
