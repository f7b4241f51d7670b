mod catalog_service;

pub use catalog_service::{
    add_book, delete_book, get_book, list_books, list_deleted_books, restore_book, update_book,
};
