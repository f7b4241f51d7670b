pub mod book;
pub mod borrow;
pub mod commands;
pub mod errors;
pub mod student;
pub mod value_objects;

pub use book::{Book, BookDetails, BookSnapshot};
pub use borrow::{ActiveBorrow, BorrowCore, BorrowRecord, BorrowStats, BorrowStatus, ReturnedBorrow};
pub use errors::*;
pub use student::{Student, StudentSnapshot};
pub use value_objects::*;
