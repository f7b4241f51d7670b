mod ledger_service;
mod queries;

pub use ledger_service::{borrow_book, return_book};
pub use queries::{
    Availability, RecordQuery, StatusFilter, active_borrower, availability, get_record, history,
    list_records, stats,
};
