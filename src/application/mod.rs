pub mod catalog;
mod dependencies;
mod errors;
pub mod ledger;
pub mod students;

pub use dependencies::ServiceDependencies;
pub use errors::{ApplicationError, ErrorKind, Result};
