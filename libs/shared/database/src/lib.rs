pub mod migrations;
pub mod sqlite;

pub use sqlite::{Database, DatabaseError};
