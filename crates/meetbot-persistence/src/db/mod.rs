//! Connection bootstrap and schema migrations.

pub mod migrations;
mod open;

pub use open::{open_db, open_db_in_memory};
