pub mod migrations;
pub mod sqlite;
pub mod visitors;
