pub mod audit;
pub mod brackets;
pub mod connection;
pub mod matches;
pub mod models;
pub mod notifications;
pub mod registrations;
pub mod setup;
pub mod teams;
pub mod tournaments;
pub mod users;

pub use connection::{create_pool, get_connection, with_write_tx, DbConn, DbPool};
