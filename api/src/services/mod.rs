pub mod dedup;
pub mod error;
pub mod health;
pub mod history;
pub mod resolver;
pub mod retry;
pub mod threads;
