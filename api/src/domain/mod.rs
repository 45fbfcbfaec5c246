//! Domain models and DB queries, one module per table

pub mod accounts;
pub mod automations;
pub mod history;
pub mod library;

pub use accounts::AccountCredential;
pub use automations::Automation;
pub use history::{NewHistoryEntry, PostHistoryRecord};
pub use library::{Image, Phrase};
