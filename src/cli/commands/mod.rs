//! Command implementations for the Minne CLI.

mod chat;
mod config;
mod delete;
mod doctor;
mod export;
mod ingest;
mod init;
mod list;
mod process;
mod query;
mod search;

pub use chat::run_chat;
pub use config::run_config;
pub use delete::run_delete;
pub use doctor::run_doctor;
pub use export::run_export;
pub use ingest::run_ingest;
pub use init::run_init;
pub use list::run_list;
pub use process::run_process;
pub use query::run_query;
pub use search::run_search;
