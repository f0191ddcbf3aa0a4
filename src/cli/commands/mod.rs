//! CLI command implementations.

mod ask;
mod chat;
mod config;
mod search;
mod serve;
mod upload;

pub use ask::run_ask;
pub use chat::run_chat;
pub use config::run_config;
pub use search::run_search;
pub use serve::{build_router, run_serve};
pub use upload::run_upload;
