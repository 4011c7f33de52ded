mod backoff_retry;
mod load_dotenv;

pub use backoff_retry::{backoff_retry, reconnect_backoff};
pub use load_dotenv::load_dotenv;

pub mod base_path;
pub mod suntime;
