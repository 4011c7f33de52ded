mod config;
mod run;

pub use config::{config_get, config_set};
pub use run::run;
