pub mod cfgdb;
pub mod dbpath;
pub mod mqtt;
