pub mod extract;
pub mod livedata;
