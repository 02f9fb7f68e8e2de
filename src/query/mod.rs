pub mod stats;
pub mod time;
pub mod truncate;
pub mod window;
