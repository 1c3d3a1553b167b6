pub mod activity_log;
pub mod image;
pub mod user;
