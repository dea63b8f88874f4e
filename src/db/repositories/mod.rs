pub mod logs;
pub mod package;
pub mod user;
