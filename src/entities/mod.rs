pub mod prelude;

pub mod package_flags;
pub mod packages;
pub mod system_logs;
pub mod users;
