pub use super::package_flags::Entity as PackageFlags;
pub use super::packages::Entity as Packages;
pub use super::system_logs::Entity as SystemLogs;
pub use super::users::Entity as Users;
