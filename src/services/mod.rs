pub mod audit;
pub use audit::AuditService;

pub mod auth_service;
pub mod auth_service_impl;
pub use auth_service::{AuthError, AuthService, LoginResult, SessionResult};
pub use auth_service_impl::SeaOrmAuthService;

pub mod user_service;
pub mod user_service_impl;
pub use user_service::{UserProfile, UserService, UserServiceError, UserUpdate};
pub use user_service_impl::SeaOrmUserService;

pub mod package_service;
pub mod package_service_impl;
pub use package_service::{
    NewPackage, PackageDto, PackageService, PackageServiceError, PackageUpdate,
};
pub use package_service_impl::SeaOrmPackageService;
