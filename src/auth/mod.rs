pub mod basic;
pub(crate) mod extractors;
pub mod middleware;
pub mod password;
pub mod services;

pub use extractors::AuthUser;
pub use services::Identity;
