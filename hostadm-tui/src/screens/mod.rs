pub mod execution;
pub mod home;
pub mod services;
