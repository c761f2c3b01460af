pub mod auth;
pub mod extraction;
pub mod files;
pub mod users;
