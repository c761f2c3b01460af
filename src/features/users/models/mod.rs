mod user;

pub use user::{CreateUser, Role, User};
