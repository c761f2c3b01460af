//! User directory.
//!
//! ## Endpoints
//!
//! | Method | Endpoint | Access | Description |
//! |--------|----------|--------|-------------|
//! | POST | `/api/users` | MANAGER, ADMIN | Create a user |
//! | GET | `/api/users` | any | List users (USER: own department only) |
//! | GET | `/api/users/me` | any | The caller's own record |
//! | GET | `/api/users/{id}` | MANAGER, ADMIN | Get a user |
//! | PUT | `/api/users/{id}/role` | MANAGER, ADMIN | Change a user's role |

pub mod dtos;
pub mod handlers;
pub mod models;
pub mod repositories;
pub mod routes;
pub mod services;
