//! File storage with role- and department-aware access control.
//!
//! ## Endpoints
//!
//! | Method | Endpoint | Action checked |
//! |--------|----------|----------------|
//! | POST | `/api/files/upload` | upload policy |
//! | GET | `/api/files` | read_info (as a query filter) |
//! | GET | `/api/files/{id}` | read_info |
//! | GET | `/api/files/{id}/download` | download |
//! | GET | `/api/files/{id}/metadata` | read_info |
//! | DELETE | `/api/files/{id}` | delete |

pub mod dtos;
pub mod handlers;
pub mod models;
pub mod policy;
pub mod repositories;
pub mod routes;
pub mod services;

pub use routes::routes;
pub use services::FileService;
