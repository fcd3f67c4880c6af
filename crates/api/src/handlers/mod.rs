//! Request handlers.
//!
//! Each submodule serves one resource. Handlers delegate to the repositories
//! in `npuwatch_db`, wrap results in [`ApiResponse`](crate::response::ApiResponse)
//! and map failures via [`AppError`](crate::error::AppError).

pub mod analysis;
pub mod auth;
pub mod config;
pub mod jobs;
pub mod nodes;
pub mod users;
