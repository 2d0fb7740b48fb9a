//! Middleware for the clinic operations backend

pub mod auth;

pub use auth::{auth_middleware, CurrentUser};
