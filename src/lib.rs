pub mod api;
pub mod config;
pub mod credential;
pub mod error;
pub mod models;
pub mod rbac;
