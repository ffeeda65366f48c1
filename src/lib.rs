pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod lms;
pub mod models;
pub mod services;
pub mod state;
