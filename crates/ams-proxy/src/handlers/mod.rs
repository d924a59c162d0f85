//! HTTP request handlers.

pub mod auth;
pub mod chat;
pub mod files;
pub mod health;
pub mod upload;
