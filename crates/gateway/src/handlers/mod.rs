//! HTTP request handlers

pub mod comments;
pub mod discussions;
pub mod health;
pub mod moderation;
