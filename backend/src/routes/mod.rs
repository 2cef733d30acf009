pub mod auth;
pub mod clipboard;
pub mod extract;
pub mod health;
