pub mod clipboard;
pub mod token;
pub mod user;
