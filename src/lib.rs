pub mod auth;
pub mod config;
pub mod core;
pub mod health;
pub mod meeting;
pub mod shared;
pub mod video;
