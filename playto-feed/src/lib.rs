pub mod app;
pub mod command;
pub mod config;
pub mod feed;
pub mod render;
pub mod session;
