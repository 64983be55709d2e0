pub mod api_connection;
pub mod chat;
pub mod cli;
pub mod config;
pub mod console;
pub mod flight;
pub mod ingredients;
pub mod recipes;
pub mod session;
pub mod speech;
pub mod staging;
