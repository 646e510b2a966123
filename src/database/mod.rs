/// Database connection management
pub mod connection;
/// Row models for trains and raids
pub mod models;
