pub mod app;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod photos;
pub mod purchases;
pub mod state;
pub mod storage;
pub mod wallet;
