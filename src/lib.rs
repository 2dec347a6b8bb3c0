pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod fetcher;
pub mod poller;
pub mod types;
