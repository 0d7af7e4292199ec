pub mod config;
pub mod db;
pub mod draft;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod migrations;
pub mod models;
pub mod records;
pub mod repositories;
pub mod routes;
pub mod services;
pub mod session;
pub mod version;
