pub mod access_log;
pub mod auth;
pub mod codec;
pub mod config;
pub mod error;
pub mod hits;
pub mod model;
pub mod policy;
pub mod render;
pub mod reset;
pub mod resolver;
pub mod routes;
pub mod store;
pub mod utils;
