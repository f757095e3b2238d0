// Library exports for waypost
// Integration tests and the binary build on these modules

pub mod auth;
pub mod community;
pub mod config;
pub mod db;
pub mod error;
pub mod explore;
pub mod extractors;
pub mod profiles;
pub mod routes;
pub mod state;
pub mod uploads;
