pub mod audit;
pub mod auth;
pub mod config;
pub mod db;
pub mod email;
pub mod error;
pub mod fields;
pub mod mailer;
pub mod models;
pub mod registry;
pub mod routes;
pub mod schema;
pub mod state;
pub mod store;
pub mod tokens;
pub mod workflow;
