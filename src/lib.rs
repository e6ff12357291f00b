pub mod api;
pub mod config;
pub mod diagnostics;
pub mod errors;
pub mod exchanges;
pub mod models;
pub mod store;
pub mod view;
