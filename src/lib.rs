pub mod config;
pub mod errors;
pub mod fingerprint;
pub mod manifest;
pub mod models;
pub mod services;
pub mod utils;
pub mod web;
