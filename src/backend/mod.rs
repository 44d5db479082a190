//! Backend module - Envelope types and the HTTP client for the generation service

pub mod http_backend;
pub mod traits;
