//! HTTP middleware

pub mod client_ip;

pub use client_ip::inject_client_ip;
