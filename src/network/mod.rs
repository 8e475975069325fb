pub mod client;
pub mod gateway;

pub use client::ChatBackend;
