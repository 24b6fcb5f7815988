mod client;
mod contracts;

pub use client::ApiClient;
