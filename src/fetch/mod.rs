// src/fetch/mod.rs

pub mod client;
pub mod urls;

pub use client::{Fetcher, REQUEST_TIMEOUT, USER_AGENT};
pub use urls::{QueryWindow, UrlBuilder, DEFAULT_URL};
