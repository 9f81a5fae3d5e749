//! Client for the Oura Ring v2 REST API
//!
//! Responses are returned as raw JSON: collection endpoints answer with
//! `{ "data": [...], "next_token": ... }`, singleton endpoints with a bare object.
pub mod client;
pub mod date_range;
pub mod error;
pub mod resource;

pub use client::{AccessToken, OuraClient, OuraClientConfig};
pub use date_range::DateRange;
pub use error::OuraError;
pub use resource::Resource;
