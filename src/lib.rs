pub mod auth;
pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod model;
pub mod pipeline;
pub mod slug;
pub mod upload;
pub mod web;

pub use error::{Error, Result};
