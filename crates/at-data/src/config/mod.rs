//! Client configuration module

pub mod catalog_config;
pub mod duration_str;

pub use catalog_config::*;
