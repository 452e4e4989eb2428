// src/lib.rs

pub mod db;
pub mod repositories;
pub mod services;
pub mod push;
pub mod api;
pub mod test_utils;

pub use db::Database;
pub use plantgo_common::error::Error;
