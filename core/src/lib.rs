pub mod db;
pub mod error;
pub mod estimator;
pub mod models;
pub mod nutrition;
pub mod service;
