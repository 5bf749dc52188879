pub mod api;
pub mod config;
pub mod db;
pub mod generator;
pub mod metrics;
pub mod seed;
pub mod strategy;
