pub mod config;
pub mod controller;
pub mod engine;
pub mod heartbeat;
pub mod http;
pub mod initializer;
pub mod model;
pub mod persistence;
pub mod repository;
pub mod server;

#[cfg(any(test, feature = "test-support"))]
pub mod fixtures;
