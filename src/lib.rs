// Library exports for polis
// The binary and the integration tests both build on these modules

pub mod api;
pub mod config;
pub mod error;
pub mod events;
pub mod models;
pub mod optimistic;
pub mod session;
pub mod storage;
pub mod validation;
pub mod views;
