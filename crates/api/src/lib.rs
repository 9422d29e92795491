//! HTTP boundary for the gatehouse authorization engine.

pub mod app;
pub mod authz;
pub mod bootstrap;
pub mod config;
pub mod context;
pub mod middleware;
pub mod token;
