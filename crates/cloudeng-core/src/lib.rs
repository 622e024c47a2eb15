//! Core cloudeng library (normalizer, renderer, agent, tools, config).

pub mod agent;
pub mod config;
pub mod images;
pub mod logging;
pub mod mcp;
pub mod normalize;
pub mod prompts;
pub mod providers;
pub mod render;
pub mod session;
pub mod tasks;
pub mod tools;
pub mod transcript;
