pub mod activity;
pub mod analysis;
pub mod config;
pub mod credentials;
pub mod cycles;
pub mod error;
pub mod filters;
pub mod generator;
pub mod heartbeat;
pub mod http_client;
pub mod llm_client;
pub mod platform;
pub mod state;
