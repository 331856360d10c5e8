// Library exports for app-audio-switcher
// The binary and the integration tests both build on these modules

pub mod action;
pub mod cli;
pub mod config;
pub mod error;
pub mod host;
pub mod logging;
pub mod plugin;
pub mod poller;
pub mod process;
pub mod router;
pub mod store;
pub mod switcher;
pub mod worker;
