pub mod bot;
pub mod config;
pub mod engine;
pub mod error;
pub mod facade;
pub mod forge;
pub mod queue;
pub mod server;
pub mod settings;
pub mod webhook;

#[cfg(test)]
pub(crate) mod testing;
