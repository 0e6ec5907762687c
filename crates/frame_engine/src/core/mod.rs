//! # Core Engine Module
//!
//! Shared configuration for every subsystem.

pub mod config;

pub use config::{
    ApplicationConfig,
    EngineConfig,
    RendererConfig,
    PathfinderConfig,
    Config,
    ConfigError,
};
