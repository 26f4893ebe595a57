//! Tides - asymmetric slope generator
//!
//! A phase accumulator with independently timed rising and falling
//! segments, a morphable transfer curve and a filter-or-fold smoothness
//! stage. Runs as an LFO, an attack/decay envelope or a gated
//! attack/release envelope.

pub mod config;
pub mod engine;
pub mod error;
pub mod synth;

pub use config::TidesConfig;
pub use engine::SlopeEngine;
pub use error::EngineError;
