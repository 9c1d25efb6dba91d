//! Two UCB-tuned pricing agents competing in a noisy linear-demand duopoly.
//!
//! An [`engine::Engine`] plays one trial: two [`agent::Agent`]s choose between
//! the competitive and the collusive price of an [`environment::Environment`]
//! for a fixed number of rounds. The [`manager::Manager`] repeats trials over a
//! sweep of noise scales and [`analysis`] summarizes the outcome.

pub mod agent;
pub mod analysis;
pub mod config;
pub mod engine;
pub mod environment;
pub mod manager;
pub mod model;
pub mod stats;
