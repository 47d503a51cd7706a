pub mod actions;
pub mod catalog;
pub mod city;
pub mod clock;
pub mod config;
pub mod content;
pub mod engine;
pub mod grid;
pub mod rng;
pub mod scenario;
pub mod session;
pub mod systems;
pub mod web;

pub use city::City;
pub use config::Tuning;
pub use engine::{Engine, TickSummary};
pub use scenario::{Scenario, ScenarioLoader};
pub use session::Session;
