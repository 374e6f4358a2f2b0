pub mod analytics;
pub mod chain;
pub mod config;
pub mod contracts;
pub mod display;
pub mod farm;
pub mod lair;
pub mod pair;
pub mod subgraph;
pub mod swap;
pub mod telemetry;
pub mod token;
pub mod tx;
