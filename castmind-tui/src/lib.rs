//! CastMind terminal console.

pub mod config;
pub mod error;
pub mod events;
pub mod export;
pub mod keys;
pub mod nav;
pub mod notifications;
pub mod persistence;
pub mod state;
pub mod telemetry;
pub mod theme;
pub mod views;
pub mod widgets;
