//! Gamepad to robot bridge
//!
//! Reads a gamepad, classifies stick and trigger input into a motion intent
//! and sends the resulting record to a robot's HTTP endpoint whenever
//! something meaningful changed.

pub mod config;
pub mod controller;
pub mod motion;
pub mod status;
pub mod transport;
