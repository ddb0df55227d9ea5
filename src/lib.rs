//! Vendor onboarding wizard
//!
//! A seven-step marketplace onboarding form with validation-gated steps,
//! resumable sessions and pluggable verification gateways. The terminal
//! front end in `main.rs` drives a [`state::Wizard`].

pub mod config;
pub mod gateway;
pub mod state;
