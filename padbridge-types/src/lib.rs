//! # padbridge types
//!
//! Fundamental types shared between the padbridge input core and the
//! transports that carry its reports.
//!
//! - [`button`] - Button identities and per-button states
//! - [`direction`] - Rotary encoder rotation direction

#![no_std]

pub mod button;
pub mod direction;
