//! Shared helpers used across instruction handlers

pub mod ed25519;
pub mod multisig;
pub mod validation;
pub mod version;
