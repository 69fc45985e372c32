//! Concrete implementations of the engine's integration contracts.
pub mod moolre;
pub mod notifier;
