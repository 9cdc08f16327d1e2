//! Engine module: máquina de estados run/step-run y gating de dependencias.

pub mod core;

pub use self::core::{RunEngine, RunSnapshot, StepSnapshot};
