//! Core domain types: bars and regime labels.

pub mod bar;
pub mod regime;

pub use bar::Bar;
pub use regime::Regime;
