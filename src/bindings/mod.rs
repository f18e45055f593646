//! PyO3 bindings, compiled with the `python` feature.

pub mod python;
