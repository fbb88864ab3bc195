//! Router construction per endpoint group.

pub mod voice;
