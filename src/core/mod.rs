//! Core gateway building blocks.

pub mod upstream;
