//! This crate provides common concepts, functionality, and helpers that the other crates in the
//! workspace can benefit from.

pub mod concepts;
pub mod net;
pub mod polling;
