//! Library half of the node binary, split out so `tests/` can drive a
//! [`node::Node`] directly instead of spawning the compiled binary.

pub mod cli;
pub mod config;
pub mod node;
