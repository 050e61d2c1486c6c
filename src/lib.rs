//! Bundling crate for the lamina workspace: re-exports the core modules under one roof.

pub use lamina_core::{errors, exec, graph, init, layers, monitor, network, spec};

pub use lamina_core::network::Regressor;
pub use lamina_core::spec::LayerSpec;

#[cfg(test)]
mod test;
