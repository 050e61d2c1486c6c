//! Core of the lamina library: declaring layered networks with heterogeneous shorthand,
//! assembling them into a named, ordered layer graph, feeding batches through it, and resolving
//! monitor patterns against the graph's signal names.
//!
//! The types most users want are `network::Regressor` and `spec::LayerSpec`:
//!
//! ```rust
//! # use lamina_core::network::Regressor;
//! # use lamina_core::spec::LayerSpec;
//! let net = Regressor::new(vec![8.into(), (6, "relu").into(), LayerSpec::new(4)]).unwrap();
//! let names: Vec<_> = net.layers().iter().map(|l| l.name().to_string()).collect();
//! assert_eq!(names, ["in", "hid1", "out"]);
//! ```

pub mod errors;
pub mod exec;
pub mod graph;
pub mod init;
pub mod layers;
pub mod monitor;
pub mod network;
pub mod spec;
pub mod util;
