//! Feeding batches through a `LayerGraph`.
//!
//! Construction order is already a valid execution order (layers only read earlier layers'
//! ports), so evaluation is a single pass down the layer list. Every port a layer exposes is
//! published into a flat map under its qualified name; the map's entry count equals
//! `LayerGraph::port_count()` whatever the batch contents. Evaluation never mutates the graph.

use crate::{
	errors::ExecutionError,
	graph::LayerGraph,
};
use indexmap::IndexMap;
use log::trace;
use ndarray::Array2;

/// Read access to the batch and to already-published signals during a forward pass.
pub struct ForwardContext<'a> {
	graph: &'a LayerGraph,
	batch: &'a Array2<f32>,
	values: IndexMap<String, Array2<f32>>,
}

impl<'a> ForwardContext<'a> {
	pub fn graph(&self) -> &LayerGraph {
		self.graph
	}

	/// The raw input batch.
	pub fn batch(&self) -> &Array2<f32> {
		self.batch
	}

	/// An already-published signal, by qualified port name.
	///
	/// # Panics
	/// Panics if the signal is not yet computed; input resolution at build time guarantees every
	/// declared input is published before its reader runs, so this indicates a layer-form bug.
	pub fn signal(&self, name: &str) -> &Array2<f32> {
		self.values
			.get(name)
			.unwrap_or_else(|| panic!("Lamina Bug: signal '{}' read before it was published", name))
	}
}

/// Computes every layer's output signals for one batch.
///
/// Returns the full named-signal mapping, one `[batch, size]` entry per exposed port.
pub fn feed_forward(graph: &LayerGraph, batch: &Array2<f32>) -> Result<IndexMap<String, Array2<f32>>, ExecutionError> {
	let mut ctx = ForwardContext {
		graph,
		batch,
		values: IndexMap::with_capacity(graph.port_count()),
	};
	for layer in graph.layers() {
		let mut outputs = layer.instance().transform(layer, &ctx)?;
		for port in layer.ports() {
			let value = outputs.swap_remove(port).unwrap_or_else(|| {
				panic!("Lamina Bug: layer '{}' did not publish its '{}' port", layer.name(), port)
			});
			ctx.values.insert(format!("{}:{}", layer.name(), port), value);
		}
		trace!("layer '{}' published {} port(s)", layer.name(), layer.ports().len());
	}
	Ok(ctx.values)
}

/// Computes the final layer's primary output for one batch.
pub fn predict(graph: &LayerGraph, batch: &Array2<f32>) -> Result<Array2<f32>, ExecutionError> {
	let mut values = feed_forward(graph, batch)?;
	let output = graph.output_port();
	Ok(values
		.swap_remove(&output)
		.expect("Lamina Bug: output port missing from forward values"))
}
