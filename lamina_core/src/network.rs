//! The graph-backed regressor: construction, prediction, introspection and monitoring.

use crate::{
	errors::{ConfigurationError, ExecutionError},
	exec,
	graph::{Layer, LayerGraph},
	layers::Update,
	monitor::{self, Monitor, MonitorSpec, MonitorValue},
	spec::LayerSpec,
};
use indexmap::IndexMap;
use ndarray::{Array2, ArrayD, ArrayViewD};
use std::fmt::{self, Display};

/// A layered regression network.
///
/// Built once from a sequence of layer specifications; immutable afterwards. Prediction and
/// monitoring never mutate the network, so repeated calls with different batches are
/// interchangeable and a shared reference is enough for concurrent read-only use.
#[derive(Debug)]
pub struct Regressor {
	graph: LayerGraph,
}

impl Regressor {
	/// Builds the network from an ordered sequence of layer specifications.
	///
	/// The first spec declares the input dimensionality; the rest stack onto it.
	///
	/// ```rust
	/// # use lamina_core::network::Regressor;
	/// # use lamina_core::spec::LayerSpec;
	/// let net = Regressor::new(vec![4.into(), (3, "relu").into(), LayerSpec::new(2)]).unwrap();
	/// assert_eq!(net.layers().len(), 3);
	/// ```
	pub fn new<I>(layers: I) -> Result<Regressor, ConfigurationError>
	where
		I: IntoIterator,
		I::Item: Into<LayerSpec>,
	{
		let specs: Vec<LayerSpec> = layers.into_iter().map(Into::into).collect();
		Ok(Regressor {
			graph: LayerGraph::build(specs)?,
		})
	}

	pub fn graph(&self) -> &LayerGraph {
		&self.graph
	}

	/// The built layers, in graph order.
	pub fn layers(&self) -> &[Layer] {
		self.graph.layers()
	}

	pub fn layer(&self, name: &str) -> Option<&Layer> {
		self.graph.layer(name)
	}

	/// The final layer's primary output for one batch.
	pub fn predict(&self, batch: &Array2<f32>) -> Result<Array2<f32>, ExecutionError> {
		exec::predict(&self.graph, batch)
	}

	/// Every named signal for one batch.
	pub fn feed_forward(&self, batch: &Array2<f32>) -> Result<IndexMap<String, Array2<f32>>, ExecutionError> {
		exec::feed_forward(&self.graph, batch)
	}

	/// Resolves monitor specifications into labelled monitors, `err` always first.
	///
	/// Accepts any ordered sequence of `(pattern, spec)` pairs; see `monitor::MonitorSpec` for
	/// the spec shapes and `monitor::resolve` for ordering guarantees.
	pub fn monitors<I, P, S>(&self, specs: I) -> Vec<Monitor>
	where
		I: IntoIterator<Item = (P, S)>,
		P: Into<String>,
		S: Into<MonitorSpec>,
	{
		let specs: Vec<(String, MonitorSpec)> = specs.into_iter().map(|(p, s)| (p.into(), s.into())).collect();
		monitor::resolve(&self.graph, &specs)
	}

	/// Resolves and evaluates monitors against one batch, returning `(label, value)` pairs.
	pub fn monitor_values<I, P, S>(
		&self,
		specs: I,
		batch: &Array2<f32>,
		targets: &Array2<f32>,
	) -> Result<Vec<(String, f32)>, ExecutionError>
	where
		I: IntoIterator<Item = (P, S)>,
		P: Into<String>,
		S: Into<MonitorSpec>,
	{
		let monitors = self.monitors(specs);
		let values = exec::feed_forward(&self.graph, batch)?;
		let output = &values[&self.graph.output_port()];
		if targets.ncols() != output.ncols() {
			return Err(ExecutionError::TargetWidth {
				expected: output.ncols(),
				got: targets.ncols(),
			});
		}
		if targets.nrows() != output.nrows() {
			return Err(ExecutionError::TargetRows {
				target_rows: targets.nrows(),
				batch_rows: output.nrows(),
			});
		}
		let err = (output - targets).mapv(|d| d * d).mean().unwrap_or(0.0);

		Ok(monitors
			.into_iter()
			.map(|monitor| {
				let value = match &monitor.value {
					MonitorValue::Err => err,
					MonitorValue::Below { signal, level } => fraction_below(self.signal_view(&values, signal), *level),
					MonitorValue::Apply { signal, func } => func(self.signal_view(&values, signal)),
				};
				(monitor.label, value)
			})
			.collect())
	}

	/// State-slot descriptors contributed by the graph's layers; empty for purely feedforward
	/// networks.
	pub fn updates(&self) -> Vec<Update> {
		self.graph
			.layers()
			.iter()
			.flat_map(|layer| layer.instance().updates(layer))
			.collect()
	}

	/// Total count of scalar parameters.
	pub fn num_params(&self) -> usize {
		self.graph.num_params()
	}

	/// Qualified parameter names, in graph order.
	pub fn param_names(&self) -> Vec<&str> {
		self.graph.param_names()
	}

	/// Looks a parameter up by qualified name, e.g. `"hid1.w"`.
	pub fn find(&self, name: &str) -> Option<&ArrayD<f32>> {
		self.graph.find_param(name)
	}

	fn signal_view<'a>(&'a self, values: &'a IndexMap<String, Array2<f32>>, name: &str) -> ArrayViewD<'a, f32> {
		if let Some(value) = values.get(name) {
			value.view().into_dyn()
		} else {
			self.graph
				.find_param(name)
				.unwrap_or_else(|| panic!("Lamina Bug: monitor resolved to unknown signal '{}'", name))
				.view()
		}
	}
}

impl Display for Regressor {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		Display::fmt(&self.graph, f)
	}
}

fn fraction_below(signal: ArrayViewD<f32>, level: f32) -> f32 {
	if signal.is_empty() {
		return 0.0;
	}
	signal.iter().filter(|&&v| v < level).count() as f32 / signal.len() as f32
}
