//! `Layer` and `LayerGraph`: the named, ordered graph a network is built around.
//!
//! A `LayerGraph` is assembled once from an ordered sequence of `LayerSpec`s and is immutable
//! afterwards. Each layer may only read ports of layers built before it, so construction order is
//! always a valid execution order and the graph is acyclic by construction. Alongside the layers
//! the graph keeps derived name indexes: layer name, port name (`"layer:port"`) and parameter
//! name (`"layer.param"`), the latter two merged into one stable signal list that monitor
//! patterns are matched against.

use crate::{
	errors::ConfigurationError,
	layers::{self, activ, FormContext, LayerInstance},
	spec::LayerSpec,
	util::display::IterDisplay,
};
use indexmap::{indexmap, IndexMap};
use itertools::Itertools;
use log::debug;
use ndarray::{ArrayD, ArrayView1, ArrayView2, Ix1, Ix2};
use smallvec::SmallVec;
use std::fmt::{self, Display};

/// A named computational unit in a `LayerGraph`.
///
/// Owned exclusively by the graph; the graph index is the only handle other layers hold to it.
#[derive(Debug)]
pub struct Layer {
	name: String,
	form: String,
	activation: String,
	size: usize,
	inputs: IndexMap<String, usize>,
	partner: Option<usize>,
	params: IndexMap<String, ArrayD<f32>>,
	instance: Box<dyn LayerInstance>,
}

impl Layer {
	pub fn name(&self) -> &str {
		&self.name
	}

	/// The registry tag this layer was built under.
	pub fn form(&self) -> &str {
		&self.form
	}

	pub fn activation(&self) -> &str {
		&self.activation
	}

	/// Number of columns in this layer's output signals.
	pub fn size(&self) -> usize {
		self.size
	}

	/// The resolved ports this layer reads, with the column count expected from each.
	pub fn inputs(&self) -> &IndexMap<String, usize> {
		&self.inputs
	}

	/// Index of the mirrored layer, for tied layers. Resolve with `LayerGraph::partner_of`.
	pub fn partner_index(&self) -> Option<usize> {
		self.partner
	}

	/// The parameters this layer owns.
	pub fn params(&self) -> &IndexMap<String, ArrayD<f32>> {
		&self.params
	}

	pub fn param(&self, name: &str) -> Option<&ArrayD<f32>> {
		self.params.get(name)
	}

	/// The unqualified port keys this layer exposes.
	pub fn ports(&self) -> SmallVec<[&'static str; 2]> {
		self.instance.ports()
	}

	pub fn instance(&self) -> &dyn LayerInstance {
		&*self.instance
	}

	/// A parameter viewed as a matrix.
	///
	/// # Panics
	/// Panics if the parameter is absent or not 2-d; both indicate a layer-form bug.
	pub fn param2(&self, name: &str) -> ArrayView2<f32> {
		self.required_param(name)
			.view()
			.into_dimensionality::<Ix2>()
			.unwrap_or_else(|_| panic!("Lamina Bug: parameter '{}' of layer '{}' is not a matrix", name, self.name))
	}

	/// A parameter viewed as a vector.
	///
	/// # Panics
	/// Panics if the parameter is absent or not 1-d; both indicate a layer-form bug.
	pub fn param1(&self, name: &str) -> ArrayView1<f32> {
		self.required_param(name)
			.view()
			.into_dimensionality::<Ix1>()
			.unwrap_or_else(|_| panic!("Lamina Bug: parameter '{}' of layer '{}' is not a vector", name, self.name))
	}

	fn required_param(&self, name: &str) -> &ArrayD<f32> {
		self.params
			.get(name)
			.unwrap_or_else(|| panic!("Lamina Bug: layer '{}' has no parameter '{}'", self.name, name))
	}
}

impl Display for Layer {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		write!(f, "{}: {}({}), size {}", self.name, self.form, self.activation, self.size)?;
		if !self.inputs.is_empty() {
			write!(f, " <- [{}]", self.inputs.keys().join(", "))?;
		}
		Ok(())
	}
}

/// An ordered, immutable stack of layers with derived name indexes.
#[derive(Debug)]
pub struct LayerGraph {
	layers: Vec<Layer>,
	names: IndexMap<String, usize>,
	ports: IndexMap<String, (usize, &'static str)>,
	params: IndexMap<String, (usize, String)>,
	signals: Vec<String>,
}

impl LayerGraph {
	/// Assembles a graph from normalized layer specifications.
	///
	/// The first spec sizes the input layer; later specs default to reading the previous layer's
	/// `out` port. Default names are `in`, `hid1`, .., `out`. Fails fast with a
	/// `ConfigurationError` on the first unresolvable reference, unregistered tag or missing
	/// field; no partial graph is ever returned.
	pub fn build(specs: Vec<LayerSpec>) -> Result<LayerGraph, ConfigurationError> {
		if specs.len() < 2 {
			return Err(ConfigurationError::TooFewLayers { count: specs.len() });
		}
		let count = specs.len();
		let mut graph = LayerGraph {
			layers: Vec::with_capacity(count),
			names: IndexMap::with_capacity(count),
			ports: IndexMap::new(),
			params: IndexMap::new(),
			signals: Vec::new(),
		};
		let mut claimed: Vec<usize> = Vec::new();

		for (position, spec) in specs.iter().enumerate() {
			let form = if position == 0 {
				"input"
			} else {
				spec.form_tag().unwrap_or("feedforward")
			};
			let constructor = layers::form_constructor(form).ok_or_else(|| ConfigurationError::UnregisteredForm {
				tag: form.to_string(),
			})?;

			let name = match spec.name_tag() {
				Some(name) => name.to_string(),
				None => default_name(position, count),
			};
			if graph.names.contains_key(&name) {
				return Err(ConfigurationError::DuplicateLayerName { name });
			}

			let inputs = if position == 0 {
				if spec.declared_inputs().is_some() {
					return Err(format!("the input layer '{}' reads the raw batch and cannot declare inputs", name).into());
				}
				IndexMap::new()
			} else {
				graph.resolve_inputs(&name, spec)?
			};

			let partner = if form == "tied" {
				Some(graph.resolve_partner(&name, &claimed)?)
			} else {
				None
			};

			// a tied layer with no activation of its own borrows its partner's
			let activation = match (spec.activation_tag(), partner) {
				(Some(tag), _) => tag.to_string(),
				(None, Some(partner_index)) => graph.layers[partner_index].activation().to_string(),
				(None, None) => "linear".to_string(),
			};
			let act = activ::lookup(&activation).ok_or_else(|| ConfigurationError::UnknownActivation {
				name: activation.clone(),
				layer: name.clone(),
			})?;

			let size = match partner {
				Some(partner_index) => {
					let partner_layer = &graph.layers[partner_index];
					let expected = partner_layer
						.param("w")
						.expect("Lamina Bug: partner resolved without a weight")
						.shape()[0];
					if let Some(declared) = spec.size() {
						if declared != expected {
							return Err(ConfigurationError::PartnerSizeMismatch {
								layer: name,
								partner: partner_layer.name().to_string(),
								declared,
								expected,
							});
						}
					}
					expected
				}
				None => spec.size().ok_or_else(|| ConfigurationError::MissingSize { layer: name.clone() })?,
			};

			let ctx = FormContext {
				name: &name,
				form,
				size,
				act,
				inputs: &inputs,
				partner: partner.map(|index| &graph.layers[index]),
			};
			let (instance, params) = constructor(&ctx)?;
			if let Some(partner_index) = partner {
				claimed.push(partner_index);
			}

			debug!(
				"built layer '{}': form {}, size {}, reads {:?}",
				name,
				form,
				size,
				inputs.keys().collect::<Vec<_>>()
			);

			let layer = Layer {
				name: name.clone(),
				form: form.to_string(),
				activation,
				size,
				inputs,
				partner,
				params,
				instance,
			};
			let index = graph.layers.len();
			for port in layer.instance.ports() {
				let qualified = format!("{}:{}", name, port);
				graph.ports.insert(qualified.clone(), (index, port));
				graph.signals.push(qualified);
			}
			for key in layer.params.keys() {
				let qualified = format!("{}.{}", name, key);
				graph.params.insert(qualified.clone(), (index, key.clone()));
				graph.signals.push(qualified);
			}
			graph.names.insert(name, index);
			graph.layers.push(layer);
		}
		Ok(graph)
	}

	pub fn layers(&self) -> &[Layer] {
		&self.layers
	}

	pub fn layer(&self, name: &str) -> Option<&Layer> {
		self.names.get(name).map(|&index| &self.layers[index])
	}

	/// The mirrored layer of a tied layer.
	pub fn partner_of(&self, layer: &Layer) -> Option<&Layer> {
		layer.partner.map(|index| &self.layers[index])
	}

	/// Total count of ports exposed across all layers.
	///
	/// This is a structural property of the graph: a forward pass returns exactly this many
	/// signals regardless of batch contents.
	pub fn port_count(&self) -> usize {
		self.ports.len()
	}

	/// Every monitorable signal name, in a stable order: per layer in construction order, its
	/// ports then its parameters, each in declaration order.
	pub fn signal_names(&self) -> &[String] {
		&self.signals
	}

	/// Looks a parameter up by its qualified name, e.g. `"hid1.w"`.
	pub fn find_param(&self, name: &str) -> Option<&ArrayD<f32>> {
		let (index, key) = self.params.get(name)?;
		self.layers[*index].param(key)
	}

	/// Qualified names of every parameter, in signal order.
	pub fn param_names(&self) -> Vec<&str> {
		self.params.keys().map(String::as_str).collect()
	}

	/// Total count of scalar parameters owned by the graph's layers.
	pub fn num_params(&self) -> usize {
		self.layers.iter().flat_map(|layer| layer.params.values()).map(ArrayD::len).sum()
	}

	/// Qualified name of the final layer's primary output, e.g. `"out:out"`.
	pub fn output_port(&self) -> String {
		let last = self.layers.last().expect("Lamina Bug: graph built with no layers");
		format!("{}:out", last.name())
	}

	/// Resolves a declared input map against the ports of already-built layers.
	fn resolve_inputs(&self, layer_name: &str, spec: &LayerSpec) -> Result<IndexMap<String, usize>, ConfigurationError> {
		match spec.declared_inputs() {
			None => {
				let previous = self.layers.last().expect("Lamina Bug: no previous layer to read from");
				Ok(indexmap![format!("{}:out", previous.name()) => previous.size()])
			}
			Some(declared) => {
				let mut inputs = IndexMap::with_capacity(declared.len());
				for (port, &expected) in declared {
					// a bare layer name is shorthand for that layer's "out" port
					let qualified = if port.contains(':') {
						port.clone()
					} else {
						format!("{}:out", port)
					};
					let (producer_index, _key) =
						self.ports.get(&qualified).ok_or_else(|| ConfigurationError::UnresolvedInput {
							layer: layer_name.to_string(),
							port: port.clone(),
							known: IterDisplay {
								inner: self.ports.keys().cloned().collect(),
							},
						})?;
					let actual = self.layers[*producer_index].size();
					if expected != actual {
						return Err(ConfigurationError::InputSizeMismatch {
							layer: layer_name.to_string(),
							port: qualified,
							expected,
							actual,
						});
					}
					inputs.insert(qualified, expected);
				}
				Ok(inputs)
			}
		}
	}

	/// Picks the layer a tied layer mirrors: the nearest preceding layer, scanning backward,
	/// that owns a plain weight matrix, is not itself tied, and has not been claimed by another
	/// tied layer. Stacked tied layers therefore mirror an encoder stack inside-out.
	fn resolve_partner(&self, layer_name: &str, claimed: &[usize]) -> Result<usize, ConfigurationError> {
		for (index, candidate) in self.layers.iter().enumerate().rev() {
			if candidate.form == "tied" || claimed.contains(&index) || candidate.param("w").is_none() {
				continue;
			}
			return Ok(index);
		}
		Err(ConfigurationError::NoPartner {
			layer: layer_name.to_string(),
		})
	}
}

impl Display for LayerGraph {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		for layer in &self.layers {
			writeln!(f, "{}", layer)?;
		}
		Ok(())
	}
}

fn default_name(position: usize, count: usize) -> String {
	if position == 0 {
		"in".to_string()
	} else if position + 1 == count {
		"out".to_string()
	} else {
		format!("hid{}", position)
	}
}

#[cfg(test)]
mod tests {
	use super::LayerGraph;
	use crate::{errors::ConfigurationError, spec::LayerSpec};

	fn build<I: IntoIterator<Item = LayerSpec>>(specs: I) -> Result<LayerGraph, ConfigurationError> {
		LayerGraph::build(specs.into_iter().collect())
	}

	#[test]
	fn default_names() {
		let graph = build([1.into(), 2.into(), 3.into()]).unwrap();
		assert_eq!(graph.layers().len(), 3);
		let names: Vec<_> = graph.layers().iter().map(|l| l.name()).collect();
		assert_eq!(names, ["in", "hid1", "out"]);

		let graph = build([1.into(), 2.into(), 3.into(), 4.into(), 5.into()]).unwrap();
		let names: Vec<_> = graph.layers().iter().map(|l| l.name()).collect();
		assert_eq!(names, ["in", "hid1", "hid2", "hid3", "out"]);
	}

	#[test]
	fn explicit_name() {
		let graph = build([1.into(), LayerSpec::new(2).name("bottleneck"), 3.into()]).unwrap();
		assert_eq!(graph.layer("bottleneck").unwrap().size(), 2);
		assert!(graph.layer("hid1").is_none());
	}

	#[test]
	fn tuple_specs() {
		let graph = build([1.into(), (2, "relu").into(), 3.into()]).unwrap();
		assert_eq!(graph.layers().len(), 3);
		assert_eq!(graph.layers()[1].activation(), "relu");
		assert_eq!(graph.layers()[1].form(), "feedforward");
	}

	#[test]
	fn dict_specs() {
		let graph = build([1.into(), LayerSpec::new(2).activation("relu").form("rnn"), 3.into()]).unwrap();
		assert_eq!(graph.layers().len(), 3);
		assert_eq!(graph.layers()[1].activation(), "relu");
		assert_eq!(graph.layers()[1].form(), "rnn");
	}

	#[test]
	fn tied_partner() {
		let graph = build([1.into(), 2.into(), (1, "tied").into()]).unwrap();
		assert_eq!(graph.layers().len(), 3);
		let tied = &graph.layers()[2];
		assert_eq!(tied.form(), "tied");
		assert_eq!(tied.partner_index(), Some(1));
		let partner = graph.partner_of(tied).unwrap();
		assert!(std::ptr::eq(partner, &graph.layers()[1]));
		// round trip: the tied layer decodes back to its partner's input width
		assert_eq!(tied.size(), 1);
	}

	#[test]
	fn tied_size_derived() {
		let graph = build([3.into(), 7.into(), LayerSpec::of_form("tied")]).unwrap();
		assert_eq!(graph.layers()[2].size(), 3);
	}

	#[test]
	fn tied_borrows_partner_activation() {
		let graph = build([3.into(), (7, "relu").into(), LayerSpec::of_form("tied")]).unwrap();
		assert_eq!(graph.layers()[2].activation(), "relu");

		let graph = build([3.into(), (7, "relu").into(), LayerSpec::of_form("tied").activation("tanh")]).unwrap();
		assert_eq!(graph.layers()[2].activation(), "tanh");
	}

	#[test]
	fn stacked_tied_mirrors_inside_out() {
		let graph = build([
			4.into(),
			8.into(),
			6.into(),
			LayerSpec::of_form("tied"),
			LayerSpec::of_form("tied"),
		])
		.unwrap();
		let names: Vec<_> = graph.layers().iter().map(|l| l.name()).collect();
		assert_eq!(names, ["in", "hid1", "hid2", "hid3", "out"]);
		assert_eq!(graph.layers()[3].partner_index(), Some(2));
		assert_eq!(graph.layers()[3].size(), 8);
		assert_eq!(graph.layers()[4].partner_index(), Some(1));
		assert_eq!(graph.layers()[4].size(), 4);
	}

	#[test]
	fn signal_index() {
		let graph = build([3.into(), 4.into(), 5.into()]).unwrap();
		assert_eq!(graph.port_count(), 5);
		assert_eq!(
			graph.signal_names(),
			[
				"in:out", "hid1:pre", "hid1:out", "hid1.w", "hid1.b", "out:pre", "out:out", "out.w", "out.b"
			]
		);
		assert_eq!(graph.param_names(), ["hid1.w", "hid1.b", "out.w", "out.b"]);
		assert_eq!(graph.output_port(), "out:out");
	}

	#[test]
	fn param_shapes() {
		let graph = build([3.into(), 4.into(), 5.into()]).unwrap();
		assert_eq!(graph.find_param("hid1.w").unwrap().shape(), [3, 4]);
		assert_eq!(graph.find_param("hid1.b").unwrap().shape(), [4]);
		assert_eq!(graph.find_param("out.w").unwrap().shape(), [4, 5]);
		assert!(graph.find_param("out.hh").is_none());
		assert_eq!(graph.num_params(), 3 * 4 + 4 + 4 * 5 + 5);
	}

	#[test]
	fn decode_inputs_resolved() {
		let graph = build([
			3.into(),
			13.into(),
			14.into(),
			LayerSpec::new(15).input("hid2:out", 14).input("hid1:out", 13),
		])
		.unwrap();
		let decode = graph.layer("out").unwrap();
		let reads: Vec<_> = decode.inputs().keys().collect();
		assert_eq!(reads, ["hid2:out", "hid1:out"]);
		assert!(decode.param("w_hid2:out").is_some());
		assert!(decode.param("w_hid1:out").is_some());
		assert!(decode.param("w").is_none());
	}

	#[test]
	fn bare_layer_name_input() {
		let graph = build([3.into(), 13.into(), LayerSpec::new(15).input("in", 3)]).unwrap();
		let reads: Vec<_> = graph.layer("out").unwrap().inputs().keys().collect();
		assert_eq!(reads, ["in:out"]);
	}

	#[test]
	fn too_few_layers() {
		assert!(matches!(build([1.into()]), Err(ConfigurationError::TooFewLayers { count: 1 })));
		assert!(matches!(build([]), Err(ConfigurationError::TooFewLayers { count: 0 })));
	}

	#[test]
	fn unregistered_form() {
		let err = build([1.into(), LayerSpec::new(2).form("cnn"), 3.into()]).unwrap_err();
		assert!(matches!(err, ConfigurationError::UnregisteredForm { tag } if tag == "cnn"));
	}

	#[test]
	fn unknown_activation() {
		let err = build([1.into(), LayerSpec::new(2).activation("rleu"), 3.into()]).unwrap_err();
		assert!(matches!(err, ConfigurationError::UnknownActivation { name, .. } if name == "rleu"));
	}

	#[test]
	fn duplicate_name() {
		let err = build([1.into(), LayerSpec::new(2).name("in"), 3.into()]).unwrap_err();
		assert!(matches!(err, ConfigurationError::DuplicateLayerName { name } if name == "in"));
	}

	#[test]
	fn missing_size() {
		let err = build([1.into(), LayerSpec::of_form("ff"), 3.into()]).unwrap_err();
		assert!(matches!(err, ConfigurationError::MissingSize { layer } if layer == "hid1"));
	}

	#[test]
	fn unresolved_input() {
		let err = build([1.into(), 2.into(), LayerSpec::new(3).input("hid7:out", 2)]).unwrap_err();
		assert!(matches!(err, ConfigurationError::UnresolvedInput { port, .. } if port == "hid7:out"));
	}

	#[test]
	fn no_forward_references() {
		// reading a port that is only produced later is unresolvable at build time
		let err = build([1.into(), LayerSpec::new(2).input("out:out", 3), 3.into()]).unwrap_err();
		assert!(matches!(err, ConfigurationError::UnresolvedInput { .. }));
	}

	#[test]
	fn input_size_mismatch() {
		let err = build([1.into(), 2.into(), LayerSpec::new(3).input("hid1:out", 9)]).unwrap_err();
		assert!(matches!(
			err,
			ConfigurationError::InputSizeMismatch {
				expected: 9,
				actual: 2,
				..
			}
		));
	}

	#[test]
	fn tied_without_partner() {
		let err = build([1.into(), LayerSpec::of_form("tied")]).unwrap_err();
		assert!(matches!(err, ConfigurationError::NoPartner { layer } if layer == "out"));
	}

	#[test]
	fn tied_size_mismatch() {
		let err = build([1.into(), 2.into(), (5, "tied").into()]).unwrap_err();
		assert!(matches!(
			err,
			ConfigurationError::PartnerSizeMismatch {
				declared: 5,
				expected: 1,
				..
			}
		));
	}

	#[test]
	fn display_lists_layers() {
		let graph = build([1.into(), (2, "relu").into(), 3.into()]).unwrap();
		let rendered = graph.to_string();
		assert!(rendered.contains("in: input(linear), size 1"));
		assert!(rendered.contains("hid1: feedforward(relu), size 2 <- [in:out]"));
		assert!(rendered.contains("out: feedforward(linear), size 3 <- [hid1:out]"));
	}
}
