//! The stateless layer kinds: input, dense feedforward, and tied (weight-sharing) layers.

use crate::{
	errors::{ConfigurationError, ExecutionError},
	exec::ForwardContext,
	graph::Layer,
	init,
	layers::{activ::Activation, sole_input, FormContext, LayerInstance},
};
use indexmap::{indexmap, IndexMap};
use ndarray::{Array2, ArrayD, IxDyn};
use smallvec::{smallvec, SmallVec};

/// Name of the weight matrix read from the given port.
///
/// A single-input layer calls its weight plainly `w`; a multi-input layer owns one matrix per
/// port, suffixed with the port name.
pub fn weight_name(inputs: &IndexMap<String, usize>, port: &str) -> String {
	if inputs.len() == 1 {
		"w".to_string()
	} else {
		format!("w_{}", port)
	}
}

/// Constructor bound under the `"input"` tag.
///
/// The input layer owns no parameters and republishes the raw batch.
pub fn build_input(ctx: &FormContext) -> Result<(Box<dyn LayerInstance>, IndexMap<String, ArrayD<f32>>), ConfigurationError> {
	if !ctx.inputs.is_empty() {
		return Err(format!("the input layer '{}' reads the raw batch and cannot declare inputs", ctx.name).into());
	}
	Ok((Box::new(Input), IndexMap::new()))
}

/// Constructor bound under the `"feedforward"` and `"ff"` tags.
pub fn build_feedforward(
	ctx: &FormContext,
) -> Result<(Box<dyn LayerInstance>, IndexMap<String, ArrayD<f32>>), ConfigurationError> {
	let mut params = IndexMap::new();
	for (port, columns_in) in ctx.inputs {
		params.insert(
			weight_name(ctx.inputs, port),
			init::scaled(1.0).array(IxDyn(&[*columns_in, ctx.size])),
		);
	}
	params.insert("b".to_string(), init::duplicate(0.0).array(IxDyn(&[ctx.size])));
	Ok((Box::new(Feedforward { act: ctx.act }), params))
}

/// Constructor bound under the `"tied"` tag.
///
/// A tied layer owns only its bias; its weight is the partner's, transposed, read through the
/// partner handle at forward time.
pub fn build_tied(ctx: &FormContext) -> Result<(Box<dyn LayerInstance>, IndexMap<String, ArrayD<f32>>), ConfigurationError> {
	let (port, columns_in) = sole_input(ctx)?;
	let partner = ctx.partner.expect("Lamina Bug: tied form built without a resolved partner");
	let produced = partner
		.param("w")
		.expect("Lamina Bug: partner resolved without a weight")
		.shape()[1];
	if produced != columns_in {
		return Err(format!(
			"tied layer '{}' reads {} columns from '{}', but its partner '{}' produces {}",
			ctx.name,
			columns_in,
			port,
			partner.name(),
			produced
		)
		.into());
	}
	let params = indexmap!["b".to_string() => init::duplicate(0.0).array(IxDyn(&[ctx.size]))];
	Ok((Box::new(Tied { act: ctx.act }), params))
}

/// Republishes the raw batch as `in:out`, after checking its width.
#[derive(Clone, Debug)]
pub struct Input;

impl LayerInstance for Input {
	fn form(&self) -> &'static str {
		"input"
	}

	fn ports(&self) -> SmallVec<[&'static str; 2]> {
		smallvec!["out"]
	}

	fn transform(&self, layer: &Layer, ctx: &ForwardContext) -> Result<IndexMap<&'static str, Array2<f32>>, ExecutionError> {
		let batch = ctx.batch();
		if batch.ncols() != layer.size() {
			return Err(ExecutionError::InputWidth {
				expected: layer.size(),
				got: batch.ncols(),
			});
		}
		Ok(indexmap!["out" => batch.clone()])
	}
}

/// A dense layer: weighted contributions from each input port are summed, biased, activated.
///
/// Exposes the pre-activation signal as `pre` alongside the activated `out`.
#[derive(Clone, Debug)]
pub struct Feedforward {
	act: Activation,
}

impl LayerInstance for Feedforward {
	fn form(&self) -> &'static str {
		"feedforward"
	}

	fn ports(&self) -> SmallVec<[&'static str; 2]> {
		smallvec!["pre", "out"]
	}

	fn transform(&self, layer: &Layer, ctx: &ForwardContext) -> Result<IndexMap<&'static str, Array2<f32>>, ExecutionError> {
		let rows = ctx.batch().nrows();
		let mut pre = Array2::<f32>::zeros((rows, layer.size()));
		for (port, _columns) in layer.inputs() {
			let x = ctx.signal(port);
			let w = layer.param2(&weight_name(layer.inputs(), port));
			pre += &x.dot(&w);
		}
		pre += &layer.param1("b");
		let out = pre.mapv(self.act);
		Ok(indexmap!["pre" => pre, "out" => out])
	}
}

/// A dense layer that decodes back through its partner's weight matrix, transposed.
#[derive(Clone, Debug)]
pub struct Tied {
	act: Activation,
}

impl LayerInstance for Tied {
	fn form(&self) -> &'static str {
		"tied"
	}

	fn ports(&self) -> SmallVec<[&'static str; 2]> {
		smallvec!["pre", "out"]
	}

	fn transform(&self, layer: &Layer, ctx: &ForwardContext) -> Result<IndexMap<&'static str, Array2<f32>>, ExecutionError> {
		let partner = ctx
			.graph()
			.partner_of(layer)
			.unwrap_or_else(|| panic!("Lamina Bug: tied layer '{}' built without a partner", layer.name()));
		let w = partner.param2("w");
		let (port, _columns) = layer
			.inputs()
			.first()
			.unwrap_or_else(|| panic!("Lamina Bug: tied layer '{}' built without an input", layer.name()));
		let x = ctx.signal(port);
		let mut pre = x.dot(&w.t());
		pre += &layer.param1("b");
		let out = pre.mapv(self.act);
		Ok(indexmap!["pre" => pre, "out" => out])
	}
}
