//! The recurrent layer kinds: plain rnn and lstm.
//!
//! Recurrence advances along the rows of a batch; row `t` reads the state left behind by row
//! `t - 1`. The state slots themselves surface through `updates()`.

use crate::{
	errors::{ConfigurationError, ExecutionError},
	exec::ForwardContext,
	graph::Layer,
	init,
	layers::{
		activ::{logistic, tanh, Activation},
		sole_input, FormContext, LayerInstance, Update,
	},
};
use indexmap::{indexmap, IndexMap};
use ndarray::{s, Array1, Array2, ArrayD, IxDyn};
use smallvec::{smallvec, SmallVec};

/// Constructor bound under the `"rnn"` tag.
pub fn build_rnn(ctx: &FormContext) -> Result<(Box<dyn LayerInstance>, IndexMap<String, ArrayD<f32>>), ConfigurationError> {
	let (_port, columns_in) = sole_input(ctx)?;
	let params = indexmap![
		"w".to_string() => init::scaled(1.0).array(IxDyn(&[columns_in, ctx.size])),
		"hh".to_string() => init::scaled(1.0).array(IxDyn(&[ctx.size, ctx.size])),
		"b".to_string() => init::duplicate(0.0).array(IxDyn(&[ctx.size])),
	];
	Ok((Box::new(Rnn { act: ctx.act }), params))
}

/// Constructor bound under the `"lstm"` tag.
///
/// Gate order along the widened parameter axis is input, forget, output, candidate.
pub fn build_lstm(ctx: &FormContext) -> Result<(Box<dyn LayerInstance>, IndexMap<String, ArrayD<f32>>), ConfigurationError> {
	let (_port, columns_in) = sole_input(ctx)?;
	let params = indexmap![
		"w".to_string() => init::scaled(1.0).array(IxDyn(&[columns_in, 4 * ctx.size])),
		"hh".to_string() => init::scaled(1.0).array(IxDyn(&[ctx.size, 4 * ctx.size])),
		"b".to_string() => init::duplicate(0.0).array(IxDyn(&[4 * ctx.size])),
	];
	Ok((Box::new(Lstm), params))
}

/// Elman-style recurrence: `h_t = act(x_t w + h_{t-1} hh + b)`.
#[derive(Clone, Debug)]
pub struct Rnn {
	act: Activation,
}

impl LayerInstance for Rnn {
	fn form(&self) -> &'static str {
		"rnn"
	}

	fn ports(&self) -> SmallVec<[&'static str; 2]> {
		smallvec!["pre", "out"]
	}

	fn transform(&self, layer: &Layer, ctx: &ForwardContext) -> Result<IndexMap<&'static str, Array2<f32>>, ExecutionError> {
		let (port, _columns) = layer
			.inputs()
			.first()
			.unwrap_or_else(|| panic!("Lamina Bug: rnn layer '{}' built without an input", layer.name()));
		let x = ctx.signal(port);
		let w = layer.param2("w");
		let hh = layer.param2("hh");
		let b = layer.param1("b");

		let mut pre = Array2::<f32>::zeros((x.nrows(), layer.size()));
		let mut out = Array2::<f32>::zeros((x.nrows(), layer.size()));
		let mut h = Array1::<f32>::zeros(layer.size());
		for (t, row) in x.outer_iter().enumerate() {
			let z = row.dot(&w) + h.dot(&hh) + &b;
			h = z.mapv(self.act);
			pre.row_mut(t).assign(&z);
			out.row_mut(t).assign(&h);
		}
		Ok(indexmap!["pre" => pre, "out" => out])
	}

	fn updates(&self, layer: &Layer) -> Vec<Update> {
		vec![Update {
			name: format!("{}.h", layer.name()),
			init: ArrayD::zeros(IxDyn(&[layer.size()])),
		}]
	}
}

/// Standard lstm cell; the cell state is exposed as the `cell` port.
#[derive(Clone, Debug)]
pub struct Lstm;

impl LayerInstance for Lstm {
	fn form(&self) -> &'static str {
		"lstm"
	}

	fn ports(&self) -> SmallVec<[&'static str; 2]> {
		smallvec!["cell", "out"]
	}

	fn transform(&self, layer: &Layer, ctx: &ForwardContext) -> Result<IndexMap<&'static str, Array2<f32>>, ExecutionError> {
		let (port, _columns) = layer
			.inputs()
			.first()
			.unwrap_or_else(|| panic!("Lamina Bug: lstm layer '{}' built without an input", layer.name()));
		let x = ctx.signal(port);
		let w = layer.param2("w");
		let hh = layer.param2("hh");
		let b = layer.param1("b");
		let size = layer.size();

		let mut cell = Array2::<f32>::zeros((x.nrows(), size));
		let mut out = Array2::<f32>::zeros((x.nrows(), size));
		let mut h = Array1::<f32>::zeros(size);
		let mut c = Array1::<f32>::zeros(size);
		for (t, row) in x.outer_iter().enumerate() {
			let z = row.dot(&w) + h.dot(&hh) + &b;
			let input_gate = z.slice(s![0..size]).mapv(logistic);
			let forget_gate = z.slice(s![size..2 * size]).mapv(logistic);
			let output_gate = z.slice(s![2 * size..3 * size]).mapv(logistic);
			let candidate = z.slice(s![3 * size..4 * size]).mapv(tanh);
			c = &forget_gate * &c + &input_gate * &candidate;
			h = &output_gate * &c.mapv(tanh);
			cell.row_mut(t).assign(&c);
			out.row_mut(t).assign(&h);
		}
		Ok(indexmap!["cell" => cell, "out" => out])
	}

	fn updates(&self, layer: &Layer) -> Vec<Update> {
		vec![
			Update {
				name: format!("{}.h", layer.name()),
				init: ArrayD::zeros(IxDyn(&[layer.size()])),
			},
			Update {
				name: format!("{}.c", layer.name()),
				init: ArrayD::zeros(IxDyn(&[layer.size()])),
			},
		]
	}
}
