//! Layer kinds (`LayerInstance` implementations) and the form registry that maps tag strings to
//! layer constructors.
//!
//! A layer form is selected once at graph-build time: `LayerGraph::build` looks the spec's form
//! tag up in the registry and calls the bound constructor, which returns the behavioural
//! `LayerInstance` together with the freshly initialised parameters the layer owns. The registry
//! is open; `register_form` binds new tags at runtime.

pub mod activ;
pub mod feedforward;
pub mod recurrent;

use crate::{
	errors::{ConfigurationError, ExecutionError},
	exec::ForwardContext,
	graph::Layer,
	layers::activ::Activation,
};
use indexmap::IndexMap;
use lazy_static::lazy_static;
use ndarray::{Array2, ArrayD};
use parking_lot::Mutex;
use smallvec::SmallVec;
use std::fmt::Debug;

/// The behaviour of a built layer.
///
/// An instance should not hold internal state; everything mutable lives in the per-call
/// `ForwardContext`, so a `LayerGraph` can be shared read-only across repeated and concurrent
/// forward passes. Instances read their parameters through the `Layer` they are passed.
pub trait LayerInstance: Debug + Send + Sync {
	/// The registry tag this instance was built under.
	fn form(&self) -> &'static str;

	/// The output ports this layer exposes, in declaration order.
	///
	/// Every port is published on every forward pass, qualified as `"{layer}:{port}"`.
	fn ports(&self) -> SmallVec<[&'static str; 2]>;

	/// Computes this layer's output signals from already-computed inputs.
	///
	/// Must return one entry per port in `ports()`.
	fn transform(&self, layer: &Layer, ctx: &ForwardContext) -> Result<IndexMap<&'static str, Array2<f32>>, ExecutionError>;

	/// State-slot descriptors for layers that carry values across calls; empty for stateless
	/// layers.
	fn updates(&self, _layer: &Layer) -> Vec<Update> {
		Vec::new()
	}
}

/// Describes one piece of internal running state a layer carries, along with its initial value.
#[derive(Clone, Debug)]
pub struct Update {
	pub name: String,
	pub init: ArrayD<f32>,
}

/// Everything a form constructor may need from the builder: resolved name, size, activation,
/// input ports, and (for weight-sharing forms) the partner layer.
pub struct FormContext<'a> {
	pub name: &'a str,
	pub form: &'a str,
	pub size: usize,
	pub act: Activation,
	pub inputs: &'a IndexMap<String, usize>,
	pub partner: Option<&'a Layer>,
}

/// Constructs a `LayerInstance` and its owned parameters from a `FormContext`.
pub type FormConstructor =
	fn(&FormContext) -> Result<(Box<dyn LayerInstance>, IndexMap<String, ArrayD<f32>>), ConfigurationError>;

lazy_static! {
	static ref FORMS: Mutex<IndexMap<String, FormConstructor>> = Mutex::new({
		let mut forms: IndexMap<String, FormConstructor> = IndexMap::new();
		forms.insert("input".to_string(), feedforward::build_input as FormConstructor);
		forms.insert("feedforward".to_string(), feedforward::build_feedforward as FormConstructor);
		forms.insert("ff".to_string(), feedforward::build_feedforward as FormConstructor);
		forms.insert("tied".to_string(), feedforward::build_tied as FormConstructor);
		forms.insert("rnn".to_string(), recurrent::build_rnn as FormConstructor);
		forms.insert("lstm".to_string(), recurrent::build_lstm as FormConstructor);
		forms
	});
}

/// Binds a form tag to a constructor, replacing any previous binding.
pub fn register_form<S: Into<String>>(tag: S, constructor: FormConstructor) {
	FORMS.lock().insert(tag.into(), constructor);
}

/// Whether a constructor is bound under the tag.
pub fn form_registered(tag: &str) -> bool {
	FORMS.lock().contains_key(tag)
}

pub(crate) fn form_constructor(tag: &str) -> Option<FormConstructor> {
	FORMS.lock().get(tag).copied()
}

/// The single input port of a one-input form, or a `SingleInputForm` error.
pub fn sole_input<'a>(ctx: &'a FormContext) -> Result<(&'a str, usize), ConfigurationError> {
	if ctx.inputs.len() != 1 {
		return Err(ConfigurationError::SingleInputForm {
			layer: ctx.name.to_string(),
			form: ctx.form.to_string(),
			count: ctx.inputs.len(),
		});
	}
	let (port, size) = ctx.inputs.iter().next().expect("Lamina Bug: input count checked above");
	Ok((port.as_str(), *size))
}

#[cfg(test)]
mod tests {
	use super::{feedforward, form_registered, register_form, FormConstructor};

	#[test]
	fn default_forms() {
		for tag in &["input", "feedforward", "ff", "tied", "rnn", "lstm"] {
			assert!(form_registered(tag), "'{}' should be registered", tag);
		}
		assert!(!form_registered("feedfoward"));
	}

	#[test]
	fn register_new_form() {
		assert!(!form_registered("copy"));
		register_form("copy", feedforward::build_feedforward as FormConstructor);
		assert!(form_registered("copy"));
	}
}
