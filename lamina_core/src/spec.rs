//! Layer specifications: the shorthand forms a network is declared with.
//!
//! A network is declared as an ordered sequence of `LayerSpec`s, one per layer. The shorthand
//! conversions mirror the ways a layer can be written down:
//!
//! ```rust
//! # use lamina_core::spec::LayerSpec;
//! let bare: LayerSpec = 10.into(); // size only, everything defaulted
//! let pair: LayerSpec = (10, "relu").into(); // size plus an activation (or form) tag
//! let full = LayerSpec::new(10).activation("relu").form("rnn").name("encode");
//! ```
//!
//! In the pair form the tag selects a layer form when one is registered under that string, and an
//! activation otherwise, so `(10, "tied")` picks the tied form while `(10, "relu")` picks relu.

use crate::layers::form_registered;
use indexmap::IndexMap;

/// A normalized layer declaration, consumed by `LayerGraph::build`.
///
/// Everything except `size` is optional; `size` itself may be omitted only for forms that borrow
/// it from elsewhere (a tied layer takes its partner's input size).
#[derive(Clone, Debug)]
pub struct LayerSpec {
	size: Option<usize>,
	activation: Option<String>,
	form: Option<String>,
	name: Option<String>,
	inputs: Option<IndexMap<String, usize>>,
}

impl LayerSpec {
	/// A spec with the given size and every other field defaulted.
	pub fn new(size: usize) -> Self {
		LayerSpec {
			size: Some(size),
			activation: None,
			form: None,
			name: None,
			inputs: None,
		}
	}

	/// A spec with only a form tag, for forms that derive their own size.
	pub fn of_form<S: Into<String>>(form: S) -> Self {
		LayerSpec {
			size: None,
			activation: None,
			form: Some(form.into()),
			name: None,
			inputs: None,
		}
	}

	/// Sets the activation tag. Default: "linear".
	pub fn activation<S: Into<String>>(mut self, activation: S) -> Self {
		self.activation = Some(activation.into());
		self
	}

	/// Sets the form tag. Default: "feedforward".
	pub fn form<S: Into<String>>(mut self, form: S) -> Self {
		self.form = Some(form.into());
		self
	}

	/// Overrides the default positional layer name (`in`, `hid1`, .., `out`).
	pub fn name<S: Into<String>>(mut self, name: S) -> Self {
		self.name = Some(name.into());
		self
	}

	/// Declares an input port along with the column count expected from it.
	///
	/// May be called repeatedly; declaration order is preserved. A bare layer name is shorthand
	/// for that layer's `out` port. Without any declared inputs a layer reads the immediately
	/// preceding layer's `out` port.
	pub fn input<S: Into<String>>(mut self, port: S, size: usize) -> Self {
		self.inputs
			.get_or_insert_with(IndexMap::new)
			.insert(port.into(), size);
		self
	}

	pub fn size(&self) -> Option<usize> {
		self.size
	}

	pub fn activation_tag(&self) -> Option<&str> {
		self.activation.as_deref()
	}

	pub fn form_tag(&self) -> Option<&str> {
		self.form.as_deref()
	}

	pub fn name_tag(&self) -> Option<&str> {
		self.name.as_deref()
	}

	pub fn declared_inputs(&self) -> Option<&IndexMap<String, usize>> {
		self.inputs.as_ref()
	}
}

impl From<usize> for LayerSpec {
	fn from(size: usize) -> Self {
		LayerSpec::new(size)
	}
}

impl From<(usize, &str)> for LayerSpec {
	fn from((size, tag): (usize, &str)) -> Self {
		if form_registered(tag) {
			LayerSpec::new(size).form(tag)
		} else {
			LayerSpec::new(size).activation(tag)
		}
	}
}

impl From<(usize, String)> for LayerSpec {
	fn from((size, tag): (usize, String)) -> Self {
		(size, tag.as_str()).into()
	}
}

impl From<&LayerSpec> for LayerSpec {
	fn from(s: &Self) -> Self {
		s.clone()
	}
}

#[cfg(test)]
mod tests {
	use super::LayerSpec;
	use indexmap::indexmap;

	#[test]
	fn bare_size() {
		let spec: LayerSpec = 13.into();
		assert_eq!(spec.size(), Some(13));
		assert_eq!(spec.activation_tag(), None);
		assert_eq!(spec.form_tag(), None);
		assert_eq!(spec.name_tag(), None);
		assert!(spec.declared_inputs().is_none());
	}

	#[test]
	fn pair_with_activation_tag() {
		let spec: LayerSpec = (13, "relu").into();
		assert_eq!(spec.size(), Some(13));
		assert_eq!(spec.activation_tag(), Some("relu"));
		assert_eq!(spec.form_tag(), None);
	}

	#[test]
	fn pair_with_form_tag() {
		let spec: LayerSpec = (13, "tied").into();
		assert_eq!(spec.size(), Some(13));
		assert_eq!(spec.activation_tag(), None);
		assert_eq!(spec.form_tag(), Some("tied"));

		let spec: LayerSpec = (13, "rnn").into();
		assert_eq!(spec.form_tag(), Some("rnn"));
	}

	#[test]
	fn builder_form() {
		let spec = LayerSpec::new(15)
			.activation("relu")
			.form("rnn")
			.name("encode")
			.input("hid1:out", 13)
			.input("hid2", 14);
		assert_eq!(spec.size(), Some(15));
		assert_eq!(spec.activation_tag(), Some("relu"));
		assert_eq!(spec.form_tag(), Some("rnn"));
		assert_eq!(spec.name_tag(), Some("encode"));
		assert_eq!(
			spec.declared_inputs(),
			Some(&indexmap!["hid1:out".to_string() => 13, "hid2".to_string() => 14])
		);
	}

	#[test]
	fn sizeless_form() {
		let spec = LayerSpec::of_form("tied");
		assert_eq!(spec.size(), None);
		assert_eq!(spec.form_tag(), Some("tied"));
	}
}
