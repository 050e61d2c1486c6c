use crate::util::display::IterDisplay;
use failure::Fail;

/// Fail type returned when assembling a `LayerGraph` from layer specifications.
///
/// Construction is fail-fast: the first error aborts the build and no partial graph is exposed.
#[derive(Debug, Fail)]
pub enum ConfigurationError {
	#[fail(display = "a network needs at least an input and an output layer, got {} spec(s)", count)]
	TooFewLayers { count: usize },

	#[fail(display = "the layer specification for '{}' does not declare a size", layer)]
	MissingSize { layer: String },

	#[fail(display = "no layer form is registered under the tag '{}'", tag)]
	UnregisteredForm { tag: String },

	#[fail(display = "unknown activation '{}' on layer '{}'", name, layer)]
	UnknownActivation { name: String, layer: String },

	#[fail(display = "the layer name '{}' is already taken", name)]
	DuplicateLayerName { name: String },

	#[fail(
		display = "layer '{}' reads from port '{}', which no earlier layer produces; known ports are {}",
		layer, port, known
	)]
	UnresolvedInput {
		layer: String,
		port: String,
		known: IterDisplay<String, Vec<String>>,
	},

	#[fail(
		display = "layer '{}' expects {} columns from port '{}', which produces {}",
		layer, expected, port, actual
	)]
	InputSizeMismatch {
		layer: String,
		port: String,
		expected: usize,
		actual: usize,
	},

	#[fail(display = "layer '{}' of form '{}' takes exactly one input, got {}", layer, form, count)]
	SingleInputForm { layer: String, form: String, count: usize },

	#[fail(display = "tied layer '{}' found no earlier layer left to mirror", layer)]
	NoPartner { layer: String },

	#[fail(
		display = "tied layer '{}' declares size {}, but its partner '{}' reads {} columns",
		layer, declared, partner, expected
	)]
	PartnerSizeMismatch {
		layer: String,
		partner: String,
		declared: usize,
		expected: usize,
	},

	#[fail(display = "{}", desc)]
	Other { desc: String },
}

impl<I: Into<String>> From<I> for ConfigurationError {
	fn from(desc: I) -> Self {
		ConfigurationError::Other { desc: desc.into() }
	}
}

/// Fail type returned when feeding a batch through a `LayerGraph`.
#[derive(Debug, Fail)]
pub enum ExecutionError {
	#[fail(display = "the input batch has {} columns, the input layer expects {}", got, expected)]
	InputWidth { expected: usize, got: usize },

	#[fail(display = "the target batch has {} columns, the output layer produces {}", got, expected)]
	TargetWidth { expected: usize, got: usize },

	#[fail(
		display = "the target batch has {} rows, the input batch has {}",
		target_rows, batch_rows
	)]
	TargetRows { target_rows: usize, batch_rows: usize },
}
