//! Elementwise activation functions, addressed by tag.

/// An elementwise activation applied to a layer's pre-activation signal.
pub type Activation = fn(f32) -> f32;

/// Look up an activation by tag.
///
/// Returns `None` for unrecognized tags; `LayerGraph::build` turns that into a
/// `ConfigurationError::UnknownActivation`.
pub fn lookup(name: &str) -> Option<Activation> {
	match name {
		"linear" => Some(linear),
		"relu" => Some(relu),
		"logistic" | "sigmoid" => Some(logistic),
		"tanh" => Some(tanh),
		"softplus" => Some(softplus),
		_ => None,
	}
}

pub fn linear(x: f32) -> f32 {
	x
}

pub fn relu(x: f32) -> f32 {
	x.max(0.0)
}

pub fn logistic(x: f32) -> f32 {
	1.0 / (1.0 + (-x).exp())
}

pub fn tanh(x: f32) -> f32 {
	x.tanh()
}

pub fn softplus(x: f32) -> f32 {
	x.exp().ln_1p()
}
