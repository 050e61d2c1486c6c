//! A small deterministic stand-in for a digits image dataset.
//!
//! Values are drawn from a seeded pcg stream, so every test run sees the same batch without
//! shipping data files.

use ndarray::Array2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64Mcg;

pub const NUM_DIGITS: usize = 100;
pub const DIGIT_SIZE: usize = 64;

/// A fixed batch of `NUM_DIGITS` flattened pseudo-images, `DIGIT_SIZE` columns each, in [0, 1).
pub struct Digits {
	pub images: Array2<f32>,
}

impl Digits {
	pub fn new() -> Self {
		let mut rng = Pcg64Mcg::seed_from_u64(0x1a31);
		Digits {
			images: Array2::from_shape_fn((NUM_DIGITS, DIGIT_SIZE), |_| rng.gen::<f32>()),
		}
	}

	/// A matching deterministic target batch with the given column count.
	pub fn targets(&self, width: usize) -> Array2<f32> {
		let mut rng = Pcg64Mcg::seed_from_u64(0x7e15);
		Array2::from_shape_fn((NUM_DIGITS, width), |_| rng.gen::<f32>())
	}
}

impl Default for Digits {
	fn default() -> Self {
		Digits::new()
	}
}
