use ndarray::{ArrayBase, Data, Dimension, Zip};

pub trait RelClose {
	/// Similar to `all_close()` for ArrayBase, however it tests
	/// `(*x - *y).abs() <= tol * y.abs().max(1.0)`
	/// rather than
	/// `(*x - *y).abs() <= tol`
	fn all_relatively_close<S2, E2>(&self, rhs: &ArrayBase<S2, E2>, tol: f32) -> bool
	where
		S2: Data<Elem = f32>,
		E2: Dimension;
}

impl<S1: Data<Elem = f32>, E1: Dimension> RelClose for ArrayBase<S1, E1> {
	fn all_relatively_close<S2, E2>(&self, rhs: &ArrayBase<S2, E2>, tol: f32) -> bool
	where
		S2: Data<Elem = f32>,
		E2: Dimension,
	{
		let mut close = true;
		Zip::from(self)
			.and(rhs.broadcast(self.raw_dim()).expect("Broadcast failed"))
			.for_each(|&x, &y| {
				if (x - y).abs() > tol * y.abs().max(1.0) {
					eprintln!("tolerance failed, found: {:?}, expect within {:?} of {:?}", x, tol, y);
					close = false;
				}
			});
		close
	}
}

#[cfg(test)]
mod tests {
	use super::RelClose;
	use ndarray::arr2;

	#[test]
	fn close_and_not() {
		let a = arr2(&[[1.0f32, 2.0], [3.0, 4.0]]);
		let b = arr2(&[[1.0f32, 2.0], [3.0, 4.001]]);
		assert!(a.all_relatively_close(&a, 0.0));
		assert!(a.all_relatively_close(&b, 1e-2));
		assert!(!a.all_relatively_close(&b, 1e-6));
	}
}
