use std::fmt::{Debug, Display, Formatter, Result};

/// Wrapper type to impl display for iterable types for use with Failure
///
/// `vec!["a", "b", "c"]` should display as `[a, b, c]`.
pub struct IterDisplay<T, I>
where
	for<'a> &'a I: IntoIterator<Item = &'a T>,
	T: Display,
{
	pub inner: I,
}

impl<T, I> Display for IterDisplay<T, I>
where
	for<'a> &'a I: IntoIterator<Item = &'a T>,
	T: Display,
{
	fn fmt(&self, f: &mut Formatter) -> Result {
		let mut inner = self.inner.into_iter();
		write!(f, "[")?;
		if let Some(d) = inner.next() {
			write!(f, "{}", d)?;
			for d in inner {
				write!(f, ", {}", d)?;
			}
		}
		write!(f, "]")?;
		Ok(())
	}
}

impl<T, I> Debug for IterDisplay<T, I>
where
	for<'a> &'a I: IntoIterator<Item = &'a T>,
	T: Display,
{
	fn fmt(&self, fmt: &mut Formatter) -> Result {
		Display::fmt(self, fmt)
	}
}
