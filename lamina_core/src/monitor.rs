//! Monitor resolution: turning name patterns into an ordered list of labelled scalar diagnostics.
//!
//! A monitor specification is an ordered sequence of `(pattern, MonitorSpec)` pairs. Each pattern
//! is matched against every signal name the graph registers (ports and parameters, in graph
//! order); `*` and `?` carry their usual glob meaning. A pattern that matches nothing contributes
//! nothing — that is a supported way of writing speculative monitors, not an error. The resolved
//! list always leads with the `err` monitor, the network's primary error metric.

use crate::graph::LayerGraph;
use ndarray::ArrayViewD;
use std::{
	collections::BTreeMap,
	fmt::{self, Debug},
	sync::Arc,
};

/// A user-supplied reducer turning one signal into one scalar.
pub type MonitorFn = Arc<dyn Fn(ArrayViewD<f32>) -> f32 + Send + Sync>;

/// What to compute for every signal a pattern matches.
///
/// The three shapes differ in how many monitors they emit per matched signal and in label
/// ordering: `Levels` preserves declaration order, `Named` enumerates alphabetically (which is
/// what `BTreeMap` iteration gives).
pub enum MonitorSpec {
	/// One monitor, labelled `"{name}<{level}"`: the fraction of the signal below the level.
	Level(f32),
	/// One monitor per level, in declaration order.
	Levels(Vec<f32>),
	/// One monitor per entry, labelled `"{name}:{key}"`, in key order.
	Named(BTreeMap<String, MonitorFn>),
}

impl MonitorSpec {
	/// A `Named` spec from `(key, reducer)` pairs.
	pub fn named<S, F, I>(entries: I) -> MonitorSpec
	where
		S: Into<String>,
		F: Fn(ArrayViewD<f32>) -> f32 + Send + Sync + 'static,
		I: IntoIterator<Item = (S, F)>,
	{
		MonitorSpec::Named(
			entries
				.into_iter()
				.map(|(key, func)| (key.into(), Arc::new(func) as MonitorFn))
				.collect(),
		)
	}
}

impl Debug for MonitorSpec {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		match self {
			MonitorSpec::Level(level) => f.debug_tuple("Level").field(level).finish(),
			MonitorSpec::Levels(levels) => f.debug_tuple("Levels").field(levels).finish(),
			MonitorSpec::Named(entries) => f
				.debug_tuple("Named")
				.field(&entries.keys().collect::<Vec<_>>())
				.finish(),
		}
	}
}

impl From<f32> for MonitorSpec {
	fn from(level: f32) -> Self {
		MonitorSpec::Level(level)
	}
}

impl From<i32> for MonitorSpec {
	fn from(level: i32) -> Self {
		MonitorSpec::Level(level as f32)
	}
}

impl From<Vec<f32>> for MonitorSpec {
	fn from(levels: Vec<f32>) -> Self {
		MonitorSpec::Levels(levels)
	}
}

impl From<Vec<i32>> for MonitorSpec {
	fn from(levels: Vec<i32>) -> Self {
		MonitorSpec::Levels(levels.into_iter().map(|level| level as f32).collect())
	}
}

impl From<BTreeMap<String, MonitorFn>> for MonitorSpec {
	fn from(entries: BTreeMap<String, MonitorFn>) -> Self {
		MonitorSpec::Named(entries)
	}
}

/// How a resolved monitor's value is computed against one batch.
#[derive(Clone)]
pub enum MonitorValue {
	/// The network's primary error metric.
	Err,
	/// Fraction of the signal's elements below the level.
	Below { signal: String, level: f32 },
	/// A user reducer applied to the signal.
	Apply { signal: String, func: MonitorFn },
}

impl Debug for MonitorValue {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		match self {
			MonitorValue::Err => write!(f, "Err"),
			MonitorValue::Below { signal, level } => write!(f, "Below({} < {})", signal, level),
			MonitorValue::Apply { signal, .. } => write!(f, "Apply({})", signal),
		}
	}
}

/// A labelled scalar diagnostic, resolved against a concrete signal.
#[derive(Clone, Debug)]
pub struct Monitor {
	pub label: String,
	pub value: MonitorValue,
}

/// Resolves monitor specifications against a graph's signal names.
///
/// Output order: `err` first, then one group per matched signal in signal-index order per
/// pattern, with the spec's own sub-ordering inside each group.
pub fn resolve(graph: &LayerGraph, specs: &[(String, MonitorSpec)]) -> Vec<Monitor> {
	let mut monitors = vec![Monitor {
		label: "err".to_string(),
		value: MonitorValue::Err,
	}];
	for (pattern, spec) in specs {
		for name in graph.signal_names() {
			if !glob_match(pattern, name) {
				continue;
			}
			match spec {
				MonitorSpec::Level(level) => monitors.push(below(name, *level)),
				MonitorSpec::Levels(levels) => {
					for level in levels {
						monitors.push(below(name, *level));
					}
				}
				MonitorSpec::Named(entries) => {
					for (key, func) in entries {
						monitors.push(Monitor {
							label: format!("{}:{}", name, key),
							value: MonitorValue::Apply {
								signal: name.clone(),
								func: func.clone(),
							},
						});
					}
				}
			}
		}
	}
	monitors
}

fn below(name: &str, level: f32) -> Monitor {
	Monitor {
		label: format!("{}<{}", name, level),
		value: MonitorValue::Below {
			signal: name.to_string(),
			level,
		},
	}
}

/// Anchored glob match: `*` is zero or more of any character, `?` exactly one.
pub fn glob_match(pattern: &str, name: &str) -> bool {
	let pattern: Vec<char> = pattern.chars().collect();
	let name: Vec<char> = name.chars().collect();
	let mut p = 0;
	let mut n = 0;
	let mut backtrack: Option<(usize, usize)> = None;
	while n < name.len() {
		if p < pattern.len() && (pattern[p] == '?' || pattern[p] == name[n]) {
			p += 1;
			n += 1;
		} else if p < pattern.len() && pattern[p] == '*' {
			backtrack = Some((p + 1, n));
			p += 1;
		} else if let Some((star_p, star_n)) = backtrack {
			p = star_p;
			n = star_n + 1;
			backtrack = Some((star_p, star_n + 1));
		} else {
			return false;
		}
	}
	while p < pattern.len() && pattern[p] == '*' {
		p += 1;
	}
	p == pattern.len()
}

#[cfg(test)]
mod tests {
	use super::{glob_match, resolve, MonitorSpec};
	use crate::graph::LayerGraph;
	use ndarray::ArrayViewD;

	fn labels(specs: Vec<(&str, MonitorSpec)>) -> Vec<String> {
		let graph = LayerGraph::build(vec![8.into(), 15.into(), 14.into(), 13.into()]).unwrap();
		let specs: Vec<(String, MonitorSpec)> = specs.into_iter().map(|(p, s)| (p.to_string(), s)).collect();
		resolve(&graph, &specs).into_iter().map(|m| m.label).collect()
	}

	#[test]
	fn scalar_spec() {
		assert_eq!(labels(vec![("hid1:out", 1.into())]), ["err", "hid1:out<1"]);
	}

	#[test]
	fn list_of_levels_preserves_order() {
		assert_eq!(
			labels(vec![("hid1:out", vec![2, 1].into())]),
			["err", "hid1:out<2", "hid1:out<1"]
		);
	}

	#[test]
	fn named_entries_sorted() {
		fn plus_one(v: ArrayViewD<f32>) -> f32 {
			v.sum() + 1.0
		}
		fn plus_two(v: ArrayViewD<f32>) -> f32 {
			v.sum() + 2.0
		}
		let spec = MonitorSpec::named(vec![
			("b", plus_two as fn(ArrayViewD<f32>) -> f32),
			("a", plus_one as fn(ArrayViewD<f32>) -> f32),
		]);
		assert_eq!(labels(vec![("hid1:out", spec)]), ["err", "hid1:out:a", "hid1:out:b"]);
	}

	#[test]
	fn unmatched_pattern_is_silent() {
		assert_eq!(labels(vec![("hid10:out", 1.into())]), ["err"]);
	}

	#[test]
	fn param_pattern() {
		assert_eq!(labels(vec![("hid1.w", 1.into())]), ["err", "hid1.w<1"]);
	}

	#[test]
	fn wildcard_patterns() {
		assert_eq!(
			labels(vec![("*.w", 1.into())]),
			["err", "hid1.w<1", "hid2.w<1", "out.w<1"]
		);
		assert_eq!(labels(vec![("hid?.w", 1.into())]), ["err", "hid1.w<1", "hid2.w<1"]);
	}

	#[test]
	fn pattern_order_preserved() {
		assert_eq!(
			labels(vec![("hid2:out", 1.into()), ("hid1:out", 1.into())]),
			["err", "hid2:out<1", "hid1:out<1"]
		);
	}

	#[test]
	fn fractional_level_label() {
		assert_eq!(labels(vec![("hid1:out", 0.5.into())]), ["err", "hid1:out<0.5"]);
	}

	#[test]
	fn glob() {
		assert!(glob_match("hid1:out", "hid1:out"));
		assert!(!glob_match("hid1:out", "hid1:pre"));
		assert!(glob_match("*", "anything"));
		assert!(glob_match("*", ""));
		assert!(glob_match("*.w", "hid1.w"));
		assert!(!glob_match("*.w", "hid1.b"));
		assert!(glob_match("hid?.w", "hid1.w"));
		assert!(!glob_match("hid?.w", "hid10.w"));
		assert!(glob_match("a*b?c", "axxbyc"));
		assert!(!glob_match("?", ""));
		assert!(glob_match("h*d*:*", "hid1:out"));
	}
}
