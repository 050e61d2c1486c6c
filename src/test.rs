//! End-to-end checks of the public surface: shorthand construction, activation addressing and
//! monitor resolution, exercised the way a user of the bundling crate sees them.

use crate::{monitor::MonitorSpec, LayerSpec, Regressor};
use lamina_test::digits::{Digits, DIGIT_SIZE, NUM_DIGITS};

fn build(hiddens: &[usize]) -> Regressor {
	let mut specs: Vec<LayerSpec> = vec![DIGIT_SIZE.into()];
	specs.extend(hiddens.iter().map(|&size| LayerSpec::new(size)));
	Regressor::new(specs).unwrap()
}

#[test]
fn predict() {
	let net = build(&[15, 13]);
	let digits = Digits::new();
	let y = net.predict(&digits.images).unwrap();
	assert_eq!(y.shape(), [NUM_DIGITS, 13]);
}

#[test]
fn feed_forward() {
	let net = build(&[15, 13]);
	let hs = net.feed_forward(&Digits::new().images).unwrap();
	assert_eq!(hs.len(), net.graph().port_count());
	assert_eq!(hs["hid1:out"].shape(), [NUM_DIGITS, 15]);
}

#[test]
fn layer_shorthand() {
	let net = Regressor::new(vec![LayerSpec::new(1), LayerSpec::new(2), LayerSpec::new(3)]).unwrap();
	assert_eq!(net.layers().len(), 3);

	let net = Regressor::new(vec![1.into(), (2, "relu").into(), LayerSpec::new(3)]).unwrap();
	assert_eq!(net.layers().len(), 3);
	assert_eq!(net.layers()[1].activation(), "relu");

	let net = Regressor::new(vec![
		1.into(),
		LayerSpec::new(2).activation("relu").form("rnn"),
		3.into(),
	])
	.unwrap();
	assert_eq!(net.layers()[1].form(), "rnn");
	assert_eq!(net.layers()[1].activation(), "relu");
}

#[test]
fn layer_tied() {
	let specs: Vec<LayerSpec> = vec![1.into(), 2.into(), (1, "tied").into()];
	let net = Regressor::new(specs).unwrap();
	assert_eq!(net.layers().len(), 3);
	let tied = &net.layers()[2];
	assert_eq!(tied.form(), "tied");
	let partner = net.graph().partner_of(tied).unwrap();
	assert!(std::ptr::eq(partner, &net.layers()[1]));
}

#[test]
fn monitors() {
	let net = build(&[15, 14, 13]);
	let labels = |monitors: Vec<lamina_core::monitor::Monitor>| -> Vec<String> {
		monitors.into_iter().map(|m| m.label).collect()
	};

	assert_eq!(labels(net.monitors(vec![("hid1:out", 1)])), ["err", "hid1:out<1"]);
	assert_eq!(
		labels(net.monitors(vec![("hid1:out", vec![2, 1])])),
		["err", "hid1:out<2", "hid1:out<1"]
	);
	assert_eq!(labels(net.monitors(vec![("hid10:out", 1)])), ["err"]);
	assert_eq!(labels(net.monitors(vec![("hid1.w", 1)])), ["err", "hid1.w<1"]);
	assert_eq!(
		labels(net.monitors(vec![("*.w", 1)])),
		["err", "hid1.w<1", "hid2.w<1", "out.w<1"]
	);
	assert_eq!(
		labels(net.monitors(vec![("hid?.w", 1)])),
		["err", "hid1.w<1", "hid2.w<1"]
	);

	fn plus_one(v: ndarray::ArrayViewD<f32>) -> f32 {
		v.mean().unwrap_or(0.0) + 1.0
	}
	fn plus_two(v: ndarray::ArrayViewD<f32>) -> f32 {
		v.mean().unwrap_or(0.0) + 2.0
	}
	let spec = MonitorSpec::named(vec![
		("a", plus_one as fn(ndarray::ArrayViewD<f32>) -> f32),
		("b", plus_two as fn(ndarray::ArrayViewD<f32>) -> f32),
	]);
	assert_eq!(
		labels(net.monitors(vec![("hid1:out", spec)])),
		["err", "hid1:out:a", "hid1:out:b"]
	);
}

#[test]
fn updates() {
	assert!(build(&[13]).updates().is_empty());
}
