//------------------------------------------------------------------------------
//
// Copyright 2025 Jiri Bobek. All rights reserved.
// License: GPL 3.0 or later. See LICENSE.txt for details.
//
//------------------------------------------------------------------------------

use log::{error, info};

use crate::ErrPack;
use crate::kernels::{KernelRegistry, Node, OpKind, Registration};
use crate::runner::{KernelRunner, RunnerConfig};
use crate::tensor::{Element, KernelError, TensorBuf};

//--------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
	Passed,
	Failed,
	InitFailed(KernelError),
	PrepareFailed(KernelError),
	InvokeFailed(KernelError),
	/// The scenario itself could not be set up.
	SetupFailed(KernelError),
}

impl Outcome {
	pub fn is_pass(self) -> bool {
		self == Self::Passed
	}
}

/// One built-in self-test: a kernel, its operands and the expected output.
pub struct Scenario {
	pub name: &'static str,
	pub run: fn() -> Outcome,
}

pub const SCENARIOS: [Scenario; 4] = [
	Scenario { name: "TestSpaceToBatchNdOp", run: space_to_batch_nd_3d },
	Scenario { name: "TestSpaceToBatchNd4dOp", run: space_to_batch_nd_4d },
	Scenario { name: "TestSpaceToBatchNdPaddedOp", run: space_to_batch_nd_padded },
	Scenario { name: "TestTransposeOp", run: transpose_3d },
];

//--------------------------------------------------------------------------------------------------

fn run_kernel<T: Element>(
	op: OpKind,
	inputs: &[TensorBuf],
	output_dims: &[usize],
	expected: &[T],
) -> Outcome {
	let Some(registration) = KernelRegistry::instance().get(op) else {
		return Outcome::SetupFailed(KernelError::UnsupportedType);
	};
	run_registration(registration, inputs, output_dims, expected)
}

fn run_registration<T: Element>(
	registration: &Registration,
	inputs: &[TensorBuf],
	output_dims: &[usize],
	expected: &[T],
) -> Outcome {
	let mut output = match TensorBuf::zeros(output_dims, T::dtype) {
		Ok(output) => output,
		Err(err) => return Outcome::SetupFailed(err.code),
	};

	{
		let node = Node::new(inputs.iter().map(TensorBuf::view), [output.view_mut()]);
		let mut runner = KernelRunner::new(registration, node);

		if let Err(err) = runner.init(&[]) {
			error!("  Init: failed ({})", err.message());
			return Outcome::InitFailed(err.code);
		}
		info!("  Init: ok");

		if let Err(err) = runner.prepare() {
			error!("  Prepare: failed ({})", err.message());
			return Outcome::PrepareFailed(err.code);
		}
		info!("  Prepare: ok");

		if let Err(err) = runner.invoke() {
			error!("  Invoke: failed ({})", err.message());
			return Outcome::InvokeFailed(err.code);
		}
		info!("  Invoke: ok");
	}

	let passed = output.to_vec::<T>().is_ok_and(|actual| actual == expected);
	if passed {
		info!("  Test: PASSED");
		Outcome::Passed
	} else {
		error!("  Test: FAILED");
		Outcome::Failed
	}
}

fn setup<T>(result: Result<T, ErrPack<KernelError>>) -> Result<T, Outcome> {
	result.map_err(|err| Outcome::SetupFailed(err.code))
}

//--------------------------------------------------------------------------------------------------

pub fn space_to_batch_nd_3d() -> Outcome {
	let operands = || -> Result<_, Outcome> {
		let values: Vec<i32> = (1..=16).collect();
		Ok([
			setup(TensorBuf::from_slice(&[1, 4, 4], &values))?,
			setup(TensorBuf::from_slice(&[1], &[2_i32]))?,
			setup(TensorBuf::from_slice(&[1, 2], &[0_i32, 0]))?,
		])
	};
	match operands() {
		Ok(inputs) => run_kernel::<i32>(
			OpKind::SpaceToBatchNd,
			&inputs,
			&[2, 2, 4],
			&[1, 2, 3, 4, 9, 10, 11, 12, 5, 6, 7, 8, 13, 14, 15, 16],
		),
		Err(outcome) => outcome,
	}
}

pub fn space_to_batch_nd_4d() -> Outcome {
	let operands = || -> Result<_, Outcome> {
		let values: Vec<f32> = (1..=16_u8).map(f32::from).collect();
		Ok([
			setup(TensorBuf::from_slice(&[1, 4, 4, 1], &values))?,
			setup(TensorBuf::from_slice(&[2], &[2_i32, 2]))?,
			setup(TensorBuf::from_slice(&[2, 2], &[0_i32, 0, 0, 0]))?,
		])
	};
	#[rustfmt::skip]
	let expected = [
		1.0, 3.0, 9.0, 11.0,
		2.0, 4.0, 10.0, 12.0,
		5.0, 7.0, 13.0, 15.0,
		6.0, 8.0, 14.0, 16.0_f32,
	];
	match operands() {
		Ok(inputs) => run_kernel(OpKind::SpaceToBatchNd, &inputs, &[4, 2, 2, 1], &expected),
		Err(outcome) => outcome,
	}
}

pub fn space_to_batch_nd_padded() -> Outcome {
	let operands = || -> Result<_, Outcome> {
		Ok([
			setup(TensorBuf::from_slice(&[1, 2, 2, 1], &[1_i64, 2, 3, 4]))?,
			setup(TensorBuf::from_slice(&[2], &[2_i32, 2]))?,
			setup(TensorBuf::from_slice(&[2, 2], &[1_i32, 1, 1, 1]))?,
		])
	};
	match operands() {
		Ok(inputs) => run_kernel::<i64>(
			OpKind::SpaceToBatchNd,
			&inputs,
			&[4, 2, 2, 1],
			&[0, 0, 0, 4, 0, 0, 3, 0, 0, 2, 0, 0, 1, 0, 0, 0],
		),
		Err(outcome) => outcome,
	}
}

pub fn transpose_3d() -> Outcome {
	let operands = || -> Result<_, Outcome> {
		let values: Vec<i32> = (1..=24).collect();
		Ok([
			setup(TensorBuf::from_slice(&[2, 3, 4], &values))?,
			setup(TensorBuf::from_slice(&[3], &[2_i32, 0, 1]))?,
		])
	};
	match operands() {
		Ok(inputs) => run_kernel::<i32>(
			OpKind::Transpose,
			&inputs,
			&[4, 2, 3],
			&[
				1, 5, 9, 13, 17, 21, 2, 6, 10, 14, 18, 22, //
				3, 7, 11, 15, 19, 23, 4, 8, 12, 16, 20, 24,
			],
		),
		Err(outcome) => outcome,
	}
}

//--------------------------------------------------------------------------------------------------

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
	pub passed: usize,
	pub failed: usize,
}

impl Summary {
	pub fn all_passed(&self) -> bool {
		self.failed == 0
	}
}

/// Runs every scenario once, logging progress the way the on-device harness does.
pub fn run_all(config: &RunnerConfig) -> Summary {
	info!("INIT_TESTING");
	let mut summary = Summary::default();
	for scenario in &SCENARIOS {
		info!("{}", scenario.name);
		let outcome = (scenario.run)();
		if outcome.is_pass() {
			summary.passed += 1;
		} else {
			summary.failed += 1;
			log::warn!("{} did not pass: {outcome:?}", scenario.name);
			if config.stop_on_failure {
				break;
			}
		}
	}
	info!("END_TESTING");
	summary
}

//--------------------------------------------------------------------------------------------------


//--------------------------------------------------------------------------------------------------
