//------------------------------------------------------------------------------
//
// Copyright 2025 Jiri Bobek. All rights reserved.
// License: GPL 3.0 or later. See LICENSE.txt for details.
//
//------------------------------------------------------------------------------

use std::fmt;
use std::sync::OnceLock;

use smallvec::SmallVec;

use crate::ErrPack;
use crate::cold_path;
use crate::tensor::error::report_error;
use crate::tensor::{KernelError, TensorMut, TensorRef};

pub mod space_to_batch_nd;
pub mod transpose;


//--------------------------------------------------------------------------------------------------

/// Operands of one operator invocation.
pub struct Node<'a> {
	pub inputs: SmallVec<[TensorRef<'a>; 3]>,
	pub outputs: SmallVec<[TensorMut<'a>; 1]>,
}

impl<'a> Node<'a> {
	pub fn new(
		inputs: impl IntoIterator<Item = TensorRef<'a>>,
		outputs: impl IntoIterator<Item = TensorMut<'a>>,
	) -> Self {
		Self {
			inputs: inputs.into_iter().collect(),
			outputs: outputs.into_iter().collect(),
		}
	}

	pub fn num_inputs(&self) -> usize {
		self.inputs.len()
	}

	pub fn num_outputs(&self) -> usize {
		self.outputs.len()
	}

	pub fn input(&self, index: usize) -> Result<&TensorRef<'a>, ErrPack<KernelError>> {
		self.inputs.get(index).ok_or_else(|| {
			cold_path();
			report_error(KernelError::Shape, format!("Node has no input {index}."))
		})
	}

	pub fn output(&self, index: usize) -> Result<&TensorMut<'a>, ErrPack<KernelError>> {
		self.outputs.get(index).ok_or_else(|| {
			cold_path();
			report_error(KernelError::Shape, format!("Node has no output {index}."))
		})
	}

	/// Borrows all inputs and one output at the same time.
	pub fn split_mut(
		&mut self,
		output: usize,
	) -> Result<(&[TensorRef<'a>], &mut TensorMut<'a>), ErrPack<KernelError>> {
		let Some(out) = self.outputs.get_mut(output) else {
			cold_path();
			return Err(report_error(KernelError::Shape, format!("Node has no output {output}.")));
		};
		Ok((self.inputs.as_slice(), out))
	}

	pub fn expect_operands(
		&self,
		op: &str,
		inputs: usize,
		outputs: usize,
	) -> Result<(), ErrPack<KernelError>> {
		crate::ensure!(
			self.num_inputs() == inputs && self.num_outputs() == outputs,
			KernelError::Shape,
			"{op} op expects {inputs} inputs and {outputs} outputs, got {} and {}.",
			self.num_inputs(),
			self.num_outputs()
		);
		Ok(())
	}
}

//--------------------------------------------------------------------------------------------------

pub type InitFn = fn(init_data: &[u8]) -> Result<(), ErrPack<KernelError>>;
pub type FreeFn = fn();
pub type PrepareFn = fn(node: &Node) -> Result<(), ErrPack<KernelError>>;
pub type EvalFn = fn(node: &mut Node) -> Result<(), ErrPack<KernelError>>;

/// Entry points of one kernel.
#[derive(Clone, Copy)]
pub struct Registration {
	pub name: &'static str,
	pub version: u32,
	pub init: Option<InitFn>,
	pub free: Option<FreeFn>,
	pub prepare: PrepareFn,
	pub eval: EvalFn,
}

impl fmt::Debug for Registration {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		f.debug_struct("Registration")
			.field("name", &self.name)
			.field("version", &self.version)
			.field("init", &self.init.is_some())
			.field("free", &self.free.is_some())
			.finish_non_exhaustive()
	}
}

//--------------------------------------------------------------------------------------------------

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum OpKind {
	Transpose,
	SpaceToBatchNd,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub struct UnknownOpError;

impl OpKind {
	pub const ALL: [Self; 2] = [Self::Transpose, Self::SpaceToBatchNd];

	pub const fn name(self) -> &'static str {
		match self {
			Self::Transpose => "TRANSPOSE",
			Self::SpaceToBatchNd => "SPACE_TO_BATCH_ND",
		}
	}

	pub fn registration(self) -> Registration {
		match self {
			Self::Transpose => transpose::register(),
			Self::SpaceToBatchNd => space_to_batch_nd::register(),
		}
	}
}

impl std::str::FromStr for OpKind {
	type Err = UnknownOpError;

	fn from_str(s: &str) -> Result<Self, UnknownOpError> {
		match s {
			"TRANSPOSE" => Ok(Self::Transpose),
			"SPACE_TO_BATCH_ND" => Ok(Self::SpaceToBatchNd),
			_ => {
				cold_path();
				Err(UnknownOpError)
			},
		}
	}
}

impl fmt::Display for OpKind {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		f.write_str(self.name())
	}
}

//--------------------------------------------------------------------------------------------------

/// Process-wide table of the built-in kernels.
pub struct KernelRegistry {
	kernels: Vec<(OpKind, Registration)>,
}

impl KernelRegistry {
	pub fn instance() -> &'static Self {
		static instance: OnceLock<KernelRegistry> = OnceLock::new();
		instance.get_or_init(|| Self {
			kernels: OpKind::ALL.iter().map(|&kind| (kind, kind.registration())).collect(),
		})
	}

	pub fn get(&self, kind: OpKind) -> Option<&Registration> {
		self.kernels.iter().find(|(k, _)| *k == kind).map(|(_, reg)| reg)
	}

	pub fn find(&self, name: &str) -> Option<&Registration> {
		let kind: OpKind = name.parse().ok()?;
		self.get(kind)
	}

	pub fn iter(&self) -> impl Iterator<Item = (OpKind, &Registration)> {
		self.kernels.iter().map(|(kind, reg)| (*kind, reg))
	}
}

//--------------------------------------------------------------------------------------------------
