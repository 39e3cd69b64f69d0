//------------------------------------------------------------------------------
//
// Copyright 2025 Jiri Bobek. All rights reserved.
// License: GPL 3.0 or later. See LICENSE.txt for details.
//
//------------------------------------------------------------------------------

use arrayvec::ArrayVec;

use crate::tensor::dim_index::resolve_axis;
use crate::tensor::elem::gather_elems;
use crate::tensor::error::report_error;
use crate::tensor::{DType, KernelError, Shape, TensorRef};
use crate::{ErrPack, cold_path, ensure};

use super::{Node, Registration};

//--------------------------------------------------------------------------------------------------

pub const MAX_TRANSPOSE_DIMS: usize = 5;

pub type Perm = ArrayVec<usize, MAX_TRANSPOSE_DIMS>;

pub fn register() -> Registration {
	Registration {
		name: "TRANSPOSE",
		version: 1,
		init: None,
		free: None,
		prepare,
		eval,
	}
}

//--------------------------------------------------------------------------------------------------

/// Checks that `perm` is a permutation of `0..ndim`.
pub fn validate_perm(
	perm: impl IntoIterator<Item = i32>,
	ndim: usize,
) -> Result<Perm, ErrPack<KernelError>> {
	let mut result = Perm::new();
	for raw in perm {
		let Ok(axis) = resolve_axis(raw, ndim) else {
			cold_path();
			return Err(report_error(
				KernelError::PermutationRange,
				"Transpose op permutations array is out of bounds.",
			));
		};
		ensure!(
			!result.contains(&axis),
			KernelError::PermutationRange,
			"Transpose op permutations array repeats axis {axis}."
		);
		ensure!(
			result.try_push(axis).is_ok(),
			KernelError::PermutationRange,
			"Transpose op permutations array is longer than {MAX_TRANSPOSE_DIMS}."
		);
	}
	ensure!(
		result.len() == ndim,
		KernelError::PermutationRange,
		"Transpose op permutations array has {} entries, expected {ndim}.",
		result.len()
	);
	Ok(result)
}

fn read_perm(perm: &TensorRef, ndim: usize) -> Result<Perm, ErrPack<KernelError>> {
	ensure!(
		perm.dtype() == DType::I32,
		KernelError::UnsupportedType,
		"Transpose op permutations must be i32, got {}.",
		perm.dtype()
	);
	ensure!(
		perm.ndim() == 1,
		KernelError::PermutationRange,
		"Transpose op permutations must be 1D, got {}D.",
		perm.ndim()
	);
	validate_perm(perm.values::<i32>()?, ndim)
}

/// `output_shape[k] = input_shape[perm[k]]`
pub fn output_shape(input: &Shape, perm: &[usize]) -> Result<Shape, ErrPack<KernelError>> {
	let mut dims = ArrayVec::<usize, MAX_TRANSPOSE_DIMS>::new();
	for &axis in perm {
		let size = input.dim(axis)?;
		ensure!(
			dims.try_push(size).is_ok(),
			KernelError::Shape,
			"Transpose op only supports 1D-5D input arrays."
		);
	}
	Ok(Shape::new(&dims)?)
}

//--------------------------------------------------------------------------------------------------

/// Yields, for every output element in row-major order, the flat offset
/// of the corresponding input element.
#[derive(Clone, Debug)]
pub struct PermutedOffsets {
	sizes: ArrayVec<usize, MAX_TRANSPOSE_DIMS>,
	strides: ArrayVec<usize, MAX_TRANSPOSE_DIMS>,
	index: ArrayVec<usize, MAX_TRANSPOSE_DIMS>,
	offset: usize,
	remaining: usize,
}

impl PermutedOffsets {
	/// `perm` must have been checked with `validate_perm()`.
	pub fn new(input: &Shape, perm: &[usize]) -> Self {
		let in_strides = input.strides();
		let mut sizes = ArrayVec::new();
		let mut strides = ArrayVec::new();
		for &axis in perm.iter().take(MAX_TRANSPOSE_DIMS) {
			sizes.push(input.dims().get(axis).copied().unwrap_or(0));
			strides.push(in_strides.get(axis).copied().unwrap_or(0));
		}
		let index = sizes.iter().map(|_| 0).collect();
		Self {
			sizes,
			strides,
			index,
			offset: 0,
			remaining: input.elems(),
		}
	}
}

impl Iterator for PermutedOffsets {
	type Item = usize;

	#[inline]
	fn next(&mut self) -> Option<usize> {
		if self.remaining == 0 {
			return None;
		}
		self.remaining -= 1;
		let current = self.offset;

		// odometer, last output axis moves fastest
		let dims = self.index.iter_mut().zip(self.sizes.iter()).zip(self.strides.iter());
		for ((i, &size), &stride) in dims.rev() {
			*i += 1;
			self.offset += stride;
			if *i < size {
				break;
			}
			self.offset -= stride * size;
			*i = 0;
		}

		Some(current)
	}

	fn size_hint(&self) -> (usize, Option<usize>) {
		(self.remaining, Some(self.remaining))
	}
}

impl ExactSizeIterator for PermutedOffsets {}

//--------------------------------------------------------------------------------------------------

/// Transposes typed data. Returns the output shape.
pub fn transpose_typed<T: Copy>(
	input_shape: &Shape,
	perm: &[usize],
	input: &[T],
	output: &mut [T],
) -> Result<Shape, ErrPack<KernelError>> {
	ensure!(
		input_shape.ndim() <= MAX_TRANSPOSE_DIMS,
		KernelError::Shape,
		"Transpose op only supports 1D-5D input arrays."
	);
	let raw = perm.iter().map(|&p| i32::try_from(p).unwrap_or(-1));
	let perm = validate_perm(raw, input_shape.ndim())?;
	ensure!(
		input.len() == input_shape.elems() && output.len() == input.len(),
		KernelError::InvalidBufferSize,
		"Transpose op expects {} elements, got input {} and output {}.",
		input_shape.elems(),
		input.len(),
		output.len()
	);
	let out_shape = output_shape(input_shape, &perm)?;
	for (d, offset) in output.iter_mut().zip(PermutedOffsets::new(input_shape, &perm)) {
		let Some(&s) = input.get(offset) else {
			cold_path();
			return Err(ErrPack::new(KernelError::InvalidBufferSize));
		};
		*d = s;
	}
	Ok(out_shape)
}

//--------------------------------------------------------------------------------------------------

pub fn prepare(node: &Node) -> Result<(), ErrPack<KernelError>> {
	node.expect_operands("Transpose", 2, 1)?;
	let input = node.input(0)?;
	let perm = node.input(1)?;
	let output = node.output(0)?;

	ensure!(
		input.ndim() <= MAX_TRANSPOSE_DIMS,
		KernelError::Shape,
		"Transpose op only supports 1D-5D input arrays."
	);
	ensure!(
		input.dtype() == output.dtype(),
		KernelError::TypeMismatch,
		"Transpose op input type {} does not match output type {}.",
		input.dtype(),
		output.dtype()
	);

	let perm = read_perm(perm, input.ndim())?;

	let expected = output_shape(input.shape(), &perm)?;
	ensure!(
		*output.shape() == expected,
		KernelError::ShapeMismatch,
		"Transpose op output shape {} does not match expected shape {expected}.",
		output.shape()
	);

	log::debug!("Transpose prepared: {} -> {expected}, perm = {perm:?}", input.shape());
	Ok(())
}

pub fn eval(node: &mut Node) -> Result<(), ErrPack<KernelError>> {
	let (inputs, output) = node.split_mut(0)?;
	let (Some(input), Some(perm)) = (inputs.first(), inputs.get(1)) else {
		cold_path();
		return Err(report_error(KernelError::Shape, "Transpose op expects 2 inputs."));
	};
	let perm = read_perm(perm, input.ndim())?;
	let offsets = PermutedOffsets::new(input.shape(), &perm);

	let dtype = input.dtype();
	let src = input.data();
	let dst = output.data_mut();

	// Transpose only moves values around, so the element width is all that matters.
	match dtype.bytes() {
		1 => gather_elems::<1>(dst, src, offsets)?,
		2 => gather_elems::<2>(dst, src, offsets)?,
		4 => gather_elems::<4>(dst, src, offsets)?,
		8 => gather_elems::<8>(dst, src, offsets)?,
		_ => {
			cold_path();
			return Err(report_error(
				KernelError::UnsupportedType,
				format!("Type {dtype} is currently not supported by Transpose."),
			));
		},
	}
	Ok(())
}

//--------------------------------------------------------------------------------------------------


//--------------------------------------------------------------------------------------------------
