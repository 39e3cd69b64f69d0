//------------------------------------------------------------------------------
//
// Copyright 2025 Jiri Bobek. All rights reserved.
// License: GPL 3.0 or later. See LICENSE.txt for details.
//
//------------------------------------------------------------------------------

use arrayvec::ArrayVec;

use crate::tensor::elem::fill_zero;
use crate::tensor::error::report_error;
use crate::tensor::{DType, Element, KernelError, Shape, TensorRef};
use crate::{ErrPack, cold_path, ensure};

use super::{Node, Registration};

//--------------------------------------------------------------------------------------------------

// Only 3D NHC and 4D NHWC inputs are supported.
// A 3D input is handled as NHWC with W = 1.
pub const INPUT_MIN_DIMS: usize = 3;
pub const INPUT_MAX_DIMS: usize = 4;
pub const MAX_SPATIAL_DIMS: usize = INPUT_MAX_DIMS - 2;

pub fn register() -> Registration {
	Registration {
		name: "SPACE_TO_BATCH_ND",
		version: 1,
		init: None,
		free: None,
		prepare,
		eval,
	}
}

//--------------------------------------------------------------------------------------------------

/// Block sizes and `[before, after]` paddings, one entry per spatial dimension.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SpaceToBatchParams {
	pub block_shape: ArrayVec<usize, MAX_SPATIAL_DIMS>,
	pub paddings: ArrayVec<[usize; 2], MAX_SPATIAL_DIMS>,
}

impl SpaceToBatchParams {
	pub fn new(
		block_shape: &[usize],
		paddings: &[[usize; 2]],
	) -> Result<Self, ErrPack<KernelError>> {
		ensure!(
			block_shape.len() <= MAX_SPATIAL_DIMS && paddings.len() == block_shape.len(),
			KernelError::Shape,
			"SpaceToBatchND expects matching block shape and paddings for at most \
			 {MAX_SPATIAL_DIMS} spatial dims, got {} and {}.",
			block_shape.len(),
			paddings.len()
		);
		ensure!(
			block_shape.iter().all(|&b| b >= 1),
			KernelError::Shape,
			"SpaceToBatchND block sizes must be positive, got {block_shape:?}."
		);
		Ok(Self {
			block_shape: block_shape.iter().copied().collect(),
			paddings: paddings.iter().copied().collect(),
		})
	}

	/// Reads the `block_shape` `[M]` and `paddings` `[M, 2]` parameter tensors.
	pub fn from_tensors(
		block_shape: &TensorRef,
		paddings: &TensorRef,
		spatial_dims: usize,
	) -> Result<Self, ErrPack<KernelError>> {
		ensure!(
			block_shape.dtype() == DType::I32 && paddings.dtype() == DType::I32,
			KernelError::UnsupportedType,
			"SpaceToBatchND block shape and paddings must be i32, got {} and {}.",
			block_shape.dtype(),
			paddings.dtype()
		);
		ensure!(
			*block_shape.shape() == [spatial_dims],
			KernelError::Shape,
			"SpaceToBatchND block shape must have shape [{spatial_dims}], got {}.",
			block_shape.shape()
		);
		ensure!(
			*paddings.shape() == [spatial_dims, 2],
			KernelError::Shape,
			"SpaceToBatchND paddings must have shape [{spatial_dims}, 2], got {}.",
			paddings.shape()
		);

		let mut blocks = ArrayVec::<usize, MAX_SPATIAL_DIMS>::new();
		for raw in block_shape.values::<i32>()? {
			let block = usize::try_from(raw).unwrap_or(0);
			ensure!(
				block >= 1 && blocks.try_push(block).is_ok(),
				KernelError::Shape,
				"SpaceToBatchND block size {raw} is not valid."
			);
		}

		let mut pads = ArrayVec::<[usize; 2], MAX_SPATIAL_DIMS>::new();
		let mut values = paddings.values::<i32>()?;
		while let (Some(before), Some(after)) = (values.next(), values.next()) {
			let (Ok(b), Ok(a)) = (usize::try_from(before), usize::try_from(after)) else {
				cold_path();
				return Err(report_error(
					KernelError::Shape,
					format!("SpaceToBatchND paddings must be >= 0, got [{before}, {after}]."),
				));
			};
			ensure!(
				pads.try_push([b, a]).is_ok(),
				KernelError::Shape,
				"SpaceToBatchND supports at most {MAX_SPATIAL_DIMS} spatial dims."
			);
		}

		Self::new(&blocks, &pads)
	}

	/// Derives the output shape and checks that every padded spatial extent
	/// is a multiple of its block size.
	pub fn output_shape(&self, input: &Shape) -> Result<Shape, ErrPack<KernelError>> {
		let ndim = input.ndim();
		ensure!(
			(INPUT_MIN_DIMS..=INPUT_MAX_DIMS).contains(&ndim),
			KernelError::Shape,
			"SpaceToBatchND only supports 3D or 4D input arrays, got {ndim}D."
		);
		ensure!(
			self.block_shape.len() == ndim - 2,
			KernelError::Shape,
			"SpaceToBatchND expects {} spatial dims, params have {}.",
			ndim - 2,
			self.block_shape.len()
		);

		let dims = input.dims();
		let mut out = ArrayVec::<usize, INPUT_MAX_DIMS>::new();
		let mut batch = dims.first().copied().unwrap_or(0);
		out.push(batch);

		let spatial = dims.iter().skip(1).zip(self.block_shape.iter()).zip(self.paddings.iter());
		for (d, ((&size, &block), &[before, after])) in spatial.enumerate() {
			let Some(padded) = size.checked_add(before).and_then(|s| s.checked_add(after)) else {
				cold_path();
				return Err(ErrPack::new(KernelError::TensorSizeOverflow));
			};
			ensure!(
				padded % block == 0,
				KernelError::PaddingAlignment,
				"SpaceToBatchND padded dim {d} ({padded}) is not a multiple of block size {block}."
			);
			out.push(padded / block);
			let Some(b) = batch.checked_mul(block) else {
				cold_path();
				return Err(ErrPack::new(KernelError::TensorSizeOverflow));
			};
			batch = b;
		}

		if let Some(first) = out.first_mut() {
			*first = batch;
		}
		out.push(dims.last().copied().unwrap_or(0));
		Ok(Shape::new(&out)?)
	}
}

//--------------------------------------------------------------------------------------------------

/// NHC is handled as NHWC with W = 1.
fn extend_to_4d(dims: &[usize]) -> [usize; 4] {
	match *dims {
		[n, h, c] => [n, h, 1, c],
		[n, h, w, c] => [n, h, w, c],
		_ => [0; 4],
	}
}

/// Walks the output pixels `(batch, h, w)` in row-major order and yields, for each,
/// the flat pixel index into the input or `None` when the pixel falls into padding.
///
/// Output batch `ob` reads input batch `ob % in_batch` at block offset
/// `(ob / in_batch) / block_width, (ob / in_batch) % block_width`.
#[derive(Clone, Debug)]
pub struct SourcePixels {
	in_batch: usize,
	in_height: usize,
	in_width: usize,
	block_height: usize,
	block_width: usize,
	pad_top: usize,
	pad_left: usize,
	out_batch: usize,
	out_height: usize,
	out_width: usize,
	ob: usize,
	oh: usize,
	ow: usize,
}

impl SourcePixels {
	pub fn new(input: &Shape, output: &Shape, params: &SpaceToBatchParams) -> Self {
		let [in_batch, in_height, in_width, _] = extend_to_4d(input.dims());
		let [out_batch, out_height, out_width, _] = extend_to_4d(output.dims());
		let block_height = params.block_shape.first().copied().unwrap_or(1);
		let block_width = params.block_shape.get(1).copied().unwrap_or(1);
		let pad_top = params.paddings.first().map_or(0, |p| p[0]);
		let pad_left = params.paddings.get(1).map_or(0, |p| p[0]);

		let empty = in_batch == 0 || block_width == 0 || out_height == 0 || out_width == 0;
		Self {
			in_batch,
			in_height,
			in_width,
			block_height,
			block_width,
			pad_top,
			pad_left,
			out_batch,
			out_height,
			out_width,
			ob: if empty { out_batch } else { 0 },
			oh: 0,
			ow: 0,
		}
	}
}

impl Iterator for SourcePixels {
	type Item = Option<usize>;

	fn next(&mut self) -> Option<Option<usize>> {
		if self.ob >= self.out_batch {
			return None;
		}

		let b = self.ob % self.in_batch;
		let block_index = self.ob / self.in_batch;
		let shift_w = block_index % self.block_width;
		let shift_h = block_index / self.block_width;

		let h = self.oh * self.block_height + shift_h;
		let w = self.ow * self.block_width + shift_w;
		let src = if h < self.pad_top
			|| h >= self.pad_top + self.in_height
			|| w < self.pad_left
			|| w >= self.pad_left + self.in_width
		{
			None
		} else {
			Some((b * self.in_height + (h - self.pad_top)) * self.in_width + (w - self.pad_left))
		};

		self.ow += 1;
		if self.ow == self.out_width {
			self.ow = 0;
			self.oh += 1;
			if self.oh == self.out_height {
				self.oh = 0;
				self.ob += 1;
			}
		}

		Some(src)
	}
}

//--------------------------------------------------------------------------------------------------

/// Rearranges typed data. Returns the output shape.
pub fn space_to_batch_nd_typed<T: Element>(
	input_shape: &Shape,
	params: &SpaceToBatchParams,
	input: &[T],
	output: &mut [T],
) -> Result<Shape, ErrPack<KernelError>> {
	let out_shape = params.output_shape(input_shape)?;
	ensure!(
		input.len() == input_shape.elems() && output.len() == out_shape.elems(),
		KernelError::InvalidBufferSize,
		"SpaceToBatchND expects {} input and {} output elements, got {} and {}.",
		input_shape.elems(),
		out_shape.elems(),
		input.len(),
		output.len()
	);

	let depth = input_shape.dims().last().copied().unwrap_or(0);
	if depth == 0 {
		return Ok(out_shape);
	}
	let pixels = SourcePixels::new(input_shape, &out_shape, params);
	for (d, px) in output.chunks_exact_mut(depth).zip(pixels) {
		match px {
			Some(px) => {
				let start = px * depth;
				let Some(s) = input.get(start..start + depth) else {
					cold_path();
					return Err(ErrPack::new(KernelError::InvalidBufferSize));
				};
				d.copy_from_slice(s);
			},
			None => d.fill(T::ZERO),
		}
	}
	Ok(out_shape)
}

/// Byte level variant used by `eval()`. `T` only decides what "zero" looks like.
fn space_to_batch_nd_elems<T: Element>(
	pixels: SourcePixels,
	depth: usize,
	src: &[u8],
	dst: &mut [u8],
) -> Result<(), ErrPack<KernelError>> {
	let run = depth * T::BYTES;
	if run == 0 {
		return Ok(());
	}
	for (d, px) in dst.chunks_exact_mut(run).zip(pixels) {
		match px {
			Some(px) => {
				let start = px * run;
				let Some(s) = src.get(start..start + run) else {
					cold_path();
					return Err(ErrPack::new(KernelError::InvalidBufferSize));
				};
				d.copy_from_slice(s);
			},
			None => fill_zero::<T>(d),
		}
	}
	Ok(())
}

//--------------------------------------------------------------------------------------------------

pub fn prepare(node: &Node) -> Result<(), ErrPack<KernelError>> {
	node.expect_operands("SpaceToBatchND", 3, 1)?;
	let input = node.input(0)?;
	let output = node.output(0)?;

	let ndim = input.ndim();
	ensure!(
		(INPUT_MIN_DIMS..=INPUT_MAX_DIMS).contains(&ndim),
		KernelError::Shape,
		"SpaceToBatchND only supports 3D or 4D input arrays, got {ndim}D."
	);
	ensure!(
		input.dtype() == output.dtype(),
		KernelError::TypeMismatch,
		"SpaceToBatchND input type {} does not match output type {}.",
		input.dtype(),
		output.dtype()
	);

	let params = SpaceToBatchParams::from_tensors(node.input(1)?, node.input(2)?, ndim - 2)?;
	let expected = params.output_shape(input.shape())?;
	ensure!(
		*output.shape() == expected,
		KernelError::ShapeMismatch,
		"SpaceToBatchND output shape {} does not match expected shape {expected}.",
		output.shape()
	);

	log::debug!("SpaceToBatchND prepared: {} -> {expected}, {params:?}", input.shape());
	Ok(())
}

pub fn eval(node: &mut Node) -> Result<(), ErrPack<KernelError>> {
	let (inputs, output) = node.split_mut(0)?;
	let [input, block_shape, paddings] = inputs else {
		cold_path();
		return Err(report_error(KernelError::Shape, "SpaceToBatchND expects 3 inputs."));
	};
	let spatial_dims = input.ndim().saturating_sub(2);
	let params = SpaceToBatchParams::from_tensors(block_shape, paddings, spatial_dims)?;
	let out_shape = params.output_shape(input.shape())?;

	let pixels = SourcePixels::new(input.shape(), &out_shape, &params);
	let depth = input.shape().dims().last().copied().unwrap_or(0);
	let src = input.data();
	let dst = output.data_mut();

	// Padding has to be filled with a typed zero, so dispatch on the logical type.
	let dtype = input.dtype();
	match dtype {
		DType::F32 => space_to_batch_nd_elems::<f32>(pixels, depth, src, dst),
		DType::U8 => space_to_batch_nd_elems::<u8>(pixels, depth, src, dst),
		DType::I8 => space_to_batch_nd_elems::<i8>(pixels, depth, src, dst),
		DType::I32 => space_to_batch_nd_elems::<i32>(pixels, depth, src, dst),
		DType::I64 => space_to_batch_nd_elems::<i64>(pixels, depth, src, dst),
		_ => {
			cold_path();
			Err(report_error(
				KernelError::UnsupportedType,
				format!("Type {dtype} is currently not supported by SpaceToBatch."),
			))
		},
	}
}

//--------------------------------------------------------------------------------------------------


//--------------------------------------------------------------------------------------------------
