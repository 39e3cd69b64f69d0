//------------------------------------------------------------------------------
//
// Copyright 2025 Jiri Bobek. All rights reserved.
// License: GPL 3.0 or later. See LICENSE.txt for details.
//
//------------------------------------------------------------------------------

use crate::{ErrPack, cold_path};

pub mod dim_index;
pub mod dtype;
pub mod elem;
pub mod error;
pub mod shape;

pub use dtype::{DType, DTypeKind, DTypeMismatchError, HasDType};
pub use elem::Element;
pub use error::{InvalidBufferSizeError, KernelError};
pub use shape::{Shape, TensorSizeOverflowError};

/// Shapes up to this rank are stored inline.
pub const INLINE_DIMS: usize = 5;

//--------------------------------------------------------------------------------------------------

fn check_buffer_size(
	shape: &Shape,
	dtype: DType,
	data_len: usize,
) -> Result<(), InvalidBufferSizeError> {
	if dtype.array_bytes(shape.elems()) == Some(data_len) {
		Ok(())
	} else {
		cold_path();
		Err(InvalidBufferSizeError)
	}
}

fn decode<'a, T: Element>(data: &'a [u8]) -> impl Iterator<Item = T> + 'a {
	data.chunks_exact(T::BYTES).map(T::from_slice)
}

//--------------------------------------------------------------------------------------------------

/// Read-only handle to a caller owned dense row-major buffer.
#[derive(Clone, Debug)]
pub struct TensorRef<'a> {
	shape: Shape,
	dtype: DType,
	data: &'a [u8],
}

impl<'a> TensorRef<'a> {
	pub fn new(shape: Shape, dtype: DType, data: &'a [u8]) -> Result<Self, InvalidBufferSizeError> {
		check_buffer_size(&shape, dtype, data.len())?;
		Ok(Self { shape, dtype, data })
	}

	pub fn shape(&self) -> &Shape {
		&self.shape
	}

	pub fn ndim(&self) -> usize {
		self.shape.ndim()
	}

	pub fn dtype(&self) -> DType {
		self.dtype
	}

	pub fn data(&self) -> &'a [u8] {
		self.data
	}

	/// Decodes the elements in row-major order.
	pub fn values<T: Element>(
		&self,
	) -> Result<impl Iterator<Item = T> + use<'a, T>, DTypeMismatchError> {
		if self.dtype != T::dtype {
			cold_path();
			return Err(DTypeMismatchError);
		}
		Ok(decode::<T>(self.data))
	}
}

//--------------------------------------------------------------------------------------------------

/// Exclusive handle to a caller owned output buffer.
#[derive(Debug)]
pub struct TensorMut<'a> {
	shape: Shape,
	dtype: DType,
	data: &'a mut [u8],
}

impl<'a> TensorMut<'a> {
	pub fn new(
		shape: Shape,
		dtype: DType,
		data: &'a mut [u8],
	) -> Result<Self, InvalidBufferSizeError> {
		check_buffer_size(&shape, dtype, data.len())?;
		Ok(Self { shape, dtype, data })
	}

	pub fn shape(&self) -> &Shape {
		&self.shape
	}

	pub fn ndim(&self) -> usize {
		self.shape.ndim()
	}

	pub fn dtype(&self) -> DType {
		self.dtype
	}

	pub fn data_mut(&mut self) -> &mut [u8] {
		&mut *self.data
	}
}

//--------------------------------------------------------------------------------------------------

/// Owned buffer for callers that start from typed data, e.g. tests and the harness.
#[derive(Clone, Debug)]
pub struct TensorBuf {
	shape: Shape,
	dtype: DType,
	data: Vec<u8>,
}

impl TensorBuf {
	pub fn from_slice<T: Element>(
		dims: &[usize],
		values: &[T],
	) -> Result<Self, ErrPack<KernelError>> {
		let shape = Shape::new(dims)?;
		if values.len() != shape.elems() {
			cold_path();
			return Err(error::report_error(
				KernelError::InvalidBufferSize,
				format!("{} values do not fill a tensor of shape {shape}", values.len()),
			));
		}
		let mut data = Vec::with_capacity(values.len() * T::BYTES);
		for v in values {
			data.extend_from_slice(v.to_bytes().as_ref());
		}
		Ok(Self { shape, dtype: T::dtype, data })
	}

	pub fn zeros(dims: &[usize], dtype: DType) -> Result<Self, ErrPack<KernelError>> {
		let shape = Shape::new(dims)?;
		let Some(bytes) = dtype.array_bytes(shape.elems()) else {
			cold_path();
			return Err(ErrPack::new(KernelError::TensorSizeOverflow));
		};
		Ok(Self { shape, dtype, data: vec![0; bytes] })
	}

	pub fn shape(&self) -> &Shape {
		&self.shape
	}

	pub fn dtype(&self) -> DType {
		self.dtype
	}

	pub fn view(&self) -> TensorRef<'_> {
		TensorRef {
			shape: self.shape.clone(),
			dtype: self.dtype,
			data: &self.data,
		}
	}

	pub fn view_mut(&mut self) -> TensorMut<'_> {
		TensorMut {
			shape: self.shape.clone(),
			dtype: self.dtype,
			data: &mut self.data,
		}
	}

	pub fn to_vec<T: Element>(&self) -> Result<Vec<T>, DTypeMismatchError> {
		if self.dtype != T::dtype {
			cold_path();
			return Err(DTypeMismatchError);
		}
		Ok(decode::<T>(&self.data).collect())
	}
}

//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_buffer_size_is_checked() -> Result<(), ErrPack<KernelError>> {
		let shape = Shape::new(&[2, 3])?;
		let data = [0_u8; 24];
		assert!(TensorRef::new(shape.clone(), DType::I32, &data).is_ok());
		assert_eq!(
			TensorRef::new(shape.clone(), DType::I16, &data).err(),
			Some(InvalidBufferSizeError)
		);
		let mut data = [0_u8; 6];
		assert!(TensorMut::new(shape, DType::Bool, &mut data).is_ok());
		Ok(())
	}

	#[test]
	fn test_typed_round_trip() -> Result<(), ErrPack<KernelError>> {
		let buf = TensorBuf::from_slice(&[2, 2], &[1.5_f32, -2.0, 0.25, 8.0])?;
		assert_eq!(buf.dtype(), DType::F32);
		assert_eq!(buf.to_vec::<f32>()?, [1.5, -2.0, 0.25, 8.0]);
		assert_eq!(buf.to_vec::<i32>(), Err(DTypeMismatchError));

		let values: Vec<f32> = buf.view().values::<f32>()?.collect();
		assert_eq!(values.len(), 4);

		let err = TensorBuf::from_slice(&[3], &[1_i8, 2]).err();
		assert_eq!(err.map(|e| e.code), Some(KernelError::InvalidBufferSize));
		Ok(())
	}
}

//--------------------------------------------------------------------------------------------------
