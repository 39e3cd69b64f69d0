//------------------------------------------------------------------------------
//
// Copyright 2025 Jiri Bobek. All rights reserved.
// License: GPL 3.0 or later. See LICENSE.txt for details.
//
//------------------------------------------------------------------------------

use std::fmt;

use smallvec::SmallVec;

use crate::cold_path;

use super::INLINE_DIMS;
use super::dim_index::{DimIndexOutOfBoundsError, check_index};

//--------------------------------------------------------------------------------------------------

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub struct TensorSizeOverflowError;

//--------------------------------------------------------------------------------------------------

/// Accumulates row-major strides from the innermost dimension outwards.
struct StrideCounter {
	elems: usize,
	nonzero_elems: usize,
}

impl StrideCounter {
	fn new() -> Self {
		Self { elems: 1, nonzero_elems: 1 }
	}

	/// Returns the stride of the prepended dimension.
	fn prepend_dim(&mut self, size: usize) -> Result<usize, TensorSizeOverflowError> {
		// Check that if we ignore zero length dimensions, the number of elements does not
		// overflow. This way a permuted shape with the same extents cannot overflow either.
		if size != 0 {
			let Some(e) = self.nonzero_elems.checked_mul(size) else {
				cold_path();
				return Err(TensorSizeOverflowError);
			};
			self.nonzero_elems = e;
		}

		let stride = self.elems;
		self.elems *= size;
		Ok(stride)
	}

	fn elems(&self) -> usize {
		self.elems
	}
}

//--------------------------------------------------------------------------------------------------

/// Dimension extents of a dense row-major array, outermost first.
///
/// Equality looks at the extents only, strides follow from them.
#[derive(Clone)]
pub struct Shape {
	dims: SmallVec<[usize; INLINE_DIMS]>,
	strides: SmallVec<[usize; INLINE_DIMS]>,
	elems: usize,
}

impl Shape {
	pub fn new(dims: &[usize]) -> Result<Self, TensorSizeOverflowError> {
		let mut strides: SmallVec<[usize; INLINE_DIMS]> = SmallVec::from_elem(0, dims.len());
		let mut counter = StrideCounter::new();
		for (stride, &size) in strides.iter_mut().zip(dims.iter()).rev() {
			*stride = counter.prepend_dim(size)?;
		}
		Ok(Self {
			dims: SmallVec::from_slice(dims),
			strides,
			elems: counter.elems(),
		})
	}

	pub fn ndim(&self) -> usize {
		self.dims.len()
	}

	pub fn elems(&self) -> usize {
		self.elems
	}

	pub fn dims(&self) -> &[usize] {
		&self.dims
	}

	pub fn dim(&self, index: usize) -> Result<usize, DimIndexOutOfBoundsError> {
		let i = check_index(index, self.dims.len())?;
		self.dims.get(i).copied().ok_or(DimIndexOutOfBoundsError)
	}

	/// Row-major strides, in elements.
	pub fn strides(&self) -> &[usize] {
		&self.strides
	}
}

impl PartialEq for Shape {
	fn eq(&self, other: &Self) -> bool {
		self.dims == other.dims
	}
}

impl Eq for Shape {}

impl PartialEq<[usize]> for Shape {
	fn eq(&self, other: &[usize]) -> bool {
		self.dims.as_slice() == other
	}
}

impl<const N: usize> PartialEq<[usize; N]> for Shape {
	fn eq(&self, other: &[usize; N]) -> bool {
		self.dims.as_slice() == other.as_slice()
	}
}

impl fmt::Display for Shape {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		write!(f, "[")?;
		for (i, size) in self.dims.iter().enumerate() {
			if i != 0 {
				write!(f, ", ")?;
			}
			write!(f, "{size}")?;
		}
		write!(f, "]")
	}
}

impl fmt::Debug for Shape {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		write!(f, "Shape{self}")
	}
}

//--------------------------------------------------------------------------------------------------


//--------------------------------------------------------------------------------------------------
