//------------------------------------------------------------------------------
//
// Copyright 2025 Jiri Bobek. All rights reserved.
// License: GPL 3.0 or later. See LICENSE.txt for details.
//
//------------------------------------------------------------------------------

use std::fmt;

//--------------------------------------------------------------------------------------------------

pub trait HasDType {
	const dtype: DType;
}

impl HasDType for i8 {
	const dtype: DType = DType::I8;
}

impl HasDType for u8 {
	const dtype: DType = DType::U8;
}

impl HasDType for i16 {
	const dtype: DType = DType::I16;
}

impl HasDType for u16 {
	const dtype: DType = DType::U16;
}

impl HasDType for i32 {
	const dtype: DType = DType::I32;
}

impl HasDType for u32 {
	const dtype: DType = DType::U32;
}

impl HasDType for i64 {
	const dtype: DType = DType::I64;
}

impl HasDType for u64 {
	const dtype: DType = DType::U64;
}

impl HasDType for f32 {
	const dtype: DType = DType::F32;
}

impl HasDType for bool {
	const dtype: DType = DType::Bool;
}

//--------------------------------------------------------------------------------------------------

/// Element type tag carried by every tensor handle.
///
/// The set is closed. Kernels that only move data look at `bytes()`,
/// kernels that have to produce values (e.g. padding zeros) match on the tag itself.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum DType {
	I8,
	U8,
	I16,
	U16,
	I32,
	U32,
	I64,
	U64,
	F32,
	Bool,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum DTypeKind {
	Float,
	Int,
	Uint,
	Bool,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub struct DTypeMismatchError;

impl DType {
	pub const fn kind(self) -> DTypeKind {
		match self {
			Self::I8 | Self::I16 | Self::I32 | Self::I64 => DTypeKind::Int,
			Self::U8 | Self::U16 | Self::U32 | Self::U64 => DTypeKind::Uint,
			Self::F32 => DTypeKind::Float,
			Self::Bool => DTypeKind::Bool,
		}
	}

	/// Storage bits. `bool` is stored in a whole byte.
	pub const fn bits(self) -> usize {
		match self {
			Self::I8 | Self::U8 | Self::Bool => 8,
			Self::I16 | Self::U16 => 16,
			Self::I32 | Self::U32 | Self::F32 => 32,
			Self::I64 | Self::U64 => 64,
		}
	}

	pub const fn bytes(self) -> usize {
		self.bits() / 8
	}

	pub fn array_bytes(self, elems: usize) -> Option<usize> {
		self.bytes().checked_mul(elems)
	}
}

impl fmt::Display for DType {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		let kind = match self.kind() {
			DTypeKind::Float => "f",
			DTypeKind::Int => "i",
			DTypeKind::Uint => "u",
			DTypeKind::Bool => return write!(f, "bool"),
		};
		write!(f, "{}{}", kind, self.bits())
	}
}

//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_display() {
		let names = [
			(DType::I8, "i8"),
			(DType::U8, "u8"),
			(DType::I16, "i16"),
			(DType::U16, "u16"),
			(DType::I32, "i32"),
			(DType::U32, "u32"),
			(DType::I64, "i64"),
			(DType::U64, "u64"),
			(DType::F32, "f32"),
			(DType::Bool, "bool"),
		];
		for (dtype, name) in names {
			assert_eq!(dtype.to_string(), name);
		}
	}

	#[test]
	fn test_bytes() {
		assert_eq!(DType::Bool.bytes(), 1);
		assert_eq!(DType::I16.bytes(), 2);
		assert_eq!(DType::F32.bytes(), 4);
		assert_eq!(DType::U64.bytes(), 8);
		assert_eq!(DType::I32.array_bytes(6), Some(24));
		assert_eq!(DType::I64.array_bytes(usize::MAX), None);
		assert_eq!(<f32 as HasDType>::dtype, DType::F32);
	}
}

//--------------------------------------------------------------------------------------------------
