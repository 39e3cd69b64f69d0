//------------------------------------------------------------------------------
//
// Copyright 2025 Jiri Bobek. All rights reserved.
// License: GPL 3.0 or later. See LICENSE.txt for details.
//
//------------------------------------------------------------------------------

use std::borrow::Cow;

use crate::ErrPack;

use super::dim_index::DimIndexOutOfBoundsError;
use super::dtype::DTypeMismatchError;
use super::shape::TensorSizeOverflowError;

//--------------------------------------------------------------------------------------------------

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub struct InvalidBufferSizeError;

//--------------------------------------------------------------------------------------------------

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum KernelError {
	/// Rank, operand count or parameter tensor layout is not acceptable.
	Shape,
	/// The declared output shape differs from the one derived from the inputs.
	ShapeMismatch,
	PermutationRange,
	PaddingAlignment,
	TypeMismatch,
	UnsupportedType,
	InvalidBufferSize,
	TensorSizeOverflow,
	DimIndexOutOfBounds,
	/// `invoke()` was called on a node whose prepare phase did not succeed.
	PrepareFailed,
}

/// Builds an error carrying a diagnostic and hands the diagnostic to the logger.
#[cold]
#[inline(never)]
pub fn report_error(
	code: KernelError,
	message: impl Into<Cow<'static, str>>,
) -> ErrPack<KernelError> {
	let message = message.into();
	log::error!("{message}");
	ErrPack::with_message(code, message)
}

/// Returns early with `report_error()` when the condition does not hold.
#[macro_export]
macro_rules! ensure {
	($cond:expr, $code:expr, $($fmt:tt)+) => {
		if !$cond {
			return Err($crate::tensor::error::report_error($code, format!($($fmt)+)));
		}
	};
}

//--------------------------------------------------------------------------------------------------

impl From<DTypeMismatchError> for ErrPack<KernelError> {
	fn from(_: DTypeMismatchError) -> Self {
		Self {
			code: KernelError::TypeMismatch,
			extra: None,
		}
	}
}

impl From<InvalidBufferSizeError> for ErrPack<KernelError> {
	fn from(_: InvalidBufferSizeError) -> Self {
		Self {
			code: KernelError::InvalidBufferSize,
			extra: None,
		}
	}
}

impl From<TensorSizeOverflowError> for ErrPack<KernelError> {
	fn from(_: TensorSizeOverflowError) -> Self {
		Self {
			code: KernelError::TensorSizeOverflow,
			extra: None,
		}
	}
}

impl From<DimIndexOutOfBoundsError> for ErrPack<KernelError> {
	fn from(_: DimIndexOutOfBoundsError) -> Self {
		Self {
			code: KernelError::DimIndexOutOfBounds,
			extra: None,
		}
	}
}

//--------------------------------------------------------------------------------------------------
