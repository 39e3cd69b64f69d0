//------------------------------------------------------------------------------
//
// Copyright 2025 Jiri Bobek. All rights reserved.
// License: GPL 3.0 or later. See LICENSE.txt for details.
//
//------------------------------------------------------------------------------

use crate::cold_path;

//------------------------------------------------------------------------------

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub struct DimIndexOutOfBoundsError;

//--------------------------------------------------------------------------------------------------

/// Allowed indexes are `0 ..< ndim`.
pub fn check_index(index: usize, ndim: usize) -> Result<usize, DimIndexOutOfBoundsError> {
	if index < ndim {
		Ok(index)
	} else {
		cold_path();
		Err(DimIndexOutOfBoundsError)
	}
}

/// Resolves an axis stored in a parameter tensor.
///
/// Parameter tensors always use absolute axes, so negative values are rejected.
pub fn resolve_axis(raw: i32, ndim: usize) -> Result<usize, DimIndexOutOfBoundsError> {
	match usize::try_from(raw) {
		Ok(axis) => check_index(axis, ndim),
		Err(_) => {
			cold_path();
			Err(DimIndexOutOfBoundsError)
		},
	}
}

//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_resolve() {
		assert_eq!(check_index(2, 3), Ok(2));
		assert_eq!(check_index(3, 3), Err(DimIndexOutOfBoundsError));

		assert_eq!(resolve_axis(0, 3), Ok(0));
		assert_eq!(resolve_axis(2, 3), Ok(2));
		assert_eq!(resolve_axis(-1, 3), Err(DimIndexOutOfBoundsError));
		assert_eq!(resolve_axis(3, 3), Err(DimIndexOutOfBoundsError));
		assert_eq!(resolve_axis(0, 0), Err(DimIndexOutOfBoundsError));
	}
}

//--------------------------------------------------------------------------------------------------
