//------------------------------------------------------------------------------
//
// Copyright 2025 Jiri Bobek. All rights reserved.
// License: GPL 3.0 or later. See LICENSE.txt for details.
//
//------------------------------------------------------------------------------

use std::fmt::Debug;

use crate::cold_path;

use super::HasDType;
use super::error::InvalidBufferSizeError;

//--------------------------------------------------------------------------------------------------

/// A concrete element type that can be stored in a type-erased tensor buffer.
pub trait Element: HasDType + Copy + PartialEq + Debug + 'static {
	type Bytes: Copy + Default + AsRef<[u8]> + AsMut<[u8]>;

	const ZERO: Self;
	const BYTES: usize = std::mem::size_of::<Self>();

	fn to_bytes(self) -> Self::Bytes;
	fn from_bytes(bytes: Self::Bytes) -> Self;

	/// `src` must be exactly `Self::BYTES` long.
	#[inline]
	fn from_slice(src: &[u8]) -> Self {
		let mut bytes = Self::Bytes::default();
		bytes.as_mut().copy_from_slice(src);
		Self::from_bytes(bytes)
	}
}

macro_rules! impl_element {
	($($t:ty => $zero:expr),* $(,)?) => {
		$(
			impl Element for $t {
				type Bytes = [u8; std::mem::size_of::<$t>()];

				const ZERO: Self = $zero;

				#[inline]
				fn to_bytes(self) -> Self::Bytes {
					self.to_ne_bytes()
				}

				#[inline]
				fn from_bytes(bytes: Self::Bytes) -> Self {
					Self::from_ne_bytes(bytes)
				}
			}
		)*
	};
}

impl_element!(
	i8 => 0,
	u8 => 0,
	i16 => 0,
	u16 => 0,
	i32 => 0,
	u32 => 0,
	i64 => 0,
	u64 => 0,
	f32 => 0.0,
);

impl Element for bool {
	type Bytes = [u8; 1];

	const ZERO: Self = false;

	#[inline]
	fn to_bytes(self) -> Self::Bytes {
		[u8::from(self)]
	}

	#[inline]
	fn from_bytes(bytes: Self::Bytes) -> Self {
		bytes != [0]
	}
}

//--------------------------------------------------------------------------------------------------

/// Fills every `W`-byte element of `dst` from `src`, reading element `src_index`
/// for each destination element in order.
///
/// This is pure data movement, so one instantiation serves every element type of width `W`.
pub fn gather_elems<const W: usize>(
	dst: &mut [u8],
	src: &[u8],
	src_indexes: impl Iterator<Item = usize>,
) -> Result<(), InvalidBufferSizeError> {
	for (d, index) in dst.chunks_exact_mut(W).zip(src_indexes) {
		let start = index * W;
		let Some(s) = src.get(start..start + W) else {
			cold_path();
			return Err(InvalidBufferSizeError);
		};
		d.copy_from_slice(s);
	}
	Ok(())
}

/// Writes `T::ZERO` into every element of `dst`.
pub fn fill_zero<T: Element>(dst: &mut [u8]) {
	let zero = T::ZERO.to_bytes();
	for d in dst.chunks_exact_mut(T::BYTES) {
		d.copy_from_slice(zero.as_ref());
	}
}

//--------------------------------------------------------------------------------------------------


//--------------------------------------------------------------------------------------------------
