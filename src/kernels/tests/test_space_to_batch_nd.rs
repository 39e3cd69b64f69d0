//------------------------------------------------------------------------------
//
// Copyright 2025 Jiri Bobek. All rights reserved.
// License: GPL 3.0 or later. See LICENSE.txt for details.
//
//------------------------------------------------------------------------------

use assert_approx_eq::assert_approx_eq;

use crate::ErrPack;
use crate::kernels::{Node, space_to_batch_nd};
use crate::tensor::{DType, KernelError, TensorBuf};

//--------------------------------------------------------------------------------------------------

struct Case<'a> {
	block_shape: &'a [i32],
	paddings: &'a [i32],
	output_dims: &'a [usize],
}

impl Case<'_> {
	fn operands(&self) -> Result<(TensorBuf, TensorBuf), ErrPack<KernelError>> {
		let spatial = self.block_shape.len();
		let block_shape = TensorBuf::from_slice(&[spatial], self.block_shape)?;
		let paddings = TensorBuf::from_slice(&[self.paddings.len() / 2, 2], self.paddings)?;
		Ok((block_shape, paddings))
	}

	fn run(&self, input: &TensorBuf) -> Result<TensorBuf, ErrPack<KernelError>> {
		let (block_shape, paddings) = self.operands()?;
		let mut output = TensorBuf::zeros(self.output_dims, input.dtype())?;
		{
			let mut node = Node::new(
				[input.view(), block_shape.view(), paddings.view()],
				[output.view_mut()],
			);
			space_to_batch_nd::prepare(&node)?;
			space_to_batch_nd::eval(&mut node)?;
		}
		Ok(output)
	}

	fn prepare_err(&self, input: &TensorBuf, output_dtype: DType) -> Option<KernelError> {
		let (block_shape, paddings) = self.operands().ok()?;
		let mut output = TensorBuf::zeros(self.output_dims, output_dtype).ok()?;
		let node = Node::new(
			[input.view(), block_shape.view(), paddings.view()],
			[output.view_mut()],
		);
		space_to_batch_nd::prepare(&node).err().map(|e| e.code)
	}
}

//--------------------------------------------------------------------------------------------------

#[test]
fn test_3d_input() -> Result<(), ErrPack<KernelError>> {
	let values: Vec<i32> = (1..=16).collect();
	let input = TensorBuf::from_slice(&[1, 4, 4], &values)?;
	let case = Case {
		block_shape: &[2],
		paddings: &[0, 0],
		output_dims: &[2, 2, 4],
	};
	let output = case.run(&input)?;
	assert_eq!(
		output.to_vec::<i32>()?,
		[1, 2, 3, 4, 9, 10, 11, 12, 5, 6, 7, 8, 13, 14, 15, 16]
	);
	Ok(())
}

#[test]
fn test_4d_input() -> Result<(), ErrPack<KernelError>> {
	let values: Vec<i32> = (1..=16).collect();
	let input = TensorBuf::from_slice(&[1, 4, 4, 1], &values)?;
	let case = Case {
		block_shape: &[2, 2],
		paddings: &[0, 0, 0, 0],
		output_dims: &[4, 2, 2, 1],
	};
	let output = case.run(&input)?;
	assert_eq!(output.to_vec::<i32>()?, [1, 3, 9, 11, 2, 4, 10, 12, 5, 7, 13, 15, 6, 8, 14, 16]);
	Ok(())
}

#[test]
fn test_multiple_batches_and_depth() -> Result<(), ErrPack<KernelError>> {
	// [2, 2, 4, 2]: batch 0 holds 0..16, batch 1 holds 100..116
	let values: Vec<i64> = (0..16).chain(100..116).collect();
	let input = TensorBuf::from_slice(&[2, 2, 4, 2], &values)?;
	let case = Case {
		block_shape: &[1, 2],
		paddings: &[0, 0, 0, 0],
		output_dims: &[4, 2, 2, 2],
	};
	let output = case.run(&input)?;
	#[rustfmt::skip]
	let expected = [
		// block offset (0, 0), batch 0 and 1
		0, 1, 4, 5, 8, 9, 12, 13,
		100, 101, 104, 105, 108, 109, 112, 113,
		// block offset (0, 1), batch 0 and 1
		2, 3, 6, 7, 10, 11, 14, 15,
		102, 103, 106, 107, 110, 111, 114, 115,
	];
	assert_eq!(output.to_vec::<i64>()?, expected);
	Ok(())
}

#[test]
fn test_padding_is_zero() -> Result<(), ErrPack<KernelError>> {
	let input = TensorBuf::from_slice(&[1, 2, 2, 1], &[1.25_f32, 2.5, 3.75, 5.0])?;
	let case = Case {
		block_shape: &[2, 2],
		paddings: &[1, 1, 1, 1],
		output_dims: &[4, 2, 2, 1],
	};
	let output = case.run(&input)?.to_vec::<f32>()?;
	#[rustfmt::skip]
	let expected = [
		0.0, 0.0, 0.0, 5.0,
		0.0, 0.0, 3.75, 0.0,
		0.0, 2.5, 0.0, 0.0,
		1.25, 0.0, 0.0, 0.0,
	];
	assert_eq!(output.len(), expected.len());
	for (&a, &b) in output.iter().zip(expected.iter()) {
		assert_approx_eq!(a, b, 1e-6);
	}
	Ok(())
}

#[test]
fn test_unit_blocks_are_identity() -> Result<(), ErrPack<KernelError>> {
	let values: Vec<u8> = (0..24).collect();
	let input = TensorBuf::from_slice(&[2, 3, 2, 2], &values)?;
	let case = Case {
		block_shape: &[1, 1],
		paddings: &[0, 0, 0, 0],
		output_dims: &[2, 3, 2, 2],
	};
	assert_eq!(case.run(&input)?.to_vec::<u8>()?, values);

	let values: Vec<i8> = (-6..6).collect();
	let input = TensorBuf::from_slice(&[2, 3, 2], &values)?;
	let case = Case {
		block_shape: &[1],
		paddings: &[0, 0],
		output_dims: &[2, 3, 2],
	};
	assert_eq!(case.run(&input)?.to_vec::<i8>()?, values);
	Ok(())
}

//--------------------------------------------------------------------------------------------------

#[test]
fn test_padding_alignment() -> Result<(), ErrPack<KernelError>> {
	let values: Vec<i32> = (1..=16).collect();
	let input = TensorBuf::from_slice(&[1, 4, 4, 1], &values)?;
	let case = Case {
		block_shape: &[2, 3],
		paddings: &[0, 0, 0, 0],
		output_dims: &[6, 2, 1, 1],
	};
	assert_eq!(case.prepare_err(&input, DType::I32), Some(KernelError::PaddingAlignment));

	let (block_shape, paddings) = case.operands()?;
	let mut output = TensorBuf::from_slice(case.output_dims, &[-1_i32; 12])?;
	{
		let node = Node::new(
			[input.view(), block_shape.view(), paddings.view()],
			[output.view_mut()],
		);
		let err = space_to_batch_nd::prepare(&node).err().map(|e| e.code);
		assert_eq!(err, Some(KernelError::PaddingAlignment));
	}

	// nothing was copied
	assert_eq!(output.to_vec::<i32>()?, [-1; 12]);
	Ok(())
}

#[test]
fn test_shape_errors() -> Result<(), ErrPack<KernelError>> {
	// rank 2 input
	let input = TensorBuf::zeros(&[4, 4], DType::I32)?;
	let case = Case {
		block_shape: &[2],
		paddings: &[0, 0],
		output_dims: &[8, 2],
	};
	assert_eq!(case.prepare_err(&input, DType::I32), Some(KernelError::Shape));

	// block shape length does not match spatial dims
	let input = TensorBuf::zeros(&[1, 4, 4, 1], DType::I32)?;
	let case = Case {
		block_shape: &[2],
		paddings: &[0, 0],
		output_dims: &[2, 2, 4, 1],
	};
	assert_eq!(case.prepare_err(&input, DType::I32), Some(KernelError::Shape));

	// zero block
	let case = Case {
		block_shape: &[0, 2],
		paddings: &[0, 0, 0, 0],
		output_dims: &[1, 4, 2, 1],
	};
	assert_eq!(case.prepare_err(&input, DType::I32), Some(KernelError::Shape));

	// negative padding
	let case = Case {
		block_shape: &[2, 2],
		paddings: &[-2, 2, 0, 0],
		output_dims: &[4, 2, 2, 1],
	};
	assert_eq!(case.prepare_err(&input, DType::I32), Some(KernelError::Shape));
	Ok(())
}

#[test]
fn test_output_shape_mismatch() -> Result<(), ErrPack<KernelError>> {
	let input = TensorBuf::zeros(&[1, 4, 4, 1], DType::I32)?;
	for output_dims in [&[2, 2, 2, 1][..], &[4, 2, 2, 2], &[4, 1, 4, 1], &[4, 2, 2]] {
		let case = Case {
			block_shape: &[2, 2],
			paddings: &[0, 0, 0, 0],
			output_dims,
		};
		assert_eq!(
			case.prepare_err(&input, DType::I32),
			Some(KernelError::ShapeMismatch),
			"{output_dims:?}"
		);
	}
	Ok(())
}

#[test]
fn test_type_mismatch() -> Result<(), ErrPack<KernelError>> {
	let input = TensorBuf::zeros(&[1, 4, 4, 1], DType::I32)?;
	let case = Case {
		block_shape: &[2, 2],
		paddings: &[0, 0, 0, 0],
		output_dims: &[4, 2, 2, 1],
	};
	assert_eq!(case.prepare_err(&input, DType::F32), Some(KernelError::TypeMismatch));
	Ok(())
}

#[test]
fn test_unsupported_type_fails_in_eval() -> Result<(), ErrPack<KernelError>> {
	let input = TensorBuf::zeros(&[1, 2, 2, 1], DType::I16)?;
	let case = Case {
		block_shape: &[2, 2],
		paddings: &[0, 0, 0, 0],
		output_dims: &[4, 1, 1, 1],
	};
	assert_eq!(case.prepare_err(&input, DType::I16), None);
	let err = case.run(&input).err().map(|e| e.code);
	assert_eq!(err, Some(KernelError::UnsupportedType));
	Ok(())
}

//--------------------------------------------------------------------------------------------------
