//------------------------------------------------------------------------------
//
// Copyright 2025 Jiri Bobek. All rights reserved.
// License: GPL 3.0 or later. See LICENSE.txt for details.
//
//------------------------------------------------------------------------------

use std::alloc::{GlobalAlloc, Layout, System};
use std::cell::Cell;

use crate::ErrPack;
use crate::kernels::{Node, space_to_batch_nd, transpose};
use crate::tensor::{DType, KernelError, TensorBuf};

//--------------------------------------------------------------------------------------------------

// Tests run on parallel threads, so every thread counts its own allocations.
thread_local! {
	static allocations: Cell<usize> = const { Cell::new(0) };
}

struct CountingAllocator;

unsafe impl GlobalAlloc for CountingAllocator {
	unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
		let _ = allocations.try_with(|n| n.set(n.get() + 1));
		unsafe { System.alloc(layout) }
	}

	unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
		unsafe { System.dealloc(ptr, layout) }
	}
}

#[global_allocator]
static allocator: CountingAllocator = CountingAllocator;

fn count_allocations<R>(f: impl FnOnce() -> R) -> (R, usize) {
	let before = allocations.with(Cell::get);
	let result = f();
	let after = allocations.with(Cell::get);
	(result, after - before)
}

//--------------------------------------------------------------------------------------------------

#[test]
fn test_transpose_eval_does_not_allocate() -> Result<(), ErrPack<KernelError>> {
	let values: Vec<i32> = (1..=24).collect();
	let input = TensorBuf::from_slice(&[2, 3, 4], &values)?;
	let perm = TensorBuf::from_slice(&[3], &[2_i32, 0, 1])?;
	let mut output = TensorBuf::zeros(&[4, 2, 3], DType::I32)?;
	{
		let mut node = Node::new([input.view(), perm.view()], [output.view_mut()]);
		transpose::prepare(&node)?;
		let (result, count) = count_allocations(|| transpose::eval(&mut node));
		result?;
		assert_eq!(count, 0);
	}
	assert_eq!(output.to_vec::<i32>()?.get(..6), Some(&[1, 5, 9, 13, 17, 21][..]));
	Ok(())
}

#[test]
fn test_transpose_rank_5_eval_does_not_allocate() -> Result<(), ErrPack<KernelError>> {
	let values: Vec<u64> = (0..48).collect();
	let input = TensorBuf::from_slice(&[2, 3, 1, 4, 2], &values)?;
	let perm = TensorBuf::from_slice(&[5], &[4_i32, 3, 2, 1, 0])?;
	let mut output = TensorBuf::zeros(&[2, 4, 1, 3, 2], DType::U64)?;
	let mut node = Node::new([input.view(), perm.view()], [output.view_mut()]);
	transpose::prepare(&node)?;
	let (result, count) = count_allocations(|| transpose::eval(&mut node));
	result?;
	assert_eq!(count, 0);
	Ok(())
}

#[test]
fn test_space_to_batch_nd_eval_does_not_allocate() -> Result<(), ErrPack<KernelError>> {
	let input = TensorBuf::from_slice(&[1, 2, 2, 1], &[1.5_f32, 2.5, 3.5, 4.5])?;
	let block_shape = TensorBuf::from_slice(&[2], &[2_i32, 2])?;
	let paddings = TensorBuf::from_slice(&[2, 2], &[1_i32, 1, 1, 1])?;
	let mut output = TensorBuf::zeros(&[4, 2, 2, 1], DType::F32)?;
	{
		let mut node = Node::new(
			[input.view(), block_shape.view(), paddings.view()],
			[output.view_mut()],
		);
		space_to_batch_nd::prepare(&node)?;
		let (result, count) = count_allocations(|| space_to_batch_nd::eval(&mut node));
		result?;
		assert_eq!(count, 0);
	}
	assert_eq!(output.to_vec::<f32>()?.get(12), Some(&1.5));
	Ok(())
}

//--------------------------------------------------------------------------------------------------
