//------------------------------------------------------------------------------
//
// Copyright 2025 Jiri Bobek. All rights reserved.
// License: GPL 3.0 or later. See LICENSE.txt for details.
//
//------------------------------------------------------------------------------

use std::str::FromStr;

use crate::kernels::{Node, Registration};
use crate::tensor::KernelError;
use crate::tensor::error::report_error;
use crate::{ErrPack, cold_path};

//--------------------------------------------------------------------------------------------------

pub const ENV_VERBOSITY: &str = "MICRO_KERNELS_VERBOSITY";
pub const ENV_TIMESTAMPS: &str = "MICRO_KERNELS_TIMESTAMPS";
pub const ENV_STOP_ON_FAILURE: &str = "MICRO_KERNELS_STOP_ON_FAILURE";

/// Settings of the self-test binary.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunnerConfig {
	/// 0 = errors only ... 4 = trace
	pub verbosity: usize,
	pub timestamps: bool,
	pub stop_on_failure: bool,

	/// Variables that were set but could not be parsed.
	/// They are collected here because the logger does not exist yet when the config is read.
	pub warnings: Vec<String>,
}

impl Default for RunnerConfig {
	fn default() -> Self {
		Self {
			verbosity: 2,
			timestamps: false,
			stop_on_failure: false,
			warnings: Vec::new(),
		}
	}
}

impl RunnerConfig {
	pub fn from_env() -> Self {
		Self::from_lookup(|key| std::env::var(key).ok())
	}

	pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
		let mut config = Self::default();
		if let Some(v) = lookup(ENV_VERBOSITY) {
			match v.trim().parse::<usize>() {
				Ok(n) if n <= 4 => config.verbosity = n,
				_ => config.warnings.push(format!("{ENV_VERBOSITY}={v} is not in 0..=4")),
			}
		}
		if let Some(v) = lookup(ENV_TIMESTAMPS) {
			match parse_flag(&v) {
				Ok(b) => config.timestamps = b,
				Err(()) => config.warnings.push(format!("{ENV_TIMESTAMPS}={v} is not a flag")),
			}
		}
		if let Some(v) = lookup(ENV_STOP_ON_FAILURE) {
			match parse_flag(&v) {
				Ok(b) => config.stop_on_failure = b,
				Err(()) => config.warnings.push(format!("{ENV_STOP_ON_FAILURE}={v} is not a flag")),
			}
		}
		config
	}
}

fn parse_flag(v: &str) -> Result<bool, ()> {
	match v.trim() {
		"1" | "true" | "yes" | "on" => Ok(true),
		"0" | "false" | "no" | "off" => Ok(false),
		other => bool::from_str(other).map_err(|_| ()),
	}
}

//--------------------------------------------------------------------------------------------------

/// Drives one kernel through init, prepare and invoke for a single node.
pub struct KernelRunner<'r, 'a> {
	registration: &'r Registration,
	node: Node<'a>,
	initialized: bool,
	prepared: bool,
}

impl<'r, 'a> KernelRunner<'r, 'a> {
	pub fn new(registration: &'r Registration, node: Node<'a>) -> Self {
		Self {
			registration,
			node,
			initialized: false,
			prepared: false,
		}
	}

	/// Runs the kernel's `init` once. Later calls do nothing.
	pub fn init(&mut self, init_data: &[u8]) -> Result<(), ErrPack<KernelError>> {
		if self.initialized {
			return Ok(());
		}
		if let Some(init) = self.registration.init {
			init(init_data)?;
		}
		self.initialized = true;
		Ok(())
	}

	pub fn prepare(&mut self) -> Result<(), ErrPack<KernelError>> {
		self.prepared = false;
		if !self.initialized {
			cold_path();
			return Err(report_error(
				KernelError::PrepareFailed,
				format!("{} cannot be prepared before init.", self.registration.name),
			));
		}
		(self.registration.prepare)(&self.node)?;
		self.prepared = true;
		Ok(())
	}

	/// Fails without touching the output unless the last prepare succeeded.
	pub fn invoke(&mut self) -> Result<(), ErrPack<KernelError>> {
		if !self.prepared {
			cold_path();
			return Err(report_error(
				KernelError::PrepareFailed,
				format!("{} cannot be invoked before prepare succeeded.", self.registration.name),
			));
		}
		(self.registration.eval)(&mut self.node)
	}
}

impl Drop for KernelRunner<'_, '_> {
	fn drop(&mut self) {
		if !self.initialized {
			return;
		}
		if let Some(free) = self.registration.free {
			free();
		}
	}
}

//--------------------------------------------------------------------------------------------------


//--------------------------------------------------------------------------------------------------
