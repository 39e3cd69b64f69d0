//------------------------------------------------------------------------------
//
// Copyright 2025 Jiri Bobek. All rights reserved.
// License: GPL 3.0 or later. See LICENSE.txt for details.
//
//------------------------------------------------------------------------------

use std::process::ExitCode;

use micro_kernels::harness;
use micro_kernels::runner::RunnerConfig;

fn main() -> ExitCode {
	let config = RunnerConfig::from_env();

	let timestamps = if config.timestamps {
		stderrlog::Timestamp::Millisecond
	} else {
		stderrlog::Timestamp::Off
	};
	if let Err(err) = stderrlog::new()
		.module("micro_kernels")
		.verbosity(config.verbosity)
		.timestamp(timestamps)
		.init()
	{
		eprintln!("cannot initialize logging: {err}");
		return ExitCode::FAILURE;
	}
	for warning in &config.warnings {
		log::warn!("{warning}");
	}

	let summary = harness::run_all(&config);
	log::info!("{} passed, {} failed", summary.passed, summary.failed);
	if summary.all_passed() { ExitCode::SUCCESS } else { ExitCode::FAILURE }
}
