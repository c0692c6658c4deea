use std::io;
use std::process::ExitCode;

use clap::{CommandFactory, Parser};
use env_logger::Env;

use rapl_run::config::{Config, SysPaths};
use rapl_run::cpu_type::{detect_cpu_model, report_detection};
use rapl_run::display::write_report;
use rapl_run::error::Error;
use rapl_run::measure_energy;

/// Samples the RAPL energy counters of one CPU for TIME seconds
#[derive(Debug, Parser)]
#[command(name = "rapl-run", override_usage = "rapl-run [-c core] [-h] TIME")]
struct Cli {
	/// Logical CPU whose counters are read
	#[arg(short = 'c', long = "core", value_name = "core", default_value_t = 0)]
	core: usize,

	/// Measurement duration in seconds, fractions allowed
	#[arg(value_name = "TIME")]
	time: Option<f64>,
}

fn exit_with(code: i32) -> ExitCode {
	// -1 becomes 255, like exit(-1)
	ExitCode::from(code as u8)
}

fn fail(error: &Error) -> ExitCode {
	eprintln!("{}", error);
	if !matches!(error, Error::InvalidDuration(_)) {
		eprintln!("Unable to read RAPL counters.");
	}
	exit_with(error.exit_code())
}

fn main() -> ExitCode {
	env_logger::Builder::from_env(Env::default().default_filter_or("warn")).init();

	let cli = match Cli::try_parse() {
		Ok(cli) => cli,
		Err(e) => {
			// --help lands here too and is not an error
			let code = if e.use_stderr() { -1 } else { 0 };
			let _ = e.print();
			return exit_with(code);
		},
	};

	let Some(time) = cli.time else {
		let _ = Cli::command().print_help();
		println!();
		return ExitCode::SUCCESS;
	};

	let config = match Config::new(cli.core, time, SysPaths::from_env()) {
		Ok(config) => config,
		Err(e) => return fail(&e),
	};

	let detection = detect_cpu_model(&config.paths.cpuinfo);
	if let Err(e) = report_detection(&detection, &mut io::stderr()) {
		eprintln!("Failed to write status: {}", e);
	}

	let measurement = match measure_energy(&config, detection.ok()) {
		Ok(measurement) => measurement,
		Err(e) => return fail(&e),
	};

	if let Err(e) = write_report(&measurement.results, &mut io::stdout().lock()) {
		eprintln!("Failed to write report: {}", e);
		return exit_with(127);
	}

	ExitCode::SUCCESS
}
