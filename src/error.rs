use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::domain::EnergyDomain;

pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can end a measurement run
///
/// Each variant maps to a distinct process exit status via [`Error::exit_code`].
#[derive(Debug, Error)]
pub enum Error {
	/// The perf power PMU is not exposed by this kernel
	#[error("No perf_event rapl support found (requires Linux 3.14)")]
	NoInterface,

	/// Neither the perf power PMU nor the MSR driver can be used
	#[error("Unable to read RAPL counters: {0}")]
	NoCounterInterface(String),

	#[error("Permission denied opening {resource}; {hint}")]
	PermissionDenied { resource: String, hint: &'static str },

	#[error("No CPU {0}")]
	NoSuchCpu(usize),

	#[error("CPU {0} doesn't support MSRs")]
	NoMsrSupport(usize),

	#[error("{path}: {source}")]
	Io {
		path: PathBuf,
		#[source]
		source: io::Error,
	},

	#[error("{path}: short read at offset {offset:#x} ({got} of 8 bytes)")]
	ShortRead { path: PathBuf, offset: u64, got: usize },

	#[error("{path}: cannot parse {content:?}")]
	Parse { path: PathBuf, content: String },

	/// Every available domain failed to open
	#[error("No RAPL domain could be opened on CPU {0}")]
	NoDomains(usize),

	#[error("Failed to read {domain} counter: {source}")]
	CounterRead {
		domain: EnergyDomain,
		#[source]
		source: io::Error,
	},

	#[error("Measurement duration must be a positive number of seconds, got {0}")]
	InvalidDuration(f64),

	#[error("Measurement window elapsed {0} seconds")]
	DegenerateWindow(f64),

	#[error("Monotonic clock unavailable: {0}")]
	Clock(#[source] io::Error),
}

impl Error {
	pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
		Error::Io {
			path: path.into(),
			source,
		}
	}

	/// Process exit status for this failure
	pub fn exit_code(&self) -> i32 {
		match self {
			Error::NoSuchCpu(_) => 2,
			Error::NoMsrSupport(_) => 3,
			Error::InvalidDuration(_) => 64,
			Error::PermissionDenied { .. } => 126,
			Error::Io { .. } | Error::ShortRead { .. } | Error::Parse { .. } | Error::CounterRead { .. } => 127,
			Error::NoInterface
			| Error::NoCounterInterface(_)
			| Error::NoDomains(_)
			| Error::DegenerateWindow(_)
			| Error::Clock(_) => -1,
		}
	}
}
