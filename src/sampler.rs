use std::io;
use std::thread;

use log::debug;

use crate::backend::EnergyBackend;
use crate::config::window_duration;
use crate::constants::NANOS_PER_SEC;
use crate::error::{Error, Result};
use crate::power::{Measurement, SampleResult};

/// A reading of the raw monotonic clock, immune to wall-clock adjustments
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Timestamp {
	pub secs: i64,
	pub nanos: i64,
}

impl Timestamp {
	pub fn now() -> Result<Self> {
		let mut ts = libc::timespec { tv_sec: 0, tv_nsec: 0 };

		// SAFETY: `ts` is a valid, writable timespec
		if unsafe { libc::clock_gettime(libc::CLOCK_MONOTONIC_RAW, &mut ts) } != 0 {
			return Err(Error::Clock(io::Error::last_os_error()));
		}

		Ok(Self {
			secs: ts.tv_sec as i64,
			nanos: ts.tv_nsec as i64,
		})
	}

	/// `self - earlier`, borrowing a second when the nanosecond part underflows
	pub fn since(&self, earlier: &Timestamp) -> Timestamp {
		if self.nanos < earlier.nanos {
			Timestamp {
				secs: self.secs - earlier.secs - 1,
				nanos: NANOS_PER_SEC + self.nanos - earlier.nanos,
			}
		} else {
			Timestamp {
				secs: self.secs - earlier.secs,
				nanos: self.nanos - earlier.nanos,
			}
		}
	}

	pub fn as_secs_f64(&self) -> f64 {
		self.secs as f64 + self.nanos as f64 / NANOS_PER_SEC as f64
	}
}

/// The interval over which one sample is taken
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeasurementWindow {
	pub start: Timestamp,
	pub end: Timestamp,
}

impl MeasurementWindow {
	pub fn elapsed(&self) -> Timestamp {
		self.end.since(&self.start)
	}

	/// Elapsed seconds, usable as a power divisor
	pub fn elapsed_seconds(&self) -> Result<f64> {
		let elapsed = self.elapsed().as_secs_f64();
		if elapsed > 0.0 {
			Ok(elapsed)
		} else {
			Err(Error::DegenerateWindow(elapsed))
		}
	}
}

/// Blocks the calling thread for one window and returns a row per measured domain
///
/// All rows share the same elapsed time. The wait cannot be cut short.
pub fn run(backend: &mut dyn EnergyBackend, duration_secs: f64) -> Result<Measurement> {
	let duration = window_duration(duration_secs)?;

	backend.arm()?;

	let start = Timestamp::now()?;
	thread::sleep(duration);
	let end = Timestamp::now()?;

	let window = MeasurementWindow { start, end };

	// Collect even when the window is unusable so the counters are released first
	let energies = backend.collect();
	let elapsed_seconds = window.elapsed_seconds()?;
	let energies = energies?;

	debug!(
		"{} window: requested {} s, measured {} s",
		backend.name(),
		duration_secs,
		elapsed_seconds
	);

	let results = energies
		.into_iter()
		.map(|(domain, joules)| SampleResult::new(domain, joules, elapsed_seconds))
		.collect();

	Ok(Measurement {
		backend: backend.name(),
		elapsed_seconds,
		results,
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::display::write_report;
	use crate::domain::{DomainDescriptor, EnergyDomain};

	/// Backend returning fixed joules for a chosen set of domains
	#[derive(Debug)]
	struct FixedBackend {
		energies: Vec<(EnergyDomain, f64)>,
		armed: bool,
		collected: bool,
	}

	impl FixedBackend {
		fn new(energies: &[(EnergyDomain, f64)]) -> Self {
			Self {
				energies: energies.to_vec(),
				armed: false,
				collected: false,
			}
		}
	}

	impl EnergyBackend for FixedBackend {
		fn name(&self) -> &'static str {
			"fixed"
		}

		fn domains(&self) -> Vec<DomainDescriptor> {
			self.energies
				.iter()
				.map(|&(domain, _)| DomainDescriptor {
					domain,
					event_code: 0,
					scale: 1.0,
					unit: "Joules".into(),
					available: true,
				})
				.collect()
		}

		fn arm(&mut self) -> Result<()> {
			self.armed = true;
			Ok(())
		}

		fn collect(&mut self) -> Result<Vec<(EnergyDomain, f64)>> {
			assert!(self.armed);
			self.collected = true;
			Ok(self.energies.clone())
		}
	}

	#[test]
	fn borrows_a_second_when_nanos_underflow() {
		let start = Timestamp {
			secs: 10,
			nanos: 900_000_000,
		};
		let end = Timestamp {
			secs: 11,
			nanos: 100_000_000,
		};

		let elapsed = end.since(&start);
		assert_eq!(elapsed, Timestamp {
			secs: 0,
			nanos: 200_000_000
		});
		assert!((elapsed.as_secs_f64() - 0.2).abs() < 1e-12);
	}

	#[test]
	fn plain_difference_without_borrow() {
		let start = Timestamp { secs: 3, nanos: 250 };
		let end = Timestamp { secs: 5, nanos: 750 };
		assert_eq!(end.since(&start), Timestamp { secs: 2, nanos: 500 });
	}

	#[test]
	fn empty_window_is_rejected() {
		let at = Timestamp { secs: 4, nanos: 2 };
		let window = MeasurementWindow { start: at, end: at };
		assert!(matches!(window.elapsed_seconds(), Err(Error::DegenerateWindow(_))));
	}

	#[test]
	fn clock_is_monotonic() {
		let a = Timestamp::now().unwrap();
		let b = Timestamp::now().unwrap();
		assert!(b >= a);
	}

	#[test]
	fn window_matches_requested_duration() {
		let mut backend = FixedBackend::new(&[(EnergyDomain::Pkg, 1.0)]);
		let measurement = run(&mut backend, 0.2).unwrap();

		assert!(backend.collected);
		assert!(measurement.elapsed_seconds >= 0.2);
		assert!(measurement.elapsed_seconds < 0.2 + 0.02);
	}

	#[test]
	fn rows_share_window_and_derive_power() {
		let mut backend = FixedBackend::new(&[
			(EnergyDomain::Cores, 7.24),
			(EnergyDomain::Gpu, 1.56),
			(EnergyDomain::Pkg, 16.28),
			(EnergyDomain::Ram, 4.35),
		]);
		let measurement = run(&mut backend, 0.05).unwrap();

		assert_eq!(measurement.results.len(), 4);
		let domains: Vec<_> = measurement.results.iter().map(|r| r.domain).collect();
		assert_eq!(domains, EnergyDomain::ALL);

		for row in &measurement.results {
			assert_eq!(row.elapsed_seconds, measurement.elapsed_seconds);
			assert_eq!(row.avg_power_watts, row.energy_joules / row.elapsed_seconds);
			assert!(row.avg_power_watts >= 0.0);
		}
	}

	#[test]
	fn zero_duration_is_rejected() {
		let mut backend = FixedBackend::new(&[(EnergyDomain::Pkg, 1.0)]);
		assert!(matches!(run(&mut backend, 0.0), Err(Error::InvalidDuration(_))));
		assert!(matches!(run(&mut backend, 1e20), Err(Error::InvalidDuration(_))));
		assert!(!backend.armed);
	}

	#[test]
	fn absent_gpu_is_left_out_of_the_report() {
		let mut backend = FixedBackend::new(&[
			(EnergyDomain::Cores, 7.24),
			(EnergyDomain::Pkg, 16.28),
			(EnergyDomain::Ram, 4.35),
		]);
		let measurement = run(&mut backend, 0.02).unwrap();

		let mut out = Vec::new();
		write_report(&measurement.results, &mut out).unwrap();
		let report = String::from_utf8(out).unwrap();
		let lines: Vec<_> = report.lines().collect();

		assert_eq!(lines.len(), 4);
		assert!(lines[1].starts_with("energy-cores, "));
		assert!(lines[2].starts_with("energy-pkg, "));
		assert!(lines[3].starts_with("energy-ram, "));
		assert!(!report.contains("energy-gpu"));
	}
}
