use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::debug;

use crate::constants::*;
use crate::error::{Error, Result};

/// Locations of the system surfaces the tool reads
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SysPaths {
	/// CPU identification text (`/proc/cpuinfo`)
	pub cpuinfo: PathBuf,

	/// The perf power PMU (`/sys/bus/event_source/devices/power`)
	pub event_source_dir: PathBuf,

	/// Parent of the per-core register files (`/dev/cpu`)
	pub msr_dir: PathBuf,

	/// Per-CPU sysfs entries (`/sys/devices/system/cpu`)
	pub cpu_sysfs_dir: PathBuf,
}

impl Default for SysPaths {
	fn default() -> Self {
		Self {
			cpuinfo: PathBuf::from(DEFAULT_CPUINFO_PATH),
			event_source_dir: PathBuf::from(DEFAULT_EVENT_SOURCE_DIR),
			msr_dir: PathBuf::from(DEFAULT_MSR_DIR),
			cpu_sysfs_dir: PathBuf::from(DEFAULT_CPU_SYSFS_DIR),
		}
	}
}

impl SysPaths {
	/// Default locations, each overridable through its environment variable
	pub fn from_env() -> Self {
		let defaults = Self::default();

		Self {
			cpuinfo: path_from_env(ENV_CPUINFO_PATH, defaults.cpuinfo),
			event_source_dir: path_from_env(ENV_EVENT_SOURCE_DIR, defaults.event_source_dir),
			msr_dir: path_from_env(ENV_MSR_DIR, defaults.msr_dir),
			cpu_sysfs_dir: path_from_env(ENV_CPU_SYSFS_DIR, defaults.cpu_sysfs_dir),
		}
	}
}

fn path_from_env(var: &str, default: PathBuf) -> PathBuf {
	match env::var_os(var) {
		Some(value) if !value.is_empty() => {
			debug!("{} overridden by {}", default.display(), var);
			PathBuf::from(value)
		},
		_ => default,
	}
}

/// Parameters of one measurement run
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
	/// Logical CPU whose counters are read
	pub core: usize,

	/// Length of the measurement window in seconds
	pub duration_secs: f64,

	pub paths: SysPaths,
}

impl Config {
	/// Builds a run configuration; the duration must be a positive, sleepable span
	pub fn new(core: usize, duration_secs: f64, paths: SysPaths) -> Result<Self> {
		window_duration(duration_secs)?;

		Ok(Self {
			core,
			duration_secs,
			paths,
		})
	}

	/// Fails with [`Error::NoSuchCpu`] when sysfs lists CPUs but not the requested one
	///
	/// Nothing is checked when the sysfs directory itself is missing; the
	/// counter backends report a missing CPU on their own.
	pub fn check_core_exists(&self) -> Result<()> {
		let sysfs = &self.paths.cpu_sysfs_dir;
		if !sysfs.is_dir() {
			return Ok(());
		}

		if cpu_entry(sysfs, self.core).exists() {
			Ok(())
		} else {
			Err(Error::NoSuchCpu(self.core))
		}
	}
}

/// Converts a window length in seconds into a [`Duration`]
///
/// Rejects zero, negative and non-finite values as well as anything too large
/// for a [`Duration`].
pub fn window_duration(duration_secs: f64) -> Result<Duration> {
	if duration_secs <= 0.0 {
		return Err(Error::InvalidDuration(duration_secs));
	}

	Duration::try_from_secs_f64(duration_secs).map_err(|_| Error::InvalidDuration(duration_secs))
}

fn cpu_entry(sysfs: &Path, core: usize) -> PathBuf {
	sysfs.join(format!("cpu{}", core))
}

#[cfg(test)]
mod tests {
	use std::fs;

	use serial_test::serial;

	use super::*;

	fn clear_env() {
		for var in [ENV_CPUINFO_PATH, ENV_EVENT_SOURCE_DIR, ENV_MSR_DIR, ENV_CPU_SYSFS_DIR] {
			unsafe {
				env::remove_var(var);
			}
		}
	}

	#[test]
	#[serial]
	fn defaults_without_overrides() {
		clear_env();
		let paths = SysPaths::from_env();
		assert_eq!(paths, SysPaths::default());
		assert_eq!(paths.event_source_dir, Path::new("/sys/bus/event_source/devices/power"));
	}

	#[test]
	#[serial]
	fn environment_overrides_paths() {
		clear_env();
		unsafe {
			env::set_var(ENV_EVENT_SOURCE_DIR, "/tmp/fake-power");
			env::set_var(ENV_MSR_DIR, "");
		}

		let paths = SysPaths::from_env();
		assert_eq!(paths.event_source_dir, Path::new("/tmp/fake-power"));
		assert_eq!(paths.msr_dir, Path::new(DEFAULT_MSR_DIR));

		clear_env();
	}

	#[test]
	fn rejects_non_positive_durations() {
		for duration in [0.0, -1.0, f64::NAN, f64::INFINITY, 1e20] {
			assert!(matches!(
				Config::new(0, duration, SysPaths::default()),
				Err(Error::InvalidDuration(_))
			));
		}
		assert!(Config::new(0, 2.5, SysPaths::default()).is_ok());
		assert_eq!(window_duration(0.25).unwrap(), Duration::from_millis(250));
	}

	#[test]
	fn missing_core_is_reported() {
		let dir = tempfile::tempdir().unwrap();
		fs::create_dir(dir.path().join("cpu0")).unwrap();
		fs::create_dir(dir.path().join("cpu1")).unwrap();

		let paths = SysPaths {
			cpu_sysfs_dir: dir.path().to_path_buf(),
			..SysPaths::default()
		};

		assert!(Config::new(1, 1.0, paths.clone()).unwrap().check_core_exists().is_ok());
		assert!(matches!(
			Config::new(8, 1.0, paths).unwrap().check_core_exists(),
			Err(Error::NoSuchCpu(8))
		));
	}
}
