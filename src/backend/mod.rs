pub mod msr;
pub mod perf;

use std::fmt::Debug;

use log::{info, warn};

use crate::config::Config;
use crate::cpu_type::CpuModel;
use crate::domain::{self, DomainDescriptor, EnergyDomain};
use crate::error::{Error, Result};

use self::msr::MsrBackend;
use self::perf::PerfBackend;

/// A source of RAPL energy readings for one logical CPU
///
/// Implementations own every OS resource they open and release it on drop.
pub trait EnergyBackend: Debug {
	/// Short name used in logs
	fn name(&self) -> &'static str;

	/// Descriptors of the domains this backend will report, in report order
	fn domains(&self) -> Vec<DomainDescriptor>;

	/// Called immediately before the window starts
	fn arm(&mut self) -> Result<()>;

	/// Reads the energy consumed since [`EnergyBackend::arm`] and releases the counters
	///
	/// Returns joules per measured domain, in report order.
	fn collect(&mut self) -> Result<Vec<(EnergyDomain, f64)>>;
}

/// Picks the backend for this machine
///
/// The perf power PMU is preferred. The MSR backend is only tried when the PMU
/// type descriptor is absent altogether.
pub fn open_backend(config: &Config, model: Option<CpuModel>) -> Result<Box<dyn EnergyBackend>> {
	match domain::discover(&config.paths.event_source_dir) {
		Ok(registry) => {
			let backend = PerfBackend::open(config.core, &registry)?;
			info!("Using perf_event to gather RAPL results");
			Ok(Box::new(backend))
		},
		Err(Error::NoInterface) => {
			warn!("{}", Error::NoInterface);
			warn!("Falling back to raw msr support");
			let backend = MsrBackend::open(&config.paths.msr_dir, config.core, model)?;
			info!("Using raw MSR reads to gather RAPL results");
			Ok(Box::new(backend))
		},
		Err(e) => Err(e),
	}
}
