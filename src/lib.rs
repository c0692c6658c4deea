pub mod backend;
pub mod config;
pub mod constants;
pub mod cpu_type;
pub mod display;
pub mod domain;
pub mod energy;
pub mod error;
pub mod power;
pub mod sampler;
pub mod session;
pub mod util;

use log::{debug, info};

pub use crate::config::{Config, SysPaths};
pub use crate::cpu_type::{CpuModel, Unsupported};
pub use crate::domain::{DomainDescriptor, EnergyDomain};
pub use crate::error::{Error, Result};
pub use crate::power::{Measurement, SampleResult};

/// Measures RAPL energy on one core over one window
///
/// This is the main entry point. `model` is the advisory result of CPU
/// detection; it only refines the MSR backend and never blocks the run.
pub fn measure_energy(config: &Config, model: Option<CpuModel>) -> Result<Measurement> {
	config.check_core_exists()?;

	let mut backend = backend::open_backend(config, model)?;

	for descriptor in backend.domains() {
		debug!(
			"measuring {} (code {:#x}, scale {:e} {})",
			descriptor.domain, descriptor.event_code, descriptor.scale, descriptor.unit
		);
	}

	info!(
		"Sampling CPU {} for {} s via {}",
		config.core,
		config.duration_secs,
		backend.name()
	);

	sampler::run(backend.as_mut(), config.duration_secs)
}
