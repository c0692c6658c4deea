use std::path::Path;

use log::debug;

use crate::backend::EnergyBackend;
use crate::constants::*;
use crate::cpu_type::CpuModel;
use crate::domain::{DomainDescriptor, EnergyDomain};
use crate::energy::EnergySnapshot;
use crate::error::{Error, Result};
use crate::util::energy_delta;
use crate::util::msr::MsrFile;

/// Energy unit decoded from `MSR_RAPL_POWER_UNIT`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RaplUnits {
	/// Joules per energy-status LSB
	pub energy: f64,
}

impl RaplUnits {
	pub fn decode(raw: u64) -> Self {
		let bits = (raw & ENERGY_UNIT_MASK) >> ENERGY_UNIT_OFFSET;

		Self {
			energy: 0.5f64.powi(bits as i32),
		}
	}
}

/// Reads RAPL energy-status registers straight from `/dev/cpu/<N>/msr`
#[derive(Debug)]
pub struct MsrBackend {
	/// Closed when collection finishes
	msr: Option<MsrFile>,
	core: usize,
	units: RaplUnits,
	descriptors: Vec<DomainDescriptor>,
	start: Option<EnergySnapshot>,
}

impl MsrBackend {
	/// Opens the register file of `core`, decodes the energy unit and checks every domain register
	///
	/// A domain whose status register cannot be read is reported unavailable.
	pub fn open(msr_dir: &Path, core: usize, model: Option<CpuModel>) -> Result<Self> {
		let msr = MsrFile::open(msr_dir, core)?;

		let units = RaplUnits::decode(msr.read(MSR_RAPL_POWER_UNIT)?);
		debug!("RAPL energy unit {} J", units.energy);

		let mut descriptors = Vec::with_capacity(EnergyDomain::ALL.len());
		for domain in EnergyDomain::ALL {
			let register = domain.status_register();

			match msr.read(register) {
				Ok(_) => {},
				// The msr driver answers EIO for registers this model does not implement
				Err(Error::Io { ref source, .. }) if source.raw_os_error() == Some(libc::EIO) => {
					debug!("{} not implemented on CPU {}", domain, core);
					descriptors.push(DomainDescriptor::unavailable(domain));
					continue;
				},
				Err(e) => return Err(e),
			}

			let scale = match (domain, model) {
				(EnergyDomain::Ram, Some(model)) if model.has_fixed_dram_unit() => {
					0.5f64.powi(SERVER_DRAM_ENERGY_UNIT_BITS as i32)
				},
				_ => units.energy,
			};

			descriptors.push(DomainDescriptor {
				domain,
				event_code: register,
				scale,
				unit: "Joules".to_string(),
				available: true,
			});
		}

		if descriptors.iter().all(|d| !d.available) {
			return Err(Error::NoDomains(core));
		}

		Ok(Self {
			msr: Some(msr),
			core,
			units,
			descriptors,
			start: None,
		})
	}

	pub fn units(&self) -> RaplUnits {
		self.units
	}

	fn snapshot(&self) -> Result<EnergySnapshot> {
		let msr = self.msr.as_ref().ok_or(Error::NoDomains(self.core))?;

		let readings = self
			.descriptors
			.iter()
			.filter(|d| d.available)
			.map(|d| msr.read(d.event_code).map(|value| (d.domain, value)))
			.collect::<Result<Vec<_>>>()?;

		Ok(EnergySnapshot { readings })
	}
}

impl EnergyBackend for MsrBackend {
	fn name(&self) -> &'static str {
		"msr"
	}

	fn domains(&self) -> Vec<DomainDescriptor> {
		self.descriptors.iter().filter(|d| d.available).cloned().collect()
	}

	fn arm(&mut self) -> Result<()> {
		self.start = Some(self.snapshot()?);
		Ok(())
	}

	fn collect(&mut self) -> Result<Vec<(EnergyDomain, f64)>> {
		let end = self.snapshot();
		// Close the register file whatever the outcome of the final read
		self.msr = None;
		let end = end?;

		let start = self.start.take().unwrap_or_default();

		Ok(self
			.descriptors
			.iter()
			.filter(|d| d.available)
			.filter_map(|d| {
				let before = start.get(d.domain)?;
				let after = end.get(d.domain)?;
				Some((d.domain, energy_delta(before, after) as f64 * d.scale))
			})
			.collect())
	}
}
