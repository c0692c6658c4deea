use std::fmt;
use std::fs;
use std::io;
use std::path::Path;

use log::{debug, warn};

use crate::constants::{MSR_DRAM_ENERGY_STATUS, MSR_PKG_ENERGY_STATUS, MSR_PP0_ENERGY_STATUS, MSR_PP1_ENERGY_STATUS};
use crate::error::{Error, Result};

/// One independently metered RAPL subsystem
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnergyDomain {
	/// Processor cores (PP0)
	Cores,
	/// Uncore / integrated graphics (PP1)
	Gpu,
	/// Whole package
	Pkg,
	/// Memory controller and DIMMs
	Ram,
}

impl EnergyDomain {
	/// All domains in report order
	pub const ALL: [EnergyDomain; 4] = [EnergyDomain::Cores, EnergyDomain::Gpu, EnergyDomain::Pkg, EnergyDomain::Ram];

	/// Name used both for the perf event files and for the report
	pub fn as_str(&self) -> &'static str {
		match self {
			EnergyDomain::Cores => "energy-cores",
			EnergyDomain::Gpu => "energy-gpu",
			EnergyDomain::Pkg => "energy-pkg",
			EnergyDomain::Ram => "energy-ram",
		}
	}

	/// Energy-status MSR backing this domain
	pub fn status_register(&self) -> u64 {
		match self {
			EnergyDomain::Cores => MSR_PP0_ENERGY_STATUS,
			EnergyDomain::Gpu => MSR_PP1_ENERGY_STATUS,
			EnergyDomain::Pkg => MSR_PKG_ENERGY_STATUS,
			EnergyDomain::Ram => MSR_DRAM_ENERGY_STATUS,
		}
	}
}

impl fmt::Display for EnergyDomain {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Discovered configuration of a single domain
#[derive(Debug, Clone, PartialEq)]
pub struct DomainDescriptor {
	pub domain: EnergyDomain,

	/// Raw counter identifier: perf event config, or MSR offset for the register backend
	pub event_code: u64,

	/// Multiplier converting a raw counter value into joules
	pub scale: f64,

	pub unit: String,

	/// False when this machine does not expose the domain
	pub available: bool,
}

impl DomainDescriptor {
	pub fn unavailable(domain: EnergyDomain) -> Self {
		Self {
			domain,
			event_code: 0,
			scale: 0.0,
			unit: String::new(),
			available: false,
		}
	}
}

/// The perf power PMU together with its per-domain events
#[derive(Debug, Clone)]
pub struct PerfRegistry {
	/// PMU type id to put in `perf_event_attr.type`
	pub type_id: u32,

	/// One entry per domain, always in [`EnergyDomain::ALL`] order
	pub descriptors: Vec<DomainDescriptor>,
}

impl PerfRegistry {
	pub fn available(&self) -> impl Iterator<Item = &DomainDescriptor> {
		self.descriptors.iter().filter(|d| d.available)
	}
}

/// Discovers the perf power PMU and its RAPL events
///
/// Returns [`Error::NoInterface`] when the PMU type descriptor is absent. A
/// domain whose event file is missing, or whose scale cannot be read, is
/// reported as unavailable rather than failing discovery.
pub fn discover(event_source_dir: &Path) -> Result<PerfRegistry> {
	let type_path = event_source_dir.join("type");
	let type_id = match fs::read_to_string(&type_path) {
		Ok(content) => content.trim().parse::<u32>().map_err(|_| Error::Parse {
			path: type_path.clone(),
			content: content.trim().to_string(),
		})?,
		Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(Error::NoInterface),
		Err(e) => return Err(Error::io(type_path, e)),
	};
	debug!("perf power PMU type {}", type_id);

	let events_dir = event_source_dir.join("events");
	let descriptors = EnergyDomain::ALL
		.iter()
		.map(|&domain| discover_domain(&events_dir, domain))
		.collect::<Result<Vec<_>>>()?;

	Ok(PerfRegistry { type_id, descriptors })
}

fn discover_domain(events_dir: &Path, domain: EnergyDomain) -> Result<DomainDescriptor> {
	let name = domain.as_str();

	let event_path = events_dir.join(name);
	let event_code = match fs::read_to_string(&event_path) {
		Ok(content) => parse_event_code(&content).ok_or_else(|| Error::Parse {
			path: event_path.clone(),
			content: content.trim().to_string(),
		})?,
		Err(e) if e.kind() == io::ErrorKind::NotFound => {
			debug!("{} not exposed", name);
			return Ok(DomainDescriptor::unavailable(domain));
		},
		Err(e) => return Err(Error::io(event_path, e)),
	};

	let scale_path = events_dir.join(format!("{}.scale", name));
	let scale = fs::read_to_string(&scale_path)
		.ok()
		.and_then(|content| content.trim().parse::<f64>().ok())
		.filter(|scale| scale.is_finite() && *scale > 0.0);

	let Some(scale) = scale else {
		warn!("{} has no usable scale at {}, skipping it", name, scale_path.display());
		return Ok(DomainDescriptor::unavailable(domain));
	};

	let unit = fs::read_to_string(events_dir.join(format!("{}.unit", name)))
		.ok()
		.and_then(|content| content.split_whitespace().next().map(str::to_string))
		.unwrap_or_default();

	debug!("{}: event={:#x} scale={:e} unit={}", name, event_code, scale, unit);

	Ok(DomainDescriptor {
		domain,
		event_code,
		scale,
		unit,
		available: true,
	})
}

/// Parses the `event=<hex>` term of a perf event description
pub fn parse_event_code(content: &str) -> Option<u64> {
	content.trim().split(',').find_map(|term| {
		let hex = term.trim().strip_prefix("event=")?;
		let hex = hex.strip_prefix("0x").or_else(|| hex.strip_prefix("0X")).unwrap_or(hex);
		u64::from_str_radix(hex, 16).ok()
	})
}
