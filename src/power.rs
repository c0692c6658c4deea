use crate::domain::EnergyDomain;

/// Energy and average power of one domain over one measurement window
#[derive(Debug, Clone, PartialEq)]
pub struct SampleResult {
	pub domain: EnergyDomain,

	/// Energy consumed during the window in joules
	pub energy_joules: f64,

	/// Length of the shared measurement window in seconds
	pub elapsed_seconds: f64,

	/// `energy_joules / elapsed_seconds`
	pub avg_power_watts: f64,
}

impl SampleResult {
	/// Derives the average power; `elapsed_seconds` must be positive
	pub fn new(domain: EnergyDomain, energy_joules: f64, elapsed_seconds: f64) -> Self {
		Self {
			domain,
			energy_joules,
			elapsed_seconds,
			avg_power_watts: energy_joules / elapsed_seconds,
		}
	}
}

/// The outcome of one run
#[derive(Debug, Clone)]
pub struct Measurement {
	/// Name of the backend that produced the readings
	pub backend: &'static str,

	pub elapsed_seconds: f64,

	/// One row per available domain, in report order
	pub results: Vec<SampleResult>,
}
