use crate::domain::EnergyDomain;

/// Snapshot of energy-status registers
///
/// This structure captures a point-in-time reading of every available
/// domain, in report order.
#[derive(Debug, Clone, Default)]
pub struct EnergySnapshot {
	pub readings: Vec<(EnergyDomain, u64)>,
}

impl EnergySnapshot {
	pub fn get(&self, domain: EnergyDomain) -> Option<u64> {
		self.readings.iter().find(|(d, _)| *d == domain).map(|&(_, value)| value)
	}
}
