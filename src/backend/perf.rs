use crate::backend::EnergyBackend;
use crate::domain::{DomainDescriptor, EnergyDomain, PerfRegistry};
use crate::error::Result;
use crate::session::CounterSession;

/// Reads RAPL through the kernel's perf power PMU
///
/// Counters start counting when opened, so arming is a no-op.
#[derive(Debug)]
pub struct PerfBackend {
	session: CounterSession,
}

impl PerfBackend {
	pub fn open(core: usize, registry: &PerfRegistry) -> Result<Self> {
		Ok(Self {
			session: CounterSession::open(core, registry)?,
		})
	}
}

impl EnergyBackend for PerfBackend {
	fn name(&self) -> &'static str {
		"perf_event"
	}

	fn domains(&self) -> Vec<DomainDescriptor> {
		self.session.measured().cloned().collect()
	}

	fn arm(&mut self) -> Result<()> {
		Ok(())
	}

	fn collect(&mut self) -> Result<Vec<(EnergyDomain, f64)>> {
		self.session.read_and_close()
	}
}
