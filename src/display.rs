use std::io::{self, Write};

use crate::constants::REPORT_HEADER;
use crate::power::SampleResult;

/// Writes the comma-separated report: a header, then one line per domain
pub fn write_report(results: &[SampleResult], out: &mut dyn Write) -> io::Result<()> {
	writeln!(out, "{}", REPORT_HEADER)?;

	for row in results {
		writeln!(
			out,
			"{}, {:.6}, {:.6}, {:.6}",
			row.domain, row.energy_joules, row.elapsed_seconds, row.avg_power_watts
		)?;
	}

	out.flush()
}
