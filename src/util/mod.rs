pub mod msr;

use crate::constants::ENERGY_STATUS_MASK;

/// Computes the number of energy units counted between two register reads
///
/// # Arguments
///
/// * `energy_start` - Energy-status register value at the start of the window
/// * `energy_end` - Energy-status register value at the end of the window
///
/// # Returns
///
/// The raw delta, accounting for a single wrap of the 32-bit counter
pub const fn energy_delta(energy_start: u64, energy_end: u64) -> u64 {
	let start = energy_start & ENERGY_STATUS_MASK;
	let end = energy_end & ENERGY_STATUS_MASK;

	if end < start {
		// Handle counter wrap-around
		end + (ENERGY_STATUS_MASK + 1) - start
	} else {
		end - start
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn delta_without_wrap() {
		assert_eq!(energy_delta(1_000, 4_500), 3_500);
	}

	#[test]
	fn delta_across_wrap() {
		assert_eq!(energy_delta(0xFFFF_FFF0, 0x10), 0x20);
	}

	#[test]
	fn upper_bits_are_ignored() {
		assert_eq!(energy_delta(0xABCD_0000_0000_0010, 0x0000_0001_0000_0020), 0x10);
	}
}
