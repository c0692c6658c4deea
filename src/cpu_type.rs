use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::path::Path;

/// Intel family 6 models known to expose the full RAPL interface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CpuModel {
	SandyBridge,
	SandyBridgeEp,
	IvyBridge,
	IvyBridgeEp,
	Haswell,
	HaswellEp,
	Broadwell,
}

impl CpuModel {
	/// Maps a family 6 model number onto a known generation
	pub fn from_model_number(model: u32) -> Option<Self> {
		match model {
			42 => Some(CpuModel::SandyBridge),
			45 => Some(CpuModel::SandyBridgeEp),
			58 => Some(CpuModel::IvyBridge),
			62 => Some(CpuModel::IvyBridgeEp),
			60 => Some(CpuModel::Haswell),
			63 => Some(CpuModel::HaswellEp),
			61 => Some(CpuModel::Broadwell),
			_ => None,
		}
	}

	/// Returns a human-readable name of the generation
	pub fn as_str(&self) -> &'static str {
		match self {
			CpuModel::SandyBridge => "Sandybridge",
			CpuModel::SandyBridgeEp => "Sandybridge-EP",
			CpuModel::IvyBridge => "Ivybridge",
			CpuModel::IvyBridgeEp => "Ivybridge-EP",
			CpuModel::Haswell => "Haswell",
			CpuModel::HaswellEp => "Haswell-EP",
			CpuModel::Broadwell => "Broadwell",
		}
	}

	/// Server parts whose DRAM domain ignores the unit register
	pub fn has_fixed_dram_unit(&self) -> bool {
		matches!(self, CpuModel::HaswellEp)
	}
}

/// Why a processor was not recognised
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Unsupported {
	/// The identification source could not be read
	NoCpuInfo,
	NotIntel(String),
	/// No `cpu family` line was found
	NoFamily,
	WrongFamily(u32),
	UnknownModel(Option<u32>),
}

impl fmt::Display for Unsupported {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Unsupported::NoCpuInfo => write!(f, "Unable to read CPU identification"),
			Unsupported::NotIntel(vendor) => write!(f, "{} not an Intel chip", vendor),
			Unsupported::NoFamily => write!(f, "CPU family not reported"),
			Unsupported::WrongFamily(family) => write!(f, "Wrong CPU family {}", family),
			Unsupported::UnknownModel(Some(model)) => write!(f, "Unsupported model {}", model),
			Unsupported::UnknownModel(None) => write!(f, "Unsupported model (not reported)"),
		}
	}
}

/// Detects the CPU generation by reading a cpuinfo-formatted file
///
/// Only the first occurrence of each key is considered; every processor
/// block of a single-socket system carries the same identification.
pub fn detect_cpu_model(cpuinfo_path: &Path) -> Result<CpuModel, Unsupported> {
	let cpuinfo = fs::read_to_string(cpuinfo_path).map_err(|_| Unsupported::NoCpuInfo)?;

	let mut vendor = None;
	let mut family = None;
	let mut model = None;

	for line in cpuinfo.lines() {
		let Some((key, value)) = line.split_once(':') else {
			continue;
		};
		let value = value.trim();

		// "model name" shares a prefix with "model", so match whole keys
		match key.trim() {
			"vendor_id" if vendor.is_none() => vendor = Some(value.to_string()),
			"cpu family" if family.is_none() => family = value.parse::<u32>().ok(),
			"model" if model.is_none() => model = value.parse::<u32>().ok(),
			_ => {},
		}

		if vendor.is_some() && family.is_some() && model.is_some() {
			break;
		}
	}

	let vendor = vendor.unwrap_or_default();
	if vendor != "GenuineIntel" {
		return Err(Unsupported::NotIntel(vendor));
	}

	match family {
		Some(6) => {},
		Some(other) => return Err(Unsupported::WrongFamily(other)),
		None => return Err(Unsupported::NoFamily),
	}

	model
		.and_then(CpuModel::from_model_number)
		.ok_or(Unsupported::UnknownModel(model))
}

/// Writes the detection outcome to a status stream
pub fn report_detection(detection: &Result<CpuModel, Unsupported>, out: &mut dyn Write) -> io::Result<()> {
	match detection {
		Ok(model) => writeln!(out, "Found {} CPU", model.as_str()),
		Err(reason) => writeln!(out, "{}", reason),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn cpuinfo(vendor: &str, family: u32, model: u32) -> String {
		let block = |id: u32| {
			format!(
				"processor\t: {id}\nvendor_id\t: {vendor}\ncpu family\t: {family}\nmodel\t\t: {model}\nmodel name\t: Intel(R) \
				 Core(TM) i7-4770 CPU @ 3.40GHz\nstepping\t: 3\n"
			)
		};
		format!("{}\n{}", block(0), block(1))
	}

	fn detect_from(content: &str) -> Result<CpuModel, Unsupported> {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("cpuinfo");
		fs::write(&path, content).unwrap();
		detect_cpu_model(&path)
	}

	#[test]
	fn detects_haswell() {
		assert_eq!(detect_from(&cpuinfo("GenuineIntel", 6, 60)), Ok(CpuModel::Haswell));
	}

	#[test]
	fn model_name_line_does_not_shadow_model() {
		let content = "vendor_id\t: GenuineIntel\ncpu family\t: 6\nmodel name\t: Something 99\nmodel\t\t: 42\n";
		assert_eq!(detect_from(content), Ok(CpuModel::SandyBridge));
	}

	#[test]
	fn rejects_other_vendors() {
		assert_eq!(
			detect_from(&cpuinfo("AuthenticAMD", 23, 1)),
			Err(Unsupported::NotIntel("AuthenticAMD".into()))
		);
	}

	#[test]
	fn rejects_wrong_family() {
		assert_eq!(
			detect_from(&cpuinfo("GenuineIntel", 15, 60)),
			Err(Unsupported::WrongFamily(15))
		);
	}

	#[test]
	fn missing_family_is_reported_as_such() {
		let content = "vendor_id\t: GenuineIntel\nmodel\t\t: 60\n";
		assert_eq!(detect_from(content), Err(Unsupported::NoFamily));

		let mut out = Vec::new();
		report_detection(&Err(Unsupported::NoFamily), &mut out).unwrap();
		assert_eq!(String::from_utf8(out).unwrap(), "CPU family not reported\n");
	}

	#[test]
	fn rejects_unknown_model() {
		assert_eq!(
			detect_from(&cpuinfo("GenuineIntel", 6, 158)),
			Err(Unsupported::UnknownModel(Some(158)))
		);
	}

	#[test]
	fn missing_cpuinfo_is_unsupported() {
		let dir = tempfile::tempdir().unwrap();
		assert_eq!(
			detect_cpu_model(&dir.path().join("absent")),
			Err(Unsupported::NoCpuInfo)
		);
	}

	#[test]
	fn report_names_the_generation() {
		let mut out = Vec::new();
		report_detection(&Ok(CpuModel::IvyBridgeEp), &mut out).unwrap();
		assert_eq!(String::from_utf8(out).unwrap(), "Found Ivybridge-EP CPU\n");

		let mut out = Vec::new();
		report_detection(&Err(Unsupported::WrongFamily(15)), &mut out).unwrap();
		assert_eq!(String::from_utf8(out).unwrap(), "Wrong CPU family 15\n");
	}
}
