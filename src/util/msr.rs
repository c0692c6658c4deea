use std::fs::File;
use std::io;
use std::os::unix::fs::FileExt;
use std::path::{Path, PathBuf};

use log::debug;

use crate::constants::MSR_PERMISSION_HINT;
use crate::error::{Error, Result};

/// An open per-core model-specific register file (`/dev/cpu/<N>/msr`)
///
/// The register offset is the file offset; every read is a positioned 8 byte
/// read. The descriptor is closed when the value is dropped.
#[derive(Debug)]
pub struct MsrFile {
	file: File,
	path: PathBuf,
	core: usize,
}

impl MsrFile {
	/// Opens the register file of `core` below `msr_dir`
	///
	/// The error distinguishes a missing CPU, a CPU without MSR support, a
	/// permission problem and a missing msr driver from other I/O failures.
	pub fn open(msr_dir: &Path, core: usize) -> Result<Self> {
		let path = msr_dir.join(core.to_string()).join("msr");

		let file = File::open(&path).map_err(|e| classify_open_error(&path, core, e))?;
		debug!("opened {}", path.display());

		Ok(Self { file, path, core })
	}

	pub fn core(&self) -> usize {
		self.core
	}

	/// Reads the 64-bit register at `offset`
	///
	/// A short read is fatal and reported as [`Error::ShortRead`].
	pub fn read(&self, offset: u64) -> Result<u64> {
		let mut buf = [0u8; 8];
		let mut filled = 0;

		while filled < buf.len() {
			match self.file.read_at(&mut buf[filled..], offset + filled as u64) {
				Ok(0) => break,
				Ok(n) => filled += n,
				Err(e) if e.kind() == io::ErrorKind::Interrupted => {},
				Err(e) => return Err(Error::io(&self.path, e)),
			}
		}

		if filled != buf.len() {
			return Err(Error::ShortRead {
				path: self.path.clone(),
				offset,
				got: filled,
			});
		}

		Ok(u64::from_ne_bytes(buf))
	}
}

fn classify_open_error(path: &Path, core: usize, e: io::Error) -> Error {
	match e.raw_os_error() {
		Some(libc::ENXIO) => Error::NoSuchCpu(core),
		Some(libc::EIO) => Error::NoMsrSupport(core),
		Some(libc::EACCES) | Some(libc::EPERM) => Error::PermissionDenied {
			resource: path.display().to_string(),
			hint: MSR_PERMISSION_HINT,
		},
		Some(libc::ENOENT) => Error::NoCounterInterface(format!(
			"{} not found; load the msr driver with `modprobe msr`",
			path.display()
		)),
		_ => Error::io(path, e),
	}
}
