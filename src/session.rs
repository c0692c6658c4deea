use std::fs::File;
use std::io::{self, Read};
use std::mem;
use std::os::unix::io::FromRawFd;

use log::{debug, warn};
use perf_event_open_sys::bindings::{PERF_FLAG_FD_CLOEXEC, perf_event_attr};
use perf_event_open_sys::perf_event_open;

use crate::constants::PERF_PERMISSION_HINT;
use crate::domain::{DomainDescriptor, EnergyDomain, PerfRegistry};
use crate::error::{Error, Result};

/// A perf counter counting one RAPL event on one logical CPU
///
/// The file descriptor is closed exactly once, when the handle is dropped.
#[derive(Debug)]
pub struct CounterHandle {
	file: File,
}

impl CounterHandle {
	/// Opens a system-wide counter for `descriptor` on `core`
	pub fn open(type_id: u32, descriptor: &DomainDescriptor, core: usize) -> io::Result<Self> {
		let mut attr = perf_event_attr {
			size: mem::size_of::<perf_event_attr>() as u32,
			type_: type_id,
			config: descriptor.event_code,
			..perf_event_attr::default()
		};

		let cpu = libc::c_int::try_from(core).map_err(|_| io::Error::from_raw_os_error(libc::ENODEV))?;

		// pid = -1 with a cpu counts every task on that cpu; no group leader
		let fd = unsafe { perf_event_open(&mut attr, -1, cpu, -1, PERF_FLAG_FD_CLOEXEC.into()) };
		if fd < 0 {
			return Err(if fd == -1 {
				io::Error::last_os_error()
			} else {
				io::Error::from_raw_os_error(-fd)
			});
		}

		// SAFETY: the kernel just handed us this descriptor and nothing else owns it
		let file = unsafe { File::from_raw_fd(fd) };

		Ok(Self { file })
	}

	/// Reads the accumulated raw count and closes the counter
	pub fn read_and_close(mut self) -> io::Result<u64> {
		let mut buf = [0u8; 8];
		self.file.read_exact(&mut buf)?;
		Ok(u64::from_ne_bytes(buf))
	}
}

/// The set of perf counters opened for one measurement
#[derive(Debug)]
pub struct CounterSession {
	/// One slot per domain in report order; `None` for domains not measured
	slots: Vec<(DomainDescriptor, Option<CounterHandle>)>,
}

impl CounterSession {
	/// Opens one counter per available domain of `registry` on `core`
	///
	/// Permission and missing-CPU failures abort the session. Any other
	/// failure drops only the affected domain. Counters opened before an
	/// abort are closed on the way out.
	pub fn open(core: usize, registry: &PerfRegistry) -> Result<Self> {
		let mut slots = Vec::with_capacity(registry.descriptors.len());

		for descriptor in &registry.descriptors {
			if !descriptor.available {
				slots.push((descriptor.clone(), None));
				continue;
			}

			let handle = match CounterHandle::open(registry.type_id, descriptor, core) {
				Ok(handle) => Some(handle),
				Err(e) => {
					if let Some(fatal) = classify_open_error(descriptor.domain, core, &e) {
						return Err(fatal);
					}
					warn!("error opening {} on CPU {}: {}; skipping it", descriptor.domain, core, e);
					None
				},
			};

			if handle.is_some() {
				debug!("opened {} counter on CPU {}", descriptor.domain, core);
			}
			slots.push((descriptor.clone(), handle));
		}

		if slots.iter().all(|(_, handle)| handle.is_none()) {
			return Err(Error::NoDomains(core));
		}

		Ok(Self { slots })
	}

	/// Descriptors of every domain that has an open counter
	pub fn measured(&self) -> impl Iterator<Item = &DomainDescriptor> {
		self.slots.iter().filter(|(_, handle)| handle.is_some()).map(|(descriptor, _)| descriptor)
	}

	/// Reads every open counter once, closes it and converts the count to joules
	///
	/// A read failure is fatal; the remaining counters are still closed.
	pub fn read_and_close(&mut self) -> Result<Vec<(EnergyDomain, f64)>> {
		let mut energies = Vec::with_capacity(self.slots.len());

		for (descriptor, slot) in &mut self.slots {
			let Some(handle) = slot.take() else {
				continue;
			};

			let raw = handle.read_and_close().map_err(|source| Error::CounterRead {
				domain: descriptor.domain,
				source,
			})?;

			energies.push((descriptor.domain, raw as f64 * descriptor.scale));
		}

		Ok(energies)
	}
}

/// Returns the error that ends the session, or `None` when only `domain` is lost
fn classify_open_error(domain: EnergyDomain, core: usize, e: &io::Error) -> Option<Error> {
	match e.raw_os_error() {
		Some(libc::EACCES) | Some(libc::EPERM) => Some(Error::PermissionDenied {
			resource: format!("{} counter", domain),
			hint: PERF_PERMISSION_HINT,
		}),
		Some(libc::ENODEV) | Some(libc::ENXIO) => Some(Error::NoSuchCpu(core)),
		_ => None,
	}
}
