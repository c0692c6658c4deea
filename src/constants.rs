// Intel RAPL MSR addresses
pub const MSR_RAPL_POWER_UNIT: u64 = 0x606;
pub const MSR_PKG_ENERGY_STATUS: u64 = 0x611;
pub const MSR_DRAM_ENERGY_STATUS: u64 = 0x619;
pub const MSR_PP0_ENERGY_STATUS: u64 = 0x639;
pub const MSR_PP1_ENERGY_STATUS: u64 = 0x641;

// Energy-status unit bit-field of MSR_RAPL_POWER_UNIT
pub const ENERGY_UNIT_OFFSET: u64 = 0x08;
pub const ENERGY_UNIT_MASK: u64 = 0x1F00;

/// Energy-status registers are 32 bits wide and wrap.
pub const ENERGY_STATUS_MASK: u64 = 0xFFFF_FFFF;

/// DRAM energy unit on server parts that ignore the unit register (2^-16 J)
pub const SERVER_DRAM_ENERGY_UNIT_BITS: u64 = 16;

// Default locations of the external surfaces
pub const DEFAULT_CPUINFO_PATH: &str = "/proc/cpuinfo";
pub const DEFAULT_EVENT_SOURCE_DIR: &str = "/sys/bus/event_source/devices/power";
pub const DEFAULT_MSR_DIR: &str = "/dev/cpu";
pub const DEFAULT_CPU_SYSFS_DIR: &str = "/sys/devices/system/cpu";

// Environment overrides for the locations above
pub const ENV_CPUINFO_PATH: &str = "RAPL_RUN_CPUINFO";
pub const ENV_EVENT_SOURCE_DIR: &str = "RAPL_RUN_EVENT_SOURCE";
pub const ENV_MSR_DIR: &str = "RAPL_RUN_MSR_DIR";
pub const ENV_CPU_SYSFS_DIR: &str = "RAPL_RUN_CPU_SYSFS";

pub const NANOS_PER_SEC: i64 = 1_000_000_000;

// Remedies shown with a permission failure
pub const PERF_PERMISSION_HINT: &str = "run as root or lower /proc/sys/kernel/perf_event_paranoid";
pub const MSR_PERMISSION_HINT: &str = "run as root or grant CAP_SYS_RAWIO";

pub const REPORT_HEADER: &str = "domain, energy, time, avg_power";
