use std::sync::LazyLock;

use docker_compose_config::{SingleValue, StringOrNum};
use regex::Regex;

use crate::ConvertError;

static MEMORY_REGEX: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r"(?i)^\s*(\d+)\s*(b|kb?|mb?|gb?)?\s*$").expect("Failed to initialize the memory regex")
});

const KIB: u64 = 1024;
const MIB: u64 = KIB * 1024;
const GIB: u64 = MIB * 1024;

/// Nomad rejects tasks with less memory than this.
pub const MIN_MEMORY_MB: u32 = 10;

/// Parses a number of cores, such as `0.5` or `"2"`.
pub fn parse_cores(value: &SingleValue) -> Option<f64> {
	let cores = match value {
		SingleValue::Int(i) => *i as f64,
		SingleValue::Float(f) => *f,
		SingleValue::String(s) => s.trim().parse::<f64>().ok()?,
		SingleValue::Bool(_) => return None,
	};

	(cores.is_finite() && cores > 0.0).then_some(cores)
}

/// Converts a number of cores into MHz, at 1000 MHz per core.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn cpu_to_mhz(value: &SingleValue) -> Result<u32, ConvertError> {
	let cores = parse_cores(value).ok_or_else(|| ConvertError::InvalidCpu(value.to_string()))?;

	Ok((cores * 1000.0).round().min(f64::from(u32::MAX)) as u32)
}

/// Parses an amount of bytes, given as a number or as digits followed by a unit.
pub fn parse_bytes(value: &str) -> Option<u64> {
	let captures = MEMORY_REGEX.captures(value)?;

	let amount: u64 = captures.get(1)?.as_str().parse().ok()?;

	let multiplier = match captures
		.get(2)
		.map(|unit| unit.as_str().to_lowercase())
		.as_deref()
	{
		None | Some("b") => 1,
		Some("k" | "kb") => KIB,
		Some("m" | "mb") => MIB,
		Some("g" | "gb") => GIB,
		Some(_) => return None,
	};

	amount.checked_mul(multiplier)
}

fn single_value_bytes(value: &SingleValue) -> Option<u64> {
	match value {
		SingleValue::Int(i) => u64::try_from(*i).ok(),
		SingleValue::String(s) => parse_bytes(s),
		SingleValue::Float(_) | SingleValue::Bool(_) => None,
	}
}

pub fn is_valid_memory(value: &SingleValue) -> bool {
	single_value_bytes(value).is_some()
}

/// Converts an amount of memory into MB, rounding to the nearest one.
pub fn memory_to_mb(value: &SingleValue) -> Result<u32, ConvertError> {
	let bytes =
		single_value_bytes(value).ok_or_else(|| ConvertError::InvalidMemory(value.to_string()))?;

	let mb = bytes / MIB + u64::from(bytes % MIB >= MIB / 2);

	Ok(u32::try_from(mb).unwrap_or(u32::MAX))
}

/// Parses sizes such as `shm_size` into bytes.
pub fn size_to_bytes(value: &StringOrNum) -> Result<u64, ConvertError> {
	match value {
		StringOrNum::Num(n) => {
			u64::try_from(*n).map_err(|_| ConvertError::InvalidMemory(n.to_string()))
		}
		StringOrNum::String(s) => parse_bytes(s).ok_or_else(|| ConvertError::InvalidMemory(s.clone())),
	}
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;

	use super::*;

	fn string(s: &str) -> SingleValue {
		SingleValue::String(s.to_string())
	}

	#[test]
	fn huge_memory_values_saturate() {
		assert_eq!(memory_to_mb(&string("18446744073709551615")).unwrap(), u32::MAX);
		assert_eq!(memory_to_mb(&string("17592186044415M")).unwrap(), u32::MAX);
		assert!(memory_to_mb(&string("18446744073709551615G")).is_err());
		assert_eq!(memory_to_mb(&string("1572863")).unwrap(), 1);
		assert_eq!(memory_to_mb(&string("1572864")).unwrap(), 2);
	}

	#[test]
	fn memory_units() {
		assert_eq!(memory_to_mb(&string("512M")).unwrap(), 512);
		assert_eq!(memory_to_mb(&string("1G")).unwrap(), 1024);
		assert_eq!(memory_to_mb(&string("2147483648")).unwrap(), 2048);
		assert_eq!(memory_to_mb(&SingleValue::Int(2_147_483_648)).unwrap(), 2048);
		assert_eq!(memory_to_mb(&string("256mb")).unwrap(), 256);
		assert_eq!(memory_to_mb(&string("1024k")).unwrap(), 1);
	}

	#[test]
	fn invalid_memory() {
		assert!(memory_to_mb(&string("1.5G")).is_err());
		assert!(memory_to_mb(&string("lots")).is_err());
		assert!(memory_to_mb(&string("12T")).is_err());
		assert!(!is_valid_memory(&SingleValue::Float(1.5)));
	}

	#[test]
	fn cpu_units() {
		assert_eq!(cpu_to_mhz(&string("0.5")).unwrap(), 500);
		assert_eq!(cpu_to_mhz(&SingleValue::Float(0.25)).unwrap(), 250);
		assert_eq!(cpu_to_mhz(&SingleValue::Int(2)).unwrap(), 2000);
		assert!(cpu_to_mhz(&string("-1")).is_err());
		assert!(cpu_to_mhz(&string("0")).is_err());
		assert!(cpu_to_mhz(&string("half")).is_err());
	}

	#[test]
	fn sizes() {
		assert_eq!(
			size_to_bytes(&StringOrNum::String("64m".to_string())).unwrap(),
			64 * MIB
		);
		assert_eq!(size_to_bytes(&StringOrNum::Num(1024)).unwrap(), 1024);
	}
}
