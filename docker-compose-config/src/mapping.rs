use std::fmt::{self, Display};

#[cfg(feature = "schemars")]
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{ComposeError, StringOrNum};

/// A port mapping, either in the short `[host_ip:][published:]target[/protocol]` syntax or as an object.
///
/// See more: https://docs.docker.com/reference/compose-file/services/#ports
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "schemars", derive(JsonSchema))]
#[serde(untagged)]
pub enum Port {
	Num(u32),
	String(String),
	Long(PortSettings),
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[cfg_attr(feature = "schemars", derive(JsonSchema))]
#[serde(default)]
pub struct PortSettings {
	/// A human-readable name for the port.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub name: Option<String>,

	/// The container port.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub target: Option<StringOrNum>,

	/// The publicly exposed port.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub published: Option<StringOrNum>,

	/// The Host IP mapping, unspecified means all network interfaces (0.0.0.0).
	#[serde(skip_serializing_if = "Option::is_none")]
	pub host_ip: Option<String>,

	/// The port protocol (tcp or udp).
	#[serde(skip_serializing_if = "Option::is_none")]
	pub protocol: Option<String>,

	/// `host` for publishing a host port on each node, or `ingress` for a port to be load balanced.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub mode: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Protocol {
	#[default]
	Tcp,
	Udp,
}

impl Display for Protocol {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Tcp => f.write_str("tcp"),
			Self::Udp => f.write_str("udp"),
		}
	}
}

/// A port mapping with both shapes resolved.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PortMapping {
	pub host_ip: Option<String>,
	pub published: Option<u16>,
	pub target: u16,
	pub protocol: Protocol,
}

fn invalid_port(value: &str, reason: impl Into<String>) -> ComposeError {
	ComposeError::InvalidPort {
		value: value.to_string(),
		reason: reason.into(),
	}
}

fn parse_port_number(raw: &str, original: &str) -> Result<u16, ComposeError> {
	if raw.contains('-') {
		return Err(invalid_port(original, "port ranges are not supported"));
	}

	raw
		.trim()
		.parse::<u16>()
		.map_err(|_| invalid_port(original, format!("`{raw}` is not a valid port number")))
}

fn parse_protocol(raw: &str, original: &str) -> Result<Protocol, ComposeError> {
	match raw.to_lowercase().as_str() {
		"tcp" => Ok(Protocol::Tcp),
		"udp" => Ok(Protocol::Udp),
		other => Err(invalid_port(
			original,
			format!("unsupported protocol `{other}`"),
		)),
	}
}

/// Splits a trailing `/protocol` suffix from a port definition.
fn split_protocol(value: &str) -> Result<(&str, Protocol), ComposeError> {
	match value.rsplit_once('/') {
		Some((port, protocol)) => Ok((port, parse_protocol(protocol, value)?)),
		None => Ok((value, Protocol::Tcp)),
	}
}

impl Port {
	/// The short-form text of this port, if it was written as a string.
	pub fn as_short_str(&self) -> Option<&str> {
		match self {
			Self::String(s) => Some(s),
			_ => None,
		}
	}

	/// Resolves this port into its published/target pair.
	pub fn mapping(&self) -> Result<PortMapping, ComposeError> {
		match self {
			Self::Num(num) => {
				let target = u16::try_from(*num)
					.map_err(|_| invalid_port(&num.to_string(), "out of range"))?;

				Ok(PortMapping {
					host_ip: None,
					published: None,
					target,
					protocol: Protocol::Tcp,
				})
			}
			Self::String(value) => parse_short_port(value),
			Self::Long(settings) => {
				let target = settings
					.target
					.as_ref()
					.ok_or_else(|| invalid_port("<long syntax>", "missing `target`"))?
					.to_string();

				let published = settings
					.published
					.as_ref()
					.map(|published| published.to_string())
					.filter(|published| !published.is_empty())
					.map(|published| parse_port_number(&published, &published))
					.transpose()?;

				let protocol = settings
					.protocol
					.as_deref()
					.map(|protocol| parse_protocol(protocol, &target))
					.transpose()?
					.unwrap_or_default();

				Ok(PortMapping {
					host_ip: settings.host_ip.clone(),
					published,
					target: parse_port_number(&target, &target)?,
					protocol,
				})
			}
		}
	}
}

fn parse_short_port(value: &str) -> Result<PortMapping, ComposeError> {
	let (ports, protocol) = split_protocol(value)?;

	// The host ip can be an ipv6 address, so the split must start from the right
	let mut segments = ports.rsplitn(3, ':');

	let target = segments
		.next()
		.filter(|target| !target.is_empty())
		.ok_or_else(|| invalid_port(value, "missing container port"))?;

	let published = segments.next().filter(|published| !published.is_empty());

	let host_ip = segments
		.next()
		.map(|ip| ip.trim_start_matches('[').trim_end_matches(']').to_string());

	Ok(PortMapping {
		host_ip,
		published: published
			.map(|published| parse_port_number(published, value))
			.transpose()?,
		target: parse_port_number(target, value)?,
		protocol,
	})
}

/// Resolves an `expose` entry (`"3000"`, `3000` or `"3000/udp"`) into a container port.
pub fn parse_expose(entry: &StringOrNum) -> Result<(u16, Protocol), ComposeError> {
	let raw = entry.to_string();
	let (port, protocol) = split_protocol(&raw)?;

	Ok((parse_port_number(port, &raw)?, protocol))
}

/// A volume mount, either as `[source:]target[:mode]` or as an object.
///
/// See more: https://docs.docker.com/reference/compose-file/services/#volumes
#[derive(Clone, Debug, Serialize, Deserialize, Eq, PartialEq)]
#[cfg_attr(feature = "schemars", derive(JsonSchema))]
#[serde(untagged)]
pub enum ServiceVolume {
	Simple(String),
	Advanced(ServiceVolumeSettings),
}

#[derive(Clone, Debug, Serialize, Deserialize, Eq, PartialEq, Default)]
#[cfg_attr(feature = "schemars", derive(JsonSchema))]
#[serde(default)]
pub struct ServiceVolumeSettings {
	/// The mount type.
	#[serde(rename = "type", skip_serializing_if = "Option::is_none")]
	pub type_: Option<String>,

	/// The source of the mount, a path on the host for a bind mount, or the name of a volume defined in the top-level volumes key. Not applicable for a tmpfs mount.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub source: Option<String>,

	/// The path in the container where the volume is mounted.
	pub target: String,

	/// Flag to set the volume as read-only.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub read_only: Option<bool>,

	#[serde(skip_serializing_if = "Option::is_none")]
	pub tmpfs: Option<TmpfsSettings>,
}

#[derive(Clone, Debug, Serialize, Deserialize, Eq, PartialEq, Default)]
#[cfg_attr(feature = "schemars", derive(JsonSchema))]
#[serde(default)]
pub struct TmpfsSettings {
	/// The size for the tmpfs mount in bytes (either numeric or as bytes unit).
	#[serde(skip_serializing_if = "Option::is_none")]
	pub size: Option<StringOrNum>,

	/// The file mode for the tmpfs mount as Unix permission bits as an octal number.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub mode: Option<StringOrNum>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MountKind {
	/// A path on the host.
	Bind,
	/// A named volume.
	Named,
	Tmpfs,
	/// A volume with no source, which the engine would create on the fly.
	Anonymous,
}

/// A volume mount with both shapes resolved.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VolumeMount {
	pub kind: MountKind,
	pub source: Option<String>,
	pub target: String,
	pub read_only: bool,
}

impl VolumeMount {
	/// Whether this is a bind mount with a path relative to the compose file.
	pub fn is_relative_bind(&self) -> bool {
		self.kind == MountKind::Bind
			&& self
				.source
				.as_deref()
				.is_some_and(|source| !source.starts_with('/'))
	}
}

const MOUNT_MODES: &[&str] = &[
	"ro", "rw", "z", "Z", "cached", "delegated", "consistent", "nocopy", "shared", "slave",
	"private", "rshared", "rslave", "rprivate",
];

fn is_mode_segment(segment: &str) -> bool {
	segment
		.split(',')
		.all(|mode| MOUNT_MODES.contains(&mode))
}

fn kind_for_source(source: &str) -> MountKind {
	if source.starts_with('/')
		|| source.starts_with('.')
		|| source.starts_with('~')
	{
		MountKind::Bind
	} else {
		MountKind::Named
	}
}

impl ServiceVolume {
	pub fn as_short_str(&self) -> Option<&str> {
		match self {
			Self::Simple(s) => Some(s),
			Self::Advanced(_) => None,
		}
	}

	pub fn mount(&self) -> Result<VolumeMount, ComposeError> {
		match self {
			Self::Simple(value) => parse_short_volume(value),
			Self::Advanced(settings) => {
				let invalid = |reason: &str| ComposeError::InvalidVolume {
					value: settings.target.clone(),
					reason: reason.to_string(),
				};

				if settings.target.is_empty() {
					return Err(invalid("missing `target`"));
				}

				let source = settings
					.source
					.clone()
					.filter(|source| !source.is_empty());

				let kind = match settings.type_.as_deref() {
					Some("bind") => {
						if source.is_none() {
							return Err(invalid("bind mounts require a `source`"));
						}
						MountKind::Bind
					}
					Some("tmpfs") => MountKind::Tmpfs,
					Some("volume") | None => match &source {
						Some(source) => kind_for_source(source),
						None => MountKind::Anonymous,
					},
					Some(other) => {
						return Err(invalid(&format!("unsupported mount type `{other}`")));
					}
				};

				Ok(VolumeMount {
					kind,
					source,
					target: settings.target.clone(),
					read_only: settings.read_only.unwrap_or(false),
				})
			}
		}
	}
}

fn parse_short_volume(value: &str) -> Result<VolumeMount, ComposeError> {
	let segments: Vec<&str> = value.split(':').collect();

	let (source, target, mode) = match segments.as_slice() {
		[] | [""] => {
			return Err(ComposeError::InvalidVolume {
				value: value.to_string(),
				reason: "empty mount".to_string(),
			});
		}
		[target] => (None, *target, None),
		[source, target] => (Some(source.to_string()), *target, None),
		[rest @ .., target, mode] if is_mode_segment(mode) => {
			(Some(rest.join(":")), *target, Some(*mode))
		}
		[rest @ .., target] => (Some(rest.join(":")), *target, None),
	};

	if target.is_empty() {
		return Err(ComposeError::InvalidVolume {
			value: value.to_string(),
			reason: "missing container path".to_string(),
		});
	}

	let read_only = mode.is_some_and(|mode| mode.split(',').any(|m| m == "ro"));

	let kind = match &source {
		Some(source) => kind_for_source(source),
		None => MountKind::Anonymous,
	};

	Ok(VolumeMount {
		kind,
		source,
		target: target.to_string(),
		read_only,
	})
}

/// A device mapping for a container.
#[derive(Clone, Debug, Serialize, Deserialize, Eq, PartialEq)]
#[cfg_attr(feature = "schemars", derive(JsonSchema))]
#[serde(untagged)]
pub enum DeviceMapping {
	/// `host_path[:container_path[:cgroup_permissions]]`
	String(String),
	Detailed(DeviceMappingSettings),
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "schemars", derive(JsonSchema))]
pub struct DeviceMappingSettings {
	/// Path on the host to the device.
	pub source: String,

	/// Path in the container where the device will be mapped.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub target: Option<String>,

	/// Cgroup permissions for the device (rwm).
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub permissions: Option<String>,
}

/// A device mapping with both shapes resolved.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeviceSpec {
	pub host_path: String,
	pub container_path: String,
	pub cgroup_permissions: String,
}

pub const DEFAULT_CGROUP_PERMISSIONS: &str = "rwm";

impl DeviceMapping {
	pub fn spec(&self) -> Result<DeviceSpec, ComposeError> {
		let (host, container, permissions) = match self {
			Self::String(value) => {
				let mut parts = value.splitn(3, ':');
				let host = parts.next().unwrap_or_default();

				(
					host.to_string(),
					parts.next().map(str::to_string),
					parts.next().map(str::to_string),
				)
			}
			Self::Detailed(settings) => (
				settings.source.clone(),
				settings.target.clone(),
				settings.permissions.clone(),
			),
		};

		if host.is_empty() {
			let raw = match self {
				Self::String(value) => value.clone(),
				Self::Detailed(settings) => settings.source.clone(),
			};
			return Err(ComposeError::InvalidDevice(raw));
		}

		Ok(DeviceSpec {
			container_path: container
				.filter(|path| !path.is_empty())
				.unwrap_or_else(|| host.clone()),
			host_path: host,
			cgroup_permissions: permissions
				.filter(|perms| !perms.is_empty())
				.unwrap_or_else(|| DEFAULT_CGROUP_PERMISSIONS.to_string()),
		})
	}
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;
	use serde_json::json;

	use super::*;

	fn port(value: serde_json::Value) -> PortMapping {
		serde_json::from_value::<Port>(value)
			.unwrap()
			.mapping()
			.unwrap()
	}

	#[test]
	fn short_ports() {
		assert_eq!(
			port(json!("80:80")),
			PortMapping {
				host_ip: None,
				published: Some(80),
				target: 80,
				protocol: Protocol::Tcp
			}
		);

		let single = port(json!("8080"));
		assert_eq!(single.published, None);
		assert_eq!(single.target, 8080);

		let numeric = port(json!(3000));
		assert_eq!(numeric.published, None);
		assert_eq!(numeric.target, 3000);

		let with_ip = port(json!("127.0.0.1:5432:5432/udp"));
		assert_eq!(with_ip.host_ip.as_deref(), Some("127.0.0.1"));
		assert_eq!(with_ip.published, Some(5432));
		assert_eq!(with_ip.protocol, Protocol::Udp);
	}

	#[test]
	fn long_ports() {
		let mapping = port(json!({ "target": 80, "published": "8080", "protocol": "tcp" }));

		assert_eq!(mapping.published, Some(8080));
		assert_eq!(mapping.target, 80);
	}

	#[test]
	fn port_ranges_are_rejected() {
		let result = Port::String("8000-8010:8000-8010".to_string()).mapping();

		assert!(matches!(result, Err(ComposeError::InvalidPort { .. })));
	}

	#[test]
	fn short_volumes() {
		let bind = ServiceVolume::Simple("/var/data:/data:ro".to_string())
			.mount()
			.unwrap();

		assert_eq!(bind.kind, MountKind::Bind);
		assert_eq!(bind.source.as_deref(), Some("/var/data"));
		assert_eq!(bind.target, "/data");
		assert!(bind.read_only);

		let named = ServiceVolume::Simple("db-data:/var/lib/postgresql/data".to_string())
			.mount()
			.unwrap();

		assert_eq!(named.kind, MountKind::Named);
		assert!(!named.read_only);

		let anonymous = ServiceVolume::Simple("/cache".to_string())
			.mount()
			.unwrap();

		assert_eq!(anonymous.kind, MountKind::Anonymous);

		let relative = ServiceVolume::Simple("./conf:/etc/conf".to_string())
			.mount()
			.unwrap();

		assert!(relative.is_relative_bind());
	}

	#[test]
	fn long_volumes() {
		let volume: ServiceVolume = serde_json::from_value(json!({
			"type": "volume",
			"source": "db-data",
			"target": "/data",
			"read_only": true
		}))
		.unwrap();

		let mount = volume.mount().unwrap();

		assert_eq!(mount.kind, MountKind::Named);
		assert!(mount.read_only);
	}

	#[test]
	fn devices_from_both_shapes() {
		let short = DeviceMapping::String("/dev/ttyUSB0:/dev/ttyUSB1".to_string())
			.spec()
			.unwrap();

		assert_eq!(
			short,
			DeviceSpec {
				host_path: "/dev/ttyUSB0".to_string(),
				container_path: "/dev/ttyUSB1".to_string(),
				cgroup_permissions: "rwm".to_string(),
			}
		);

		let detailed: DeviceMapping = serde_json::from_value(json!({
			"source": "/dev/sda",
			"permissions": "r"
		}))
		.unwrap();

		let detailed = detailed.spec().unwrap();

		assert_eq!(detailed.container_path, "/dev/sda");
		assert_eq!(detailed.cgroup_permissions, "r");
	}
}
