use std::fmt::{self, Display};

use indexmap::IndexMap;
#[cfg(feature = "schemars")]
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{Constraint, Spread, Task};

/// A set of tasks that must be co-located on the same client node.
///
/// See more: https://developer.hashicorp.com/nomad/docs/job-specification/group
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "schemars", derive(JsonSchema))]
#[serde(default)]
pub struct TaskGroup {
	/// The number of instances of this group to run.
	pub count: u32,

	#[serde(skip_serializing_if = "Option::is_none")]
	pub network: Option<Network>,

	/// Volumes requested by the group, keyed by the name used in `volume_mount`.
	#[serde(skip_serializing_if = "IndexMap::is_empty")]
	pub volumes: IndexMap<String, Volume>,

	#[serde(skip_serializing_if = "Vec::is_empty")]
	pub services: Vec<Service>,

	#[serde(skip_serializing_if = "Option::is_none")]
	pub restart: Option<RestartPolicy>,

	#[serde(skip_serializing_if = "Vec::is_empty")]
	pub constraints: Vec<Constraint>,

	#[serde(skip_serializing_if = "Vec::is_empty")]
	pub spreads: Vec<Spread>,

	#[serde(skip_serializing_if = "IndexMap::is_empty")]
	pub meta: IndexMap<String, String>,

	pub tasks: IndexMap<String, Task>,
}

impl Default for TaskGroup {
	fn default() -> Self {
		Self {
			count: 1,
			network: None,
			volumes: IndexMap::new(),
			services: vec![],
			restart: None,
			constraints: vec![],
			spreads: vec![],
			meta: IndexMap::new(),
			tasks: IndexMap::new(),
		}
	}
}

/// The network requirements of a group.
///
/// See more: https://developer.hashicorp.com/nomad/docs/job-specification/network
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[cfg_attr(feature = "schemars", derive(JsonSchema))]
#[serde(default)]
pub struct Network {
	/// `bridge`, `host`, `none` or `cni/<name>`.
	pub mode: String,

	/// Named ports, referenced by their label in services and driver configs.
	#[serde(skip_serializing_if = "IndexMap::is_empty")]
	pub ports: IndexMap<String, Port>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[cfg_attr(feature = "schemars", derive(JsonSchema))]
#[serde(default)]
pub struct Port {
	/// A fixed port on the host. A dynamic one is allocated when absent.
	#[serde(rename = "static", skip_serializing_if = "Option::is_none")]
	pub static_: Option<u16>,

	/// The port inside the task's network namespace.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub to: Option<u16>,

	#[serde(skip_serializing_if = "Option::is_none")]
	pub host_network: Option<String>,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[cfg_attr(feature = "schemars", derive(JsonSchema))]
#[serde(rename_all = "lowercase")]
pub enum VolumeType {
	/// A `host_volume` declared in the client configuration.
	#[default]
	Host,
	/// A volume provided by a CSI plugin.
	Csi,
}

impl Display for VolumeType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Host => f.write_str("host"),
			Self::Csi => f.write_str("csi"),
		}
	}
}

/// A volume requested by a group.
///
/// See more: https://developer.hashicorp.com/nomad/docs/job-specification/volume
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[cfg_attr(feature = "schemars", derive(JsonSchema))]
#[serde(default)]
pub struct Volume {
	#[serde(rename = "type")]
	pub type_: VolumeType,

	/// The name of the host volume or the id of the CSI volume.
	pub source: String,

	pub read_only: bool,

	/// Only meaningful for CSI volumes.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub access_mode: Option<String>,

	/// Only meaningful for CSI volumes.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub attachment_mode: Option<String>,
}

/// A service registration.
///
/// See more: https://developer.hashicorp.com/nomad/docs/job-specification/service
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[cfg_attr(feature = "schemars", derive(JsonSchema))]
#[serde(default)]
pub struct Service {
	pub name: String,

	/// The label of a port defined in the group network.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub port: Option<String>,

	#[serde(skip_serializing_if = "Vec::is_empty")]
	pub tags: Vec<String>,

	#[serde(skip_serializing_if = "Vec::is_empty")]
	pub checks: Vec<Check>,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[cfg_attr(feature = "schemars", derive(JsonSchema))]
#[serde(rename_all = "lowercase")]
pub enum CheckType {
	#[default]
	Script,
	Http,
	Tcp,
}

impl Display for CheckType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Script => f.write_str("script"),
			Self::Http => f.write_str("http"),
			Self::Tcp => f.write_str("tcp"),
		}
	}
}

/// A health check attached to a service.
///
/// See more: https://developer.hashicorp.com/nomad/docs/job-specification/check
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[cfg_attr(feature = "schemars", derive(JsonSchema))]
#[serde(default)]
pub struct Check {
	#[serde(rename = "type")]
	pub type_: CheckType,

	pub name: String,

	/// The command to run, for script checks.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub command: Option<String>,

	#[serde(skip_serializing_if = "Vec::is_empty")]
	pub args: Vec<String>,

	pub interval: String,

	pub timeout: String,

	/// The task in which a script check runs, required when the service is defined on a group.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub task: Option<String>,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[cfg_attr(feature = "schemars", derive(JsonSchema))]
#[serde(rename_all = "lowercase")]
pub enum RestartMode {
	/// Wait for `interval` to pass and then restart again.
	#[default]
	Delay,
	/// Do not restart once `attempts` are exhausted within `interval`.
	Fail,
}

impl Display for RestartMode {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Delay => f.write_str("delay"),
			Self::Fail => f.write_str("fail"),
		}
	}
}

/// How the client restarts failed tasks.
///
/// See more: https://developer.hashicorp.com/nomad/docs/job-specification/restart
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "schemars", derive(JsonSchema))]
#[serde(default)]
pub struct RestartPolicy {
	/// Restarts allowed within `interval`. Zero means no restarts in fail mode, and no limit otherwise.
	pub attempts: u32,

	pub delay: String,

	pub interval: String,

	pub mode: RestartMode,
}

impl Default for RestartPolicy {
	fn default() -> Self {
		Self {
			attempts: 3,
			delay: "15s".to_string(),
			interval: "5m".to_string(),
			mode: RestartMode::Delay,
		}
	}
}
