use indexmap::IndexMap;
#[cfg(feature = "schemars")]
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{Constraint, Service};

/// The driver every translated task runs with.
pub const DOCKER_DRIVER: &str = "docker";

/// An individual unit of work.
///
/// See more: https://developer.hashicorp.com/nomad/docs/job-specification/task
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "schemars", derive(JsonSchema))]
#[serde(default)]
pub struct Task {
	pub driver: String,

	/// Driver-specific settings.
	///
	/// See more: https://developer.hashicorp.com/nomad/docs/drivers/docker
	pub config: IndexMap<String, Value>,

	#[serde(skip_serializing_if = "IndexMap::is_empty")]
	pub env: IndexMap<String, String>,

	/// The user the task runs as.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub user: Option<String>,

	pub resources: Resources,

	#[serde(skip_serializing_if = "Vec::is_empty")]
	pub templates: Vec<Template>,

	/// Mounts of group volumes into the task, keyed by mount name.
	#[serde(skip_serializing_if = "IndexMap::is_empty")]
	pub volume_mounts: IndexMap<String, VolumeMount>,

	#[serde(skip_serializing_if = "Vec::is_empty")]
	pub constraints: Vec<Constraint>,

	#[serde(skip_serializing_if = "Vec::is_empty")]
	pub services: Vec<Service>,

	/// How long to wait between the kill signal and a forced kill.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub kill_timeout: Option<String>,

	#[serde(skip_serializing_if = "Option::is_none")]
	pub kill_signal: Option<String>,

	#[serde(skip_serializing_if = "IndexMap::is_empty")]
	pub meta: IndexMap<String, String>,
}

impl Default for Task {
	fn default() -> Self {
		Self {
			driver: DOCKER_DRIVER.to_string(),
			config: IndexMap::new(),
			env: IndexMap::new(),
			user: None,
			resources: Resources::default(),
			templates: vec![],
			volume_mounts: IndexMap::new(),
			constraints: vec![],
			services: vec![],
			kill_timeout: None,
			kill_signal: None,
			meta: IndexMap::new(),
		}
	}
}

impl Task {
	/// The image from the driver config, if set.
	pub fn image(&self) -> Option<&str> {
		self.config.get("image").and_then(Value::as_str)
	}
}

/// Resource requirements of a task.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "schemars", derive(JsonSchema))]
#[serde(default)]
pub struct Resources {
	/// CPU in MHz.
	pub cpu: u32,

	/// Memory in MB.
	pub memory: u32,
}

impl Default for Resources {
	fn default() -> Self {
		Self {
			cpu: 100,
			memory: 128,
		}
	}
}

/// A file rendered into the task directory.
///
/// See more: https://developer.hashicorp.com/nomad/docs/job-specification/template
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[cfg_attr(feature = "schemars", derive(JsonSchema))]
#[serde(default)]
pub struct Template {
	/// The template body.
	pub data: String,

	/// Relative to the task directory.
	pub destination: String,

	/// `noop`, `restart` or `signal`.
	pub change_mode: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[cfg_attr(feature = "schemars", derive(JsonSchema))]
#[serde(default)]
pub struct VolumeMount {
	/// The name of the group volume.
	pub volume: String,

	/// Where the volume is mounted inside the task.
	pub destination: String,

	pub read_only: bool,
}
