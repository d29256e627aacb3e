#[cfg(feature = "schemars")]
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{ListOrMap, SingleValue};

/// Specifies the configuration for the deployment and lifecycle of services, as defined in the [Compose Deploy Specification](https://docs.docker.com/reference/compose-file/deploy)
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Default)]
#[cfg_attr(feature = "schemars", derive(JsonSchema))]
#[serde(default)]
pub struct Deploy {
	/// Deployment mode (`global` or `replicated`).
	#[serde(skip_serializing_if = "Option::is_none")]
	pub mode: Option<String>,

	/// If the service is replicated (which is the default), replicas specifies the number of containers that should be running at any given time.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub replicas: Option<u32>,

	/// Specifies metadata for the service.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub labels: Option<ListOrMap>,

	/// Specifies constraints and preferences for the platform to select a physical node to run service containers.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub placement: Option<Placement>,

	/// Configures physical resource constraints for container to run on platform.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub resources: Option<Resources>,

	/// Configures if and how to restart containers when they exit.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub restart_policy: Option<RestartPolicy>,

	/// Configures how the service should be updated.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub update_config: Option<UpdateConfig>,
}

impl Deploy {
	pub fn limits(&self) -> Option<&ResourceSpec> {
		self.resources.as_ref()?.limits.as_ref()
	}

	pub fn reservations(&self) -> Option<&ResourceSpec> {
		self.resources.as_ref()?.reservations.as_ref()
	}
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Default)]
#[cfg_attr(feature = "schemars", derive(JsonSchema))]
#[serde(default)]
pub struct Resources {
	/// The platform must prevent the container from allocating more resources.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub limits: Option<ResourceSpec>,

	/// The platform must guarantee that the container can allocate at least the configured amount.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub reservations: Option<ResourceSpec>,
}

/// The shape shared by `limits` and `reservations`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Default)]
#[cfg_attr(feature = "schemars", derive(JsonSchema))]
#[serde(default)]
pub struct ResourceSpec {
	/// The number of (potentially virtual) CPUs, as a number or a numeric string.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub cpus: Option<SingleValue>,

	/// An amount of bytes, as a number or a string with a unit (`b`, `k`, `m`, `g`).
	#[serde(skip_serializing_if = "Option::is_none")]
	pub memory: Option<SingleValue>,

	#[serde(skip_serializing_if = "Option::is_none")]
	pub pids: Option<i64>,

	/// Device reservations (GPUs and such).
	#[serde(skip_serializing_if = "Option::is_none")]
	pub devices: Option<Vec<Value>>,

	#[serde(skip_serializing_if = "Option::is_none")]
	pub generic_resources: Option<Vec<Value>>,
}

impl ResourceSpec {
	pub fn requests_devices(&self) -> bool {
		self.devices.is_some() || self.generic_resources.is_some()
	}
}

#[derive(Clone, Debug, Serialize, Deserialize, Eq, PartialEq, Default)]
#[cfg_attr(feature = "schemars", derive(JsonSchema))]
#[serde(default)]
pub struct Placement {
	/// Hard requirements, such as `node.role == manager`.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub constraints: Option<Vec<String>>,

	#[serde(skip_serializing_if = "Option::is_none")]
	pub preferences: Option<Vec<Value>>,

	#[serde(skip_serializing_if = "Option::is_none")]
	pub max_replicas_per_node: Option<u32>,
}

#[derive(Clone, Debug, Serialize, Deserialize, Eq, PartialEq, Default)]
#[cfg_attr(feature = "schemars", derive(JsonSchema))]
#[serde(default)]
pub struct RestartPolicy {
	/// `none`, `on-failure` or `any` (default).
	#[serde(skip_serializing_if = "Option::is_none")]
	pub condition: Option<String>,

	/// How long to wait between restart attempts.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub delay: Option<String>,

	/// How many times to attempt to restart a container before giving up.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub max_attempts: Option<u32>,

	/// How long to wait before deciding if a restart has succeeded.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub window: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, Eq, PartialEq, Default)]
#[cfg_attr(feature = "schemars", derive(JsonSchema))]
#[serde(default)]
pub struct UpdateConfig {
	#[serde(skip_serializing_if = "Option::is_none")]
	pub parallelism: Option<u32>,

	#[serde(skip_serializing_if = "Option::is_none")]
	pub delay: Option<String>,

	#[serde(skip_serializing_if = "Option::is_none")]
	pub failure_action: Option<String>,

	#[serde(skip_serializing_if = "Option::is_none")]
	pub monitor: Option<String>,

	#[serde(skip_serializing_if = "Option::is_none")]
	pub order: Option<String>,
}
