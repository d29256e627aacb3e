use indexmap::IndexMap;
#[cfg(feature = "schemars")]
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
	ComposeError, Deploy, DeviceMapping, ListOrMap, Port, ServiceVolume, SingleValue,
	StringOrList, StringOrNum,
};

/// Defines a service for a Compose application.
///
/// See more: https://docs.docker.com/reference/compose-file/services/
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Default)]
#[cfg_attr(feature = "schemars", derive(JsonSchema))]
#[serde(default)]
pub struct Service {
	/// Specifies the image to start the container from.
	///
	/// See more: https://docs.docker.com/reference/compose-file/services/#image
	#[serde(skip_serializing_if = "Option::is_none")]
	pub image: Option<String>,

	/// Specifies the build configuration for creating a container image from source.
	///
	/// See more: https://docs.docker.com/reference/compose-file/build/
	#[serde(skip_serializing_if = "Option::is_none")]
	pub build: Option<BuildStep>,

	/// A custom container name, rather than a name generated by default.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub container_name: Option<String>,

	/// A custom host name to use for the service container.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub hostname: Option<String>,

	/// Overrides the default command declared by the container image.
	///
	/// See more: https://docs.docker.com/reference/compose-file/services/#command
	#[serde(skip_serializing_if = "Option::is_none")]
	pub command: Option<StringOrList>,

	/// Declares the default entrypoint for the service container.
	///
	/// See more: https://docs.docker.com/reference/compose-file/services/#entrypoint
	#[serde(skip_serializing_if = "Option::is_none")]
	pub entrypoint: Option<StringOrList>,

	#[serde(skip_serializing_if = "Option::is_none")]
	pub working_dir: Option<String>,

	#[serde(skip_serializing_if = "Option::is_none")]
	pub user: Option<String>,

	/// Defines environment variables set in the container. environment can use either an array or a map.
	///
	/// See more: https://docs.docker.com/reference/compose-file/services/#environment
	#[serde(skip_serializing_if = "Option::is_none")]
	pub environment: Option<ListOrMap>,

	/// One or more files that contain environment variables to be passed to the containers.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub env_file: Option<Value>,

	/// Port mappings between the host and the container.
	///
	/// See more: https://docs.docker.com/reference/compose-file/services/#ports
	#[serde(skip_serializing_if = "Option::is_none")]
	pub ports: Option<Vec<Port>>,

	/// Container ports that are exposed without being published to the host.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub expose: Option<Vec<StringOrNum>>,

	/// The networks that service containers are attached to.
	///
	/// See more: https://docs.docker.com/reference/compose-file/services/#networks
	#[serde(skip_serializing_if = "Option::is_none")]
	pub networks: Option<ServiceNetworks>,

	/// Sets a service container's network mode (`bridge`, `host`, `none`, `service:{name}`...).
	#[serde(skip_serializing_if = "Option::is_none")]
	pub network_mode: Option<String>,

	#[serde(skip_serializing_if = "Option::is_none")]
	pub dns: Option<StringOrList>,

	#[serde(skip_serializing_if = "Option::is_none")]
	pub dns_search: Option<StringOrList>,

	#[serde(skip_serializing_if = "Option::is_none")]
	pub links: Option<Vec<String>>,

	/// Adds hostname mappings to the container network interface configuration.
	///
	/// See more: https://docs.docker.com/reference/compose-file/services/#extra_hosts
	#[serde(skip_serializing_if = "Option::is_none")]
	pub extra_hosts: Option<ExtraHosts>,

	/// Mount host paths or named volumes.
	///
	/// See more: https://docs.docker.com/reference/compose-file/services/#volumes
	#[serde(skip_serializing_if = "Option::is_none")]
	pub volumes: Option<Vec<ServiceVolume>>,

	/// Mounts a temporary file system inside the container.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub tmpfs: Option<StringOrList>,

	/// Specifies the configuration for the deployment and lifecycle of services.
	///
	/// See more: https://docs.docker.com/reference/compose-file/deploy
	#[serde(skip_serializing_if = "Option::is_none")]
	pub deploy: Option<Deploy>,

	/// The number of (potentially virtual) CPUs to allocate to service containers.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub cpus: Option<SingleValue>,

	#[serde(skip_serializing_if = "Option::is_none")]
	pub mem_limit: Option<SingleValue>,

	#[serde(skip_serializing_if = "Option::is_none")]
	pub mem_reservation: Option<SingleValue>,

	#[serde(skip_serializing_if = "Option::is_none")]
	pub cap_add: Option<Vec<String>>,

	#[serde(skip_serializing_if = "Option::is_none")]
	pub cap_drop: Option<Vec<String>>,

	#[serde(skip_serializing_if = "Option::is_none")]
	pub privileged: Option<bool>,

	#[serde(skip_serializing_if = "Option::is_none")]
	pub read_only: Option<bool>,

	#[serde(skip_serializing_if = "Option::is_none")]
	pub security_opt: Option<Vec<String>>,

	/// Defines a list of device mappings for created containers.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub devices: Option<Vec<DeviceMapping>>,

	/// Overrides the default ulimits for a container.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub ulimits: Option<IndexMap<String, Ulimit>>,

	#[serde(skip_serializing_if = "Option::is_none")]
	pub sysctls: Option<ListOrMap>,

	#[serde(skip_serializing_if = "Option::is_none")]
	pub pid: Option<String>,

	#[serde(skip_serializing_if = "Option::is_none")]
	pub ipc: Option<String>,

	#[serde(skip_serializing_if = "Option::is_none")]
	pub shm_size: Option<StringOrNum>,

	#[serde(skip_serializing_if = "Option::is_none")]
	pub init: Option<bool>,

	#[serde(skip_serializing_if = "Option::is_none")]
	pub tty: Option<bool>,

	#[serde(skip_serializing_if = "Option::is_none")]
	pub stdin_open: Option<bool>,

	/// Declares a check that's run to determine whether or not the service containers are "healthy".
	///
	/// See more: https://docs.docker.com/reference/compose-file/services/#healthcheck
	#[serde(skip_serializing_if = "Option::is_none")]
	pub healthcheck: Option<Healthcheck>,

	/// Controls the order of service startup and shutdown.
	///
	/// See more: https://docs.docker.com/reference/compose-file/services/#depends_on
	#[serde(skip_serializing_if = "Option::is_none")]
	pub depends_on: Option<DependsOn>,

	/// The policy that the platform applies on container termination (`no`, `always`, `on-failure[:max-retries]`, `unless-stopped`).
	#[serde(skip_serializing_if = "Option::is_none")]
	pub restart: Option<String>,

	#[serde(skip_serializing_if = "Option::is_none")]
	pub stop_signal: Option<String>,

	#[serde(skip_serializing_if = "Option::is_none")]
	pub stop_grace_period: Option<String>,

	/// Adds metadata to containers. You can use either an array or a map.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub labels: Option<ListOrMap>,

	/// Defines the logging configuration for the service.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub logging: Option<Logging>,

	/// Configs to grant to this service.
	///
	/// See more: https://docs.docker.com/reference/compose-file/services/#configs
	#[serde(skip_serializing_if = "Option::is_none")]
	pub configs: Option<Vec<ServiceConfigOrSecret>>,

	/// Secrets to grant to this service.
	///
	/// See more: https://docs.docker.com/reference/compose-file/services/#secrets
	#[serde(skip_serializing_if = "Option::is_none")]
	pub secrets: Option<Vec<ServiceConfigOrSecret>>,

	#[serde(skip_serializing_if = "Option::is_none")]
	pub profiles: Option<Vec<String>>,
}

impl Service {
	pub fn from_value(raw: &Value) -> Result<Self, ComposeError> {
		// `web:` with no body is a valid (if useless) service
		if raw.is_null() {
			return Ok(Self::default());
		}

		serde_json::from_value(raw.clone()).map_err(|e| ComposeError::InvalidService(e.to_string()))
	}

	/// The number of port labels this service declares, across `ports` and `expose`.
	pub fn declared_port_count(&self) -> usize {
		self.ports.as_ref().map_or(0, Vec::len) + self.expose.as_ref().map_or(0, Vec::len)
	}

	pub fn labels_map(&self) -> IndexMap<String, String> {
		self
			.labels
			.as_ref()
			.map(ListOrMap::to_map)
			.unwrap_or_default()
	}
}

#[derive(Clone, Debug, Deserialize, Serialize, Eq, PartialEq)]
#[cfg_attr(feature = "schemars", derive(JsonSchema))]
#[serde(untagged)]
pub enum BuildStep {
	/// The path to the build context.
	Simple(String),
	Advanced(AdvancedBuildStep),
}

#[derive(Clone, Debug, Deserialize, Serialize, Eq, PartialEq, Default)]
#[cfg_attr(feature = "schemars", derive(JsonSchema))]
#[serde(default)]
pub struct AdvancedBuildStep {
	#[serde(skip_serializing_if = "Option::is_none")]
	pub context: Option<String>,

	#[serde(skip_serializing_if = "Option::is_none")]
	pub dockerfile: Option<String>,

	#[serde(skip_serializing_if = "Option::is_none")]
	pub target: Option<String>,
}

/// The networks attribute, as a list of names or as a map of names to settings.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "schemars", derive(JsonSchema))]
#[serde(untagged)]
pub enum ServiceNetworks {
	List(Vec<String>),
	Map(IndexMap<String, Option<ServiceNetworkSettings>>),
}

impl ServiceNetworks {
	pub fn names(&self) -> Vec<&str> {
		match self {
			Self::List(list) => list.iter().map(String::as_str).collect(),
			Self::Map(map) => map.keys().map(String::as_str).collect(),
		}
	}
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[cfg_attr(feature = "schemars", derive(JsonSchema))]
#[serde(default)]
pub struct ServiceNetworkSettings {
	/// Alternative hostnames for this service on the network.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub aliases: Option<Vec<String>>,

	#[serde(skip_serializing_if = "Option::is_none")]
	pub ipv4_address: Option<String>,

	#[serde(skip_serializing_if = "Option::is_none")]
	pub ipv6_address: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, Eq, PartialEq)]
#[cfg_attr(feature = "schemars", derive(JsonSchema))]
#[serde(untagged)]
pub enum ExtraHosts {
	/// List of host mappings in the format `hostname:IP` or `hostname=IP`.
	List(Vec<String>),

	/// Map of hostnames to one or more addresses.
	Map(IndexMap<String, StringOrList>),
}

impl ExtraHosts {
	/// Normalizes both shapes into `hostname:IP` entries.
	pub fn to_list(&self) -> Vec<String> {
		match self {
			Self::List(list) => list
				.iter()
				.map(|entry| match entry.split_once('=') {
					Some((host, ip)) => format!("{host}:{ip}"),
					None => entry.clone(),
				})
				.collect(),
			Self::Map(map) => map
				.iter()
				.flat_map(|(host, ips)| {
					ips
						.to_list()
						.into_iter()
						.map(move |ip| format!("{host}:{ip}"))
				})
				.collect(),
		}
	}
}

#[derive(Clone, Debug, Serialize, Deserialize, Eq, PartialEq)]
#[cfg_attr(feature = "schemars", derive(JsonSchema))]
#[serde(untagged)]
pub enum Ulimit {
	Single(i64),
	Limits { soft: i64, hard: i64 },
}

impl Ulimit {
	/// Renders the limit as `soft:hard`.
	pub fn to_soft_hard(&self) -> String {
		match self {
			Self::Single(limit) => format!("{limit}:{limit}"),
			Self::Limits { soft, hard } => format!("{soft}:{hard}"),
		}
	}
}

/// Declares a check that's run to determine whether or not the service containers are "healthy".
///
/// See more: https://docs.docker.com/reference/compose-file/services/#healthcheck
#[derive(Clone, Debug, Serialize, Deserialize, Eq, PartialEq, Default)]
#[cfg_attr(feature = "schemars", derive(JsonSchema))]
#[serde(default)]
pub struct Healthcheck {
	/// Disables any default health check set by the image.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub disable: Option<bool>,

	/// The health check interval (default: 30s).
	#[serde(skip_serializing_if = "Option::is_none")]
	pub interval: Option<String>,

	/// Number of consecutive failures needed to report unhealthy.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub retries: Option<u32>,

	/// Start period for the container to initialize before starting health-retries countdown.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub start_period: Option<String>,

	/// The test to perform to check container health. Can be a string or a list.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub test: Option<StringOrList>,

	/// The timeout for each health check (default: 30s).
	#[serde(skip_serializing_if = "Option::is_none")]
	pub timeout: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, Eq, PartialEq)]
#[cfg_attr(feature = "schemars", derive(JsonSchema))]
#[serde(untagged)]
pub enum DependsOn {
	Simple(Vec<String>),
	Conditional(IndexMap<String, DependsOnSettings>),
}

impl DependsOn {
	/// The names of the services depended upon, in either shape.
	pub fn names(&self) -> Vec<&str> {
		match self {
			Self::Simple(list) => list.iter().map(String::as_str).collect(),
			Self::Conditional(map) => map.keys().map(String::as_str).collect(),
		}
	}
}

#[derive(Clone, Debug, Serialize, Deserialize, Eq, PartialEq, Default)]
#[cfg_attr(feature = "schemars", derive(JsonSchema))]
#[serde(default)]
pub struct DependsOnSettings {
	/// `service_started`, `service_healthy` or `service_completed_successfully`.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub condition: Option<String>,

	#[serde(skip_serializing_if = "Option::is_none")]
	pub required: Option<bool>,

	#[serde(skip_serializing_if = "Option::is_none")]
	pub restart: Option<bool>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Default)]
#[cfg_attr(feature = "schemars", derive(JsonSchema))]
#[serde(default)]
pub struct Logging {
	#[serde(skip_serializing_if = "Option::is_none")]
	pub driver: Option<String>,

	#[serde(skip_serializing_if = "Option::is_none")]
	pub options: Option<IndexMap<String, Option<SingleValue>>>,
}

/// A reference from a service to a top-level config or secret.
#[derive(Clone, Debug, Serialize, Deserialize, Eq, PartialEq)]
#[cfg_attr(feature = "schemars", derive(JsonSchema))]
#[serde(untagged)]
pub enum ServiceConfigOrSecret {
	Short(String),
	Long(ServiceConfigOrSecretSettings),
}

impl ServiceConfigOrSecret {
	pub fn source(&self) -> &str {
		match self {
			Self::Short(source) => source,
			Self::Long(settings) => &settings.source,
		}
	}

	pub fn target(&self) -> Option<&str> {
		match self {
			Self::Short(_) => None,
			Self::Long(settings) => settings.target.as_deref(),
		}
	}
}

#[derive(Clone, Default, Debug, Serialize, Deserialize, Eq, PartialEq)]
#[cfg_attr(feature = "schemars", derive(JsonSchema))]
pub struct ServiceConfigOrSecretSettings {
	/// The name of the config or secret as it exists on the platform.
	pub source: String,

	/// The path and name of the file to be mounted in the service's task containers.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub target: Option<String>,

	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub uid: Option<String>,

	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub gid: Option<String>,

	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub mode: Option<StringOrNum>,
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;
	use serde_json::json;

	use super::*;

	#[test]
	fn depends_on_names_from_both_shapes() {
		let list: DependsOn = serde_json::from_value(json!(["db", "cache"])).unwrap();
		let map: DependsOn = serde_json::from_value(json!({
			"db": { "condition": "service_healthy" },
			"cache": { "condition": "service_started" }
		}))
		.unwrap();

		assert_eq!(list.names(), vec!["db", "cache"]);
		assert_eq!(map.names(), vec!["db", "cache"]);
	}

	#[test]
	fn extra_hosts_normalize_to_host_ip_pairs() {
		let list: ExtraHosts =
			serde_json::from_value(json!(["somehost=162.242.195.82", "other:50.31.209.229"]))
				.unwrap();
		let map: ExtraHosts = serde_json::from_value(json!({
			"somehost": ["162.242.195.82", "::1"]
		}))
		.unwrap();

		assert_eq!(
			list.to_list(),
			vec!["somehost:162.242.195.82", "other:50.31.209.229"]
		);
		assert_eq!(map.to_list(), vec!["somehost:162.242.195.82", "somehost:::1"]);
	}

	#[test]
	fn empty_service_bodies_are_accepted() {
		let service = Service::from_value(&Value::Null).unwrap();

		assert_eq!(service, Service::default());
	}

	#[test]
	fn ulimits_render_as_soft_hard() {
		let ulimits: IndexMap<String, Ulimit> = serde_json::from_value(json!({
			"nproc": 65535,
			"nofile": { "soft": 20000, "hard": 40000 }
		}))
		.unwrap();

		assert_eq!(ulimits["nproc"].to_soft_hard(), "65535:65535");
		assert_eq!(ulimits["nofile"].to_soft_hard(), "20000:40000");
	}
}
