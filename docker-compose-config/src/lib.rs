use std::fmt::{self, Display};

use indexmap::IndexMap;
#[cfg(feature = "schemars")]
use schemars::JsonSchema;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;
use thiserror::Error;

mod deploy;
mod mapping;
mod service;
mod top_level;

pub use deploy::*;
pub use mapping::*;
pub use service::*;
pub use top_level::*;

/// The network name that every service joins implicitly.
pub const DEFAULT_NETWORK: &str = "default";

/// The kinds of errors that can occur while reading a compose document.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ComposeError {
	#[error("invalid compose document: {0}")]
	InvalidDocument(String),

	#[error("invalid definition: {0}")]
	InvalidService(String),

	#[error("invalid port mapping `{value}`: {reason}")]
	InvalidPort { value: String, reason: String },

	#[error("invalid volume mapping `{value}`: {reason}")]
	InvalidVolume { value: String, reason: String },

	#[error("invalid device mapping `{0}`")]
	InvalidDevice(String),
}

/// Configuration settings for a Docker Compose file.
///
/// Services are kept as raw documents and only deserialized on access, so that a single
/// malformed service does not prevent the rest of the file from being read.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Default)]
#[cfg_attr(feature = "schemars", derive(JsonSchema))]
pub struct ComposeFile {
	/// The legacy top-level version property.
	///
	/// See more: https://docs.docker.com/reference/compose-file/version-and-name/#version-top-level-element-obsolete
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub version: Option<SingleValue>,

	/// The top-level name property is defined by the Compose Specification as the project name to be used if you don't set one explicitly.
	///
	/// See more: https://docs.docker.com/reference/compose-file/version-and-name/#name-top-level-element
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub name: Option<String>,

	/// Other Compose applications or sub-domains to include.
	///
	/// See more: https://docs.docker.com/reference/compose-file/include/
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub include: Option<Vec<Value>>,

	/// Defines the services for the Compose application, in declaration order.
	///
	/// See more: https://docs.docker.com/reference/compose-file/services/
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub services: Option<IndexMap<String, Value>>,

	/// The named networks for the Compose application.
	///
	/// See more: https://docs.docker.com/reference/compose-file/networks/
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub networks: Option<IndexMap<String, Option<TopLevelNetwork>>>,

	/// The named volumes for the Compose application.
	///
	/// See more: https://docs.docker.com/reference/compose-file/volumes/
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub volumes: Option<IndexMap<String, Option<TopLevelVolume>>>,

	/// Defines or references configuration data that is granted to services in your Compose application.
	///
	/// See more: https://docs.docker.com/reference/compose-file/configs/
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub configs: Option<IndexMap<String, Option<TopLevelConfig>>>,

	/// The named secrets for the Compose application.
	///
	/// See more: https://docs.docker.com/reference/compose-file/secrets/
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub secrets: Option<IndexMap<String, Option<TopLevelSecret>>>,

	/// Vendor-specific keys (`x-*`) and anything else not covered above.
	#[serde(flatten)]
	pub extensions: IndexMap<String, Value>,
}

impl ComposeFile {
	/// Reads the top-level sections of a parsed compose document.
	pub fn from_value(document: &Value) -> Result<Self, ComposeError> {
		if !document.is_object() {
			return Err(ComposeError::InvalidDocument(
				"the top level must be a mapping".to_string(),
			));
		}

		serde_json::from_value(document.clone())
			.map_err(|e| ComposeError::InvalidDocument(e.to_string()))
	}

	/// Iterates the services in declaration order, deserializing each one on its own.
	pub fn service_definitions(
		&self,
	) -> impl Iterator<Item = (&str, Result<Service, ComposeError>)> {
		self
			.services
			.iter()
			.flatten()
			.map(|(name, raw)| (name.as_str(), Service::from_value(raw)))
	}

	pub fn has_service(&self, name: &str) -> bool {
		self
			.services
			.as_ref()
			.is_some_and(|services| services.contains_key(name))
	}

	pub fn has_network(&self, name: &str) -> bool {
		self
			.networks
			.as_ref()
			.is_some_and(|networks| networks.contains_key(name))
	}

	pub fn has_config(&self, name: &str) -> bool {
		self
			.configs
			.as_ref()
			.is_some_and(|configs| configs.contains_key(name))
	}

	pub fn has_secret(&self, name: &str) -> bool {
		self
			.secrets
			.as_ref()
			.is_some_and(|secrets| secrets.contains_key(name))
	}

	/// Returns the top-level config with the given name. Declared but empty entries yield a default (sourceless) config.
	pub fn config(&self, name: &str) -> Option<TopLevelConfig> {
		self
			.configs
			.as_ref()?
			.get(name)
			.map(|config| config.clone().unwrap_or_default())
	}

	pub fn secret(&self, name: &str) -> Option<TopLevelSecret> {
		self
			.secrets
			.as_ref()?
			.get(name)
			.map(|secret| secret.clone().unwrap_or_default())
	}

	/// Deserializes a vendor extension, such as `x-nomad`.
	pub fn extension<T: DeserializeOwned>(&self, key: &str) -> Option<Result<T, ComposeError>> {
		self.extensions.get(key).map(|raw| {
			serde_json::from_value(raw.clone())
				.map_err(|e| ComposeError::InvalidDocument(format!("`{key}`: {e}")))
		})
	}
}

#[derive(Clone, Debug, Serialize, Deserialize, Eq, PartialEq)]
#[cfg_attr(feature = "schemars", derive(JsonSchema))]
#[serde(untagged)]
pub enum StringOrList {
	String(String),
	List(Vec<String>),
}

impl StringOrList {
	/// Returns the items as a list, with a single string becoming a one-item list.
	pub fn to_list(&self) -> Vec<String> {
		match self {
			Self::String(s) => vec![s.clone()],
			Self::List(list) => list.clone(),
		}
	}

	pub fn is_empty(&self) -> bool {
		match self {
			Self::String(s) => s.is_empty(),
			Self::List(list) => list.is_empty(),
		}
	}
}

#[derive(Clone, Debug, Serialize, Deserialize, Eq, PartialEq, PartialOrd, Ord)]
#[cfg_attr(feature = "schemars", derive(JsonSchema))]
#[serde(untagged)]
pub enum StringOrNum {
	Num(i64),
	String(String),
}

impl Display for StringOrNum {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Num(n) => write!(f, "{n}"),
			Self::String(s) => f.write_str(s),
		}
	}
}

/// A scalar value, as it can appear in the values of maps such as `environment` or `labels`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, PartialOrd)]
#[cfg_attr(feature = "schemars", derive(JsonSchema))]
#[serde(untagged)]
pub enum SingleValue {
	String(String),
	Bool(bool),
	Int(i64),
	Float(f64),
}

impl fmt::Display for SingleValue {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		match self {
			Self::String(s) => f.write_str(s),
			Self::Bool(b) => write!(f, "{b}"),
			Self::Int(i) => write!(f, "{i}"),
			Self::Float(fl) => write!(f, "{fl}"),
		}
	}
}

/// A field that accepts either a list of `KEY=VALUE` strings or a map.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "schemars", derive(JsonSchema))]
#[serde(untagged)]
pub enum ListOrMap {
	List(Vec<String>),
	Map(IndexMap<String, Option<SingleValue>>),
}

impl Default for ListOrMap {
	fn default() -> Self {
		Self::Map(IndexMap::new())
	}
}

impl ListOrMap {
	/// Normalizes both shapes into a single map.
	///
	/// List entries are split on the first `=`; entries without one map to an empty value.
	/// When a key appears more than once, the last value wins.
	pub fn to_map(&self) -> IndexMap<String, String> {
		let mut map = IndexMap::new();

		match self {
			Self::List(list) => {
				for entry in list {
					let (key, value) = entry.split_once('=').unwrap_or((entry, ""));

					map.insert(key.to_string(), value.to_string());
				}
			}
			Self::Map(entries) => {
				for (key, value) in entries {
					map.insert(
						key.clone(),
						value
							.as_ref()
							.map(|v| v.to_string())
							.unwrap_or_default(),
					);
				}
			}
		}

		map
	}

	pub fn is_empty(&self) -> bool {
		match self {
			Self::List(list) => list.is_empty(),
			Self::Map(map) => map.is_empty(),
		}
	}
}
