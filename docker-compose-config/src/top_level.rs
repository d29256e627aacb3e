use indexmap::IndexMap;
#[cfg(feature = "schemars")]
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::ListOrMap;

/// Marks a resource as managed outside of this compose file.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "schemars", derive(JsonSchema))]
#[serde(untagged)]
pub enum External {
	Bool(bool),
	/// The legacy `external: { name: ... }` shape.
	Named { name: String },
}

impl External {
	pub const fn is_external(&self) -> bool {
		match self {
			Self::Bool(external) => *external,
			Self::Named { .. } => true,
		}
	}
}

fn is_external(external: Option<&External>) -> bool {
	external.is_some_and(External::is_external)
}

/// Configs allow services to adapt their behaviour without the need to rebuild a Docker image.
///
/// See more: https://docs.docker.com/reference/compose-file/configs/
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[cfg_attr(feature = "schemars", derive(JsonSchema))]
#[serde(default)]
pub struct TopLevelConfig {
	/// The config is created with the contents of the file at the specified path.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub file: Option<String>,

	/// The config is created with the inlined content.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub content: Option<String>,

	/// The config is created with the value of an environment variable.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub environment: Option<String>,

	/// If set to true, specifies that this config has already been created.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub external: Option<External>,

	/// The name of the config object in the container engine to look up.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub name: Option<String>,
}

impl TopLevelConfig {
	pub fn is_external(&self) -> bool {
		is_external(self.external.as_ref())
	}

	/// Whether this config declares where its content comes from.
	pub fn has_source(&self) -> bool {
		self.file.is_some() || self.content.is_some() || self.external.is_some()
	}
}

/// Secrets are a flavor of configs focusing on sensitive data.
///
/// See more: https://docs.docker.com/reference/compose-file/secrets/
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[cfg_attr(feature = "schemars", derive(JsonSchema))]
#[serde(default)]
pub struct TopLevelSecret {
	/// The secret is created with the contents of the file at the specified path.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub file: Option<String>,

	/// The secret is created with the value of an environment variable.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub environment: Option<String>,

	#[serde(skip_serializing_if = "Option::is_none")]
	pub external: Option<External>,

	#[serde(skip_serializing_if = "Option::is_none")]
	pub name: Option<String>,
}

impl TopLevelSecret {
	pub fn is_external(&self) -> bool {
		is_external(self.external.as_ref())
	}

	pub const fn has_source(&self) -> bool {
		self.file.is_some() || self.external.is_some()
	}
}

/// A named network for the Compose application.
///
/// See more: https://docs.docker.com/reference/compose-file/networks/
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Default)]
#[cfg_attr(feature = "schemars", derive(JsonSchema))]
#[serde(default)]
pub struct TopLevelNetwork {
	#[serde(skip_serializing_if = "Option::is_none")]
	pub driver: Option<String>,

	#[serde(skip_serializing_if = "Option::is_none")]
	pub driver_opts: Option<IndexMap<String, serde_json::Value>>,

	#[serde(skip_serializing_if = "Option::is_none")]
	pub external: Option<External>,

	#[serde(skip_serializing_if = "Option::is_none")]
	pub internal: Option<bool>,

	#[serde(skip_serializing_if = "Option::is_none")]
	pub attachable: Option<bool>,

	#[serde(skip_serializing_if = "Option::is_none")]
	pub labels: Option<ListOrMap>,

	#[serde(skip_serializing_if = "Option::is_none")]
	pub name: Option<String>,
}

/// A named volume for the Compose application.
///
/// See more: https://docs.docker.com/reference/compose-file/volumes/
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Default)]
#[cfg_attr(feature = "schemars", derive(JsonSchema))]
#[serde(default)]
pub struct TopLevelVolume {
	#[serde(skip_serializing_if = "Option::is_none")]
	pub driver: Option<String>,

	#[serde(skip_serializing_if = "Option::is_none")]
	pub driver_opts: Option<IndexMap<String, serde_json::Value>>,

	#[serde(skip_serializing_if = "Option::is_none")]
	pub external: Option<External>,

	#[serde(skip_serializing_if = "Option::is_none")]
	pub labels: Option<ListOrMap>,

	#[serde(skip_serializing_if = "Option::is_none")]
	pub name: Option<String>,
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use super::*;

	#[test]
	fn external_shapes() {
		let config: TopLevelConfig =
			serde_json::from_value(json!({ "external": { "name": "shared" } })).unwrap();
		let disabled: TopLevelSecret = serde_json::from_value(json!({ "external": false })).unwrap();

		assert!(config.is_external());
		assert!(config.has_source());
		assert!(!disabled.is_external());
	}

	#[test]
	fn sourceless_entries() {
		let config: TopLevelConfig = serde_json::from_value(json!({ "name": "x" })).unwrap();
		let secret: TopLevelSecret =
			serde_json::from_value(json!({ "environment": "TOKEN" })).unwrap();

		assert!(!config.has_source());
		assert!(!secret.has_source());
	}
}
