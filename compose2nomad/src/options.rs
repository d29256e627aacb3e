use std::path::Path;

use clap::{Args, ValueEnum};
use merge_it::Merge;
use nomad_job_config::JobType;
#[cfg(feature = "schemars")]
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{AppError, fs::*};

/// The resolved settings for a conversion.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConvertOptions {
	/// The id and name of the generated job.
	pub job_name: String,
	pub namespace: String,
	pub region: String,
	pub datacenters: Vec<String>,
	pub priority: u8,
	pub job_type: JobType,
	/// Translates even when the document does not pass validation.
	pub skip_validation: bool,
	/// Only affects the rendering of the job.
	pub include_comments: bool,
	/// Copies the compose labels into the driver config.
	pub preserve_labels: bool,
	/// The network mode of the groups that declare ports.
	pub network_mode: String,
	pub resource_defaults: ResourceDefaults,
}

impl Default for ConvertOptions {
	fn default() -> Self {
		Self {
			job_name: "docker-compose".to_string(),
			namespace: "default".to_string(),
			region: "global".to_string(),
			datacenters: vec!["dc1".to_string()],
			priority: 50,
			job_type: JobType::Service,
			skip_validation: false,
			include_comments: false,
			preserve_labels: true,
			network_mode: "bridge".to_string(),
			resource_defaults: ResourceDefaults::default(),
		}
	}
}

/// The resources given to tasks that do not declare any.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResourceDefaults {
	/// In MHz.
	pub cpu: u32,
	/// In MB.
	pub memory: u32,
}

impl Default for ResourceDefaults {
	fn default() -> Self {
		Self {
			cpu: 100,
			memory: 128,
		}
	}
}

/// The output formats for a converted job.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[cfg_attr(feature = "schemars", derive(JsonSchema))]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
	#[default]
	Hcl,
	Json,
}

/// Conversion settings, as they appear in a config file or on the command line.
#[derive(Args, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "schemars", derive(JsonSchema))]
#[serde(default, deny_unknown_fields)]
pub struct OptionsConfig {
	/// The id and name of the generated job. [default: docker-compose]
	#[arg(long, value_name = "NAME")]
	pub job_name: Option<String>,

	/// The namespace of the job. [default: default]
	#[arg(long)]
	pub namespace: Option<String>,

	/// The region of the job. [default: global]
	#[arg(long)]
	pub region: Option<String>,

	/// The datacenters where the job can be placed. [default: dc1]
	#[arg(long, value_delimiter = ',', value_name = "DC")]
	#[serde(skip_serializing_if = "Option::is_none")]
	pub datacenters: Option<Vec<String>>,

	/// The job priority, between 1 and 100. [default: 50]
	#[arg(long, value_parser = clap::value_parser!(u8).range(1..=100))]
	pub priority: Option<u8>,

	/// One of service, batch, system or sysbatch. [default: service]
	#[arg(long, value_name = "TYPE")]
	pub job_type: Option<JobType>,

	/// Converts the file even if it does not pass validation.
	#[arg(long, num_args = 0..=1, default_missing_value = "true")]
	pub skip_validation: Option<bool>,

	/// Adds comments with the origin of each group to the generated HCL.
	#[arg(long, num_args = 0..=1, default_missing_value = "true")]
	pub include_comments: Option<bool>,

	/// Copies the labels of each service into its driver config. [default: true]
	#[arg(long, num_args = 0..=1, default_missing_value = "true")]
	pub preserve_labels: Option<bool>,

	/// The network mode for groups with ports. [default: bridge]
	#[arg(long, value_name = "MODE")]
	pub network_mode: Option<String>,

	#[command(flatten)]
	pub resource_defaults: Option<ResourceDefaultsConfig>,
}

/// The resources for tasks that do not declare any.
#[derive(Args, Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "schemars", derive(JsonSchema))]
#[serde(default, deny_unknown_fields)]
pub struct ResourceDefaultsConfig {
	/// The default cpu in MHz. [default: 100]
	#[arg(long = "default-cpu", value_name = "MHZ")]
	pub cpu: Option<u32>,

	/// The default memory in MB. [default: 128]
	#[arg(long = "default-memory", value_name = "MB")]
	pub memory: Option<u32>,
}

macro_rules! overwrite_if_some {
	($target:ident, $other:ident => $($names:ident),*) => {
		$(
			if $other.$names.is_some() {
				$target.$names = $other.$names;
			}
		)*
	};
}

impl Merge for ResourceDefaultsConfig {
	fn merge(&mut self, other: Self) {
		overwrite_if_some!(self, other => cpu, memory);
	}
}

impl Merge for OptionsConfig {
	fn merge(&mut self, other: Self) {
		overwrite_if_some!(self, other => job_name, namespace, region, datacenters, priority, job_type, skip_validation, include_comments, preserve_labels, network_mode);

		if let Some(resource_defaults) = other.resource_defaults {
			self
				.resource_defaults
				.get_or_insert_default()
				.merge(resource_defaults);
		}
	}
}

impl OptionsConfig {
	pub fn from_file(path: &Path) -> Result<Self, AppError> {
		let format = path
			.extension()
			.and_then(|ext| ext.to_str())
			.unwrap_or_default();

		match format {
			"yaml" | "yml" => deserialize_yaml(path),
			"toml" => deserialize_toml(path),
			"json" => deserialize_json(path),
			_ => Err(AppError::InvalidConfigFormat(path.to_path_buf())),
		}
	}

	#[cfg(feature = "schemars")]
	pub fn generate_json_schema(output: &Path) -> Result<(), AppError> {
		use anyhow::Context;

		let schema = schemars::schema_for!(OptionsConfig);

		let file = std::fs::File::create(output).map_err(|e| AppError::WriteError {
			path: output.to_path_buf(),
			source: e,
		})?;

		serde_json::to_writer_pretty(&file, &schema)
			.with_context(|| format!("Failed to write the json schema to `{}`", output.display()))?;

		Ok(())
	}

	/// Fills the unset fields with the defaults.
	pub fn resolve(self) -> ConvertOptions {
		let defaults = ConvertOptions::default();
		let resource_defaults = self.resource_defaults.unwrap_or_default();

		ConvertOptions {
			job_name: self.job_name.unwrap_or(defaults.job_name),
			namespace: self.namespace.unwrap_or(defaults.namespace),
			region: self.region.unwrap_or(defaults.region),
			datacenters: self
				.datacenters
				.filter(|dcs| !dcs.is_empty())
				.unwrap_or(defaults.datacenters),
			priority: self.priority.unwrap_or(defaults.priority),
			job_type: self.job_type.unwrap_or(defaults.job_type),
			skip_validation: self.skip_validation.unwrap_or(defaults.skip_validation),
			include_comments: self.include_comments.unwrap_or(defaults.include_comments),
			preserve_labels: self.preserve_labels.unwrap_or(defaults.preserve_labels),
			network_mode: self.network_mode.unwrap_or(defaults.network_mode),
			resource_defaults: ResourceDefaults {
				cpu: resource_defaults
					.cpu
					.unwrap_or(defaults.resource_defaults.cpu),
				memory: resource_defaults
					.memory
					.unwrap_or(defaults.resource_defaults.memory),
			},
		}
	}
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;

	use super::*;

	#[test]
	fn later_layers_win() {
		let mut config = OptionsConfig {
			job_name: Some("from-file".to_string()),
			region: Some("eu".to_string()),
			resource_defaults: Some(ResourceDefaultsConfig {
				cpu: Some(200),
				memory: Some(256),
			}),
			..Default::default()
		};

		config.merge(OptionsConfig {
			job_name: Some("from-cli".to_string()),
			resource_defaults: Some(ResourceDefaultsConfig {
				cpu: None,
				memory: Some(512),
			}),
			..Default::default()
		});

		let options = config.resolve();

		assert_eq!(options.job_name, "from-cli");
		assert_eq!(options.region, "eu");
		assert_eq!(options.namespace, "default");
		assert_eq!(
			options.resource_defaults,
			ResourceDefaults {
				cpu: 200,
				memory: 512
			}
		);
	}

	#[test]
	fn empty_config_resolves_to_defaults() {
		assert_eq!(OptionsConfig::default().resolve(), ConvertOptions::default());
	}
}
