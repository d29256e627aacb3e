use std::collections::HashMap;

use docker_compose_config::{ComposeFile, Service};
use nomad_job_config::{Job, Task, TaskGroup, UpdateStrategy};
use serde_json::Value;
use tracing::{debug, warn};

use crate::{
	ConvertError, ConvertOptions, OutputFormat,
	hcl::{HclOptions, generate_hcl, render_errors},
	validator::validate,
};

mod network;
mod policy;
mod storage;
mod task;
mod templates;

/// The key of the vendor extension with job-level settings.
pub const NOMAD_EXTENSION: &str = "x-nomad";

/// The tag added to every service registration.
pub const COMPOSE_TAG: &str = "docker-compose";

/// A translated job, along with the diagnostics collected along the way.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConversionResult {
	pub job: Job,
	pub warnings: Vec<String>,
	pub errors: Vec<String>,
}

impl ConversionResult {
	fn aborted(errors: Vec<String>, warnings: Vec<String>) -> Self {
		Self {
			job: Job::default(),
			warnings,
			errors,
		}
	}

	pub fn is_success(&self) -> bool {
		self.errors.is_empty()
	}

	/// Renders the job as HCL, or the errors as comments if nothing could be translated.
	pub fn to_hcl(&self, include_comments: bool) -> String {
		if self.job.is_empty() && !self.errors.is_empty() {
			return render_errors(&self.errors);
		}

		generate_hcl(&self.job, &HclOptions { include_comments })
	}

	pub fn to_json(&self) -> Result<String, serde_json::Error> {
		serde_json::to_string_pretty(&self.job)
	}

	pub fn render(
		&self,
		format: OutputFormat,
		include_comments: bool,
	) -> Result<String, serde_json::Error> {
		match format {
			OutputFormat::Hcl => Ok(self.to_hcl(include_comments)),
			OutputFormat::Json => self.to_json(),
		}
	}
}

/// Parses a YAML compose file and converts it.
pub fn convert_yaml(text: &str, options: &ConvertOptions) -> ConversionResult {
	match serde_yaml_ng::from_str::<Value>(text) {
		Ok(document) => convert(&document, options),
		Err(e) => ConversionResult::aborted(vec![format!("Invalid YAML: {e}")], vec![]),
	}
}

/// Translates a parsed compose document into a Nomad job.
///
/// A service that fails to translate is reported and left out, without affecting the others.
pub fn convert(document: &Value, options: &ConvertOptions) -> ConversionResult {
	let file = match ComposeFile::from_value(document) {
		Ok(file) => file,
		Err(e) => return ConversionResult::aborted(vec![e.to_string()], vec![]),
	};

	let mut warnings = vec![];

	if options.skip_validation {
		debug!("Skipping validation");
	} else {
		let validation = validate(document);

		if !validation.is_valid {
			return ConversionResult::aborted(validation.errors, validation.warnings);
		}

		warnings = validation.warnings;
	}

	let mut converter = Converter {
		file: &file,
		options,
		warnings,
		errors: vec![],
	};

	let job = converter.convert_job();

	ConversionResult {
		job,
		warnings: converter.warnings,
		errors: converter.errors,
	}
}

struct Converter<'a> {
	file: &'a ComposeFile,
	options: &'a ConvertOptions,
	warnings: Vec<String>,
	errors: Vec<String>,
}

impl Converter<'_> {
	fn convert_job(&mut self) -> Job {
		let options = self.options;

		let mut job = Job::new(&options.job_name);
		job.type_ = options.job_type;
		job.priority = options.priority;
		job.region.clone_from(&options.region);
		job.namespace.clone_from(&options.namespace);
		job.datacenters.clone_from(&options.datacenters);
		job.update = Some(UpdateStrategy::default());

		self.apply_extension(&mut job);

		// Lowercased name -> declared name
		let mut seen: HashMap<String, String> = HashMap::new();

		let file = self.file;

		for (name, service) in file.service_definitions() {
			if let Some(existing) = seen.get(&name.to_lowercase()) {
				self.fail(name, &ConvertError::NameCollision(existing.clone()));
				continue;
			}

			seen.insert(name.to_lowercase(), name.to_string());

			let outcome = service
				.map_err(ConvertError::from)
				.and_then(|service| self.convert_service(name, &service));

			match outcome {
				Ok(group) => {
					debug!(service = name, "Converted service into a task group");
					job.groups.insert(name.to_string(), group);
				}
				Err(e) => self.fail(name, &e),
			}
		}

		job
	}

	fn fail(&mut self, name: &str, error: &ConvertError) {
		warn!(service = name, "Leaving out the service: {error}");
		self.errors.push(format!("Service '{name}': {error}"));
	}

	fn convert_service(&mut self, name: &str, service: &Service) -> Result<TaskGroup, ConvertError> {
		let mut ctx = ServiceContext {
			name,
			service,
			file: self.file,
			options: self.options,
			warnings: vec![],
		};

		let outcome = ctx.build_group();

		self.warnings.extend(ctx.warnings);

		outcome
	}
}

/// The state for the translation of a single service.
struct ServiceContext<'a> {
	name: &'a str,
	service: &'a Service,
	file: &'a ComposeFile,
	options: &'a ConvertOptions,
	warnings: Vec<String>,
}

impl ServiceContext<'_> {
	fn warn(&mut self, message: impl AsRef<str>) {
		self
			.warnings
			.push(format!("Service '{}': {}", self.name, message.as_ref()));
	}

	fn build_group(&mut self) -> Result<TaskGroup, ConvertError> {
		let service = self.service;

		let mut group = TaskGroup {
			count: service
				.deploy
				.as_ref()
				.and_then(|deploy| deploy.replicas)
				.unwrap_or(1),
			..Default::default()
		};

		let mut task = Task {
			config: self.driver_config()?,
			env: self.env(),
			user: service.user.clone(),
			resources: self.resources()?,
			kill_timeout: service.stop_grace_period.clone(),
			kill_signal: service.stop_signal.clone(),
			..Default::default()
		};

		let port_labels = self.network(&mut group)?;

		if !port_labels.is_empty() {
			task.config.insert(
				"ports".to_string(),
				Value::Array(port_labels.iter().cloned().map(Value::String).collect()),
			);
		}

		self.volumes(&mut group, &mut task)?;
		task.templates = self.templates()?;

		group.services = self.discovery_services(&port_labels);
		group.restart = Some(self.restart_policy());

		self.placement(&mut group);
		self.unsupported_features();

		if let Some(labels) = service
			.deploy
			.as_ref()
			.and_then(|deploy| deploy.labels.as_ref())
		{
			group.meta = labels.to_map();
		}

		group.tasks.insert(self.name.to_string(), task);

		Ok(group)
	}

	fn unsupported_features(&mut self) {
		let service = self.service;

		if service.env_file.is_some() {
			self.warn("`env_file` is not supported, move the variables to `environment`");
		}

		if service
			.links
			.as_ref()
			.is_some_and(|links| !links.is_empty())
		{
			self.warn("`links` are ignored, use service discovery instead");
		}

		if service
			.profiles
			.as_ref()
			.is_some_and(|profiles| !profiles.is_empty())
		{
			self.warn("`profiles` are ignored, the service is always included");
		}

		if let Some(depends_on) = &service.depends_on {
			let names = depends_on.names().join(", ");

			self.warn(format!(
				"`depends_on` ({names}) has no equivalent in Nomad and is only handled through explicitly configured constraints"
			));
		}
	}
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;
	use serde_json::json;

	use super::*;

	fn skip_validation() -> ConvertOptions {
		ConvertOptions {
			skip_validation: true,
			..Default::default()
		}
	}

	#[test]
	fn collisions_keep_the_first_service() {
		let result = convert(
			&json!({
				"services": {
					"api": { "image": "first" },
					"API": { "image": "second" }
				}
			}),
			&skip_validation(),
		);

		assert_eq!(result.job.groups.len(), 1);
		assert_eq!(
			result.job.groups["api"].tasks["api"].image(),
			Some("first")
		);
		assert_eq!(result.errors.len(), 1);
		assert!(result.errors[0].starts_with("Service 'API':"));
	}

	#[test]
	fn aborted_conversions_render_their_errors() {
		let result = convert(&json!("just a string"), &ConvertOptions::default());

		assert!(result.job.is_empty());
		assert!(result.to_hcl(false).starts_with("# ERROR: "));
	}

	#[test]
	fn invalid_yaml_aborts() {
		let result = convert_yaml("services: [unclosed", &ConvertOptions::default());

		assert!(!result.is_success());
		assert!(result.errors[0].starts_with("Invalid YAML"));
	}
}
