use std::{collections::HashMap, sync::LazyLock};

use docker_compose_config::*;
use regex::Regex;
use serde_json::Value;

use crate::units::{is_valid_memory, parse_cores};

static SHORT_PORT_REGEX: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r"^\d+(:\d+)?(/(tcp|udp))?$").expect("Failed to initialize the port regex")
});

static VERSION_3_REGEX: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"^3(\.\d+)*$").expect("Failed to initialize the version regex"));

/// The outcome of validating a compose document.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ValidationResult {
	pub is_valid: bool,
	pub errors: Vec<String>,
	pub warnings: Vec<String>,
}

#[derive(Default)]
struct Diagnostics {
	errors: Vec<String>,
	warnings: Vec<String>,
}

impl Diagnostics {
	fn error(&mut self, message: impl Into<String>) {
		self.errors.push(message.into());
	}

	fn warn(&mut self, message: impl Into<String>) {
		self.warnings.push(message.into());
	}

	fn into_result(self) -> ValidationResult {
		ValidationResult {
			is_valid: self.errors.is_empty(),
			errors: self.errors,
			warnings: self.warnings,
		}
	}
}

/// Checks a parsed compose document for structural and semantic errors.
///
/// Every defect is reported, rather than stopping at the first one.
pub fn validate(document: &Value) -> ValidationResult {
	let mut diagnostics = Diagnostics::default();

	let file = match ComposeFile::from_value(document) {
		Ok(file) => file,
		Err(e) => {
			diagnostics.error(e.to_string());
			return diagnostics.into_result();
		}
	};

	check_version(&file, &mut diagnostics);

	if file.services.is_none() {
		diagnostics.error("No services defined");
		return diagnostics.into_result();
	}

	check_name_collisions(&file, &mut diagnostics);

	for (name, service) in file.service_definitions() {
		match service {
			Ok(service) => check_service(name, &service, &file, &mut diagnostics),
			Err(e) => diagnostics.error(format!("Service '{name}': {e}")),
		}
	}

	check_top_level_configs(&file, &mut diagnostics);

	diagnostics.into_result()
}

fn check_version(file: &ComposeFile, diagnostics: &mut Diagnostics) {
	let Some(version) = &file.version else {
		diagnostics.warn("No version specified, assuming the latest compose specification");
		return;
	};

	let version = version.to_string();

	if version.starts_with("1.") || version.starts_with("2.") {
		diagnostics.error(format!(
			"Compose file version {version} is not supported, only 3.x files can be converted"
		));
	} else if !VERSION_3_REGEX.is_match(&version) {
		diagnostics.error(format!(
			"Unrecognized compose file version `{version}`, expected 3.x"
		));
	}
}

fn check_name_collisions(file: &ComposeFile, diagnostics: &mut Diagnostics) {
	let mut seen: HashMap<String, &str> = HashMap::new();

	for name in file.services.iter().flat_map(|services| services.keys()) {
		if let Some(existing) = seen.get(&name.to_lowercase()) {
			diagnostics.error(format!(
				"Service '{name}': name collides with the service '{existing}' (names are compared case-insensitively)"
			));
		} else {
			seen.insert(name.to_lowercase(), name);
		}
	}
}

fn check_service(name: &str, service: &Service, file: &ComposeFile, diagnostics: &mut Diagnostics) {
	if service.image.is_none() && service.build.is_none() {
		diagnostics.error(format!(
			"Service '{name}': either `image` or `build` must be specified"
		));
	}

	for port in service.ports.iter().flatten() {
		if let Some(port) = port.as_short_str()
			&& !SHORT_PORT_REGEX.is_match(port)
		{
			diagnostics.warn(format!(
				"Service '{name}': port `{port}` uses a format that may not convert cleanly"
			));
		}
	}

	for volume in service.volumes.iter().flatten() {
		if let Some(volume) = volume.as_short_str()
			&& volume.split(':').count() > 3
		{
			diagnostics.warn(format!(
				"Service '{name}': volume `{volume}` uses a complex mount syntax that may not convert cleanly"
			));
		}
	}

	if let Some(depends_on) = &service.depends_on {
		for dependency in depends_on.names() {
			if !file.has_service(dependency) {
				diagnostics.error(format!(
					"Service '{name}': depends on the undefined service '{dependency}'"
				));
			}
		}
	}

	if let Some(networks) = &service.networks {
		for network in networks.names() {
			if network != DEFAULT_NETWORK && !file.has_network(network) {
				diagnostics.warn(format!(
					"Service '{name}': uses the undeclared network '{network}'"
				));
			}
		}
	}

	for config in service.configs.iter().flatten() {
		if !file.has_config(config.source()) {
			diagnostics.error(format!(
				"Service '{name}': references the undeclared config '{}'",
				config.source()
			));
		}
	}

	for secret in service.secrets.iter().flatten() {
		if !file.has_secret(secret.source()) {
			diagnostics.error(format!(
				"Service '{name}': references the undeclared secret '{}'",
				secret.source()
			));
		}
	}

	if service.privileged == Some(true) {
		diagnostics.warn(format!(
			"Service '{name}': privileged mode requires `allow_privileged` in the docker plugin config of the Nomad clients"
		));
	}

	if service.pid.as_deref() == Some("host") {
		diagnostics.warn(format!(
			"Service '{name}': the host PID namespace requires `pid_mode` to be allowed on the Nomad clients"
		));
	}

	if service.network_mode.as_deref() == Some("host") {
		diagnostics.warn(format!(
			"Service '{name}': host networking requires the host network to be available on the Nomad clients"
		));
	}

	if let Some(deploy) = &service.deploy {
		check_resources(name, deploy, diagnostics);
	}
}

fn check_resources(name: &str, deploy: &Deploy, diagnostics: &mut Diagnostics) {
	if let Some(limits) = deploy.limits() {
		if let Some(cpus) = &limits.cpus
			&& parse_cores(cpus).is_none()
		{
			diagnostics.error(format!(
				"Service '{name}': invalid cpu limit `{cpus}`, expected a positive number"
			));
		}

		if let Some(memory) = &limits.memory
			&& !is_valid_memory(memory)
		{
			diagnostics.error(format!(
				"Service '{name}': invalid memory limit `{memory}`, expected digits with an optional unit (b, k, m, g)"
			));
		}
	}

	let requests_devices = [deploy.limits(), deploy.reservations()]
		.into_iter()
		.flatten()
		.any(ResourceSpec::requests_devices);

	if requests_devices {
		diagnostics.warn(format!(
			"Service '{name}': device reservations need a device plugin to be configured manually on the Nomad clients"
		));
	}
}

fn check_top_level_configs(file: &ComposeFile, diagnostics: &mut Diagnostics) {
	for (config_name, config) in file.configs.iter().flatten() {
		let config = config.clone().unwrap_or_default();

		if !config.has_source() {
			diagnostics.error(format!(
				"Config '{config_name}': must specify `file`, `content` or `external`"
			));
		} else if config.is_external() {
			diagnostics.warn(format!(
				"Config '{config_name}': external configs are read from the Consul KV store"
			));
		}
	}

	for (secret_name, secret) in file.secrets.iter().flatten() {
		let secret = secret.clone().unwrap_or_default();

		if !secret.has_source() {
			diagnostics.error(format!(
				"Secret '{secret_name}': must specify `file` or `external`"
			));
		} else if secret.is_external() {
			diagnostics.warn(format!(
				"Secret '{secret_name}': external secrets are read from Vault"
			));
		}
	}
}
