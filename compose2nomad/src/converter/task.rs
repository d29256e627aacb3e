use docker_compose_config::{ListOrMap, StringOrList};
use indexmap::IndexMap;
use nomad_job_config::Resources;
use serde_json::{Map, Value, json};

use super::ServiceContext;
use crate::{
	ConvertError,
	units::{MIN_MEMORY_MB, cpu_to_mhz, memory_to_mb, size_to_bytes},
};

fn is_shell_string(command: &str) -> bool {
	command.chars().any(char::is_whitespace)
}

/// Splits a compose command into the executable and its arguments.
///
/// Commands with spaces given as a single string are run through a shell.
fn split_command(command: &StringOrList) -> Option<(String, Vec<String>)> {
	match command {
		StringOrList::String(s) if s.trim().is_empty() => None,
		StringOrList::String(s) if is_shell_string(s) => Some((
			"/bin/sh".to_string(),
			vec!["-c".to_string(), s.clone()],
		)),
		StringOrList::String(s) => Some((s.clone(), vec![])),
		StringOrList::List(list) => {
			let (command, args) = list.split_first()?;

			Some((command.clone(), args.to_vec()))
		}
	}
}

fn entrypoint_list(entrypoint: &StringOrList) -> Vec<String> {
	match entrypoint {
		StringOrList::String(s) if is_shell_string(s) => {
			vec!["/bin/sh".to_string(), "-c".to_string(), s.clone()]
		}
		other => other.to_list(),
	}
}

fn string_map(map: IndexMap<String, String>) -> Value {
	Value::Object(
		map
			.into_iter()
			.map(|(key, value)| (key, Value::String(value)))
			.collect(),
	)
}

impl ServiceContext<'_> {
	fn image(&mut self) -> Result<String, ConvertError> {
		match (&self.service.image, &self.service.build) {
			(Some(image), _) => Ok(image.clone()),
			(None, Some(_)) => {
				self.warn(format!(
					"`build` is not supported, assuming that the image `{}` was built and pushed to a registry",
					self.name
				));

				Ok(self.name.to_string())
			}
			(None, None) => Err(ConvertError::MissingImage),
		}
	}

	/// Builds the config for the docker driver.
	pub(super) fn driver_config(&mut self) -> Result<IndexMap<String, Value>, ConvertError> {
		let service = self.service;
		let mut config = IndexMap::new();

		config.insert("image".to_string(), json!(self.image()?));

		if let Some((command, args)) = service.command.as_ref().and_then(split_command) {
			config.insert("command".to_string(), json!(command));

			if !args.is_empty() {
				config.insert("args".to_string(), json!(args));
			}
		}

		if let Some(entrypoint) = &service.entrypoint
			&& !entrypoint.is_empty()
		{
			config.insert("entrypoint".to_string(), json!(entrypoint_list(entrypoint)));
		}

		if let Some(working_dir) = &service.working_dir {
			config.insert("work_dir".to_string(), json!(working_dir));
		}

		if let Some(hostname) = &service.hostname {
			config.insert("hostname".to_string(), json!(hostname));
		}

		if self.options.preserve_labels {
			let labels = service.labels_map();

			if !labels.is_empty() {
				config.insert("labels".to_string(), string_map(labels));
			}
		}

		if let Some(dns) = &service.dns
			&& !dns.is_empty()
		{
			config.insert("dns_servers".to_string(), json!(dns.to_list()));
		}

		if let Some(dns_search) = &service.dns_search
			&& !dns_search.is_empty()
		{
			config.insert("dns_search_domains".to_string(), json!(dns_search.to_list()));
		}

		if let Some(extra_hosts) = &service.extra_hosts {
			config.insert("extra_hosts".to_string(), json!(extra_hosts.to_list()));
		}

		if let Some(cap_add) = &service.cap_add {
			config.insert("cap_add".to_string(), json!(cap_add));
		}

		if let Some(cap_drop) = &service.cap_drop {
			config.insert("cap_drop".to_string(), json!(cap_drop));
		}

		if let Some(privileged) = service.privileged {
			config.insert("privileged".to_string(), json!(privileged));
		}

		if let Some(read_only) = service.read_only {
			config.insert("readonly_rootfs".to_string(), json!(read_only));
		}

		if let Some(security_opt) = &service.security_opt {
			config.insert("security_opt".to_string(), json!(security_opt));
		}

		if let Some(devices) = &service.devices {
			let devices = devices
				.iter()
				.map(|device| -> Result<Value, ConvertError> {
					let spec = device.spec()?;

					Ok(json!({
						"host_path": spec.host_path,
						"container_path": spec.container_path,
						"cgroup_permissions": spec.cgroup_permissions,
					}))
				})
				.collect::<Result<Vec<_>, _>>()?;

			config.insert("devices".to_string(), Value::Array(devices));
		}

		if let Some(ulimits) = &service.ulimits
			&& !ulimits.is_empty()
		{
			let ulimit: Map<String, Value> = ulimits
				.iter()
				.map(|(name, limit)| (name.clone(), Value::String(limit.to_soft_hard())))
				.collect();

			config.insert("ulimit".to_string(), Value::Object(ulimit));
		}

		if let Some(sysctls) = &service.sysctls
			&& !sysctls.is_empty()
		{
			config.insert("sysctl".to_string(), string_map(sysctls.to_map()));
		}

		if let Some(shm_size) = &service.shm_size {
			config.insert("shm_size".to_string(), json!(size_to_bytes(shm_size)?));
		}

		if let Some(pid) = &service.pid {
			config.insert("pid_mode".to_string(), json!(pid));
		}

		if let Some(ipc) = &service.ipc {
			config.insert("ipc_mode".to_string(), json!(ipc));
		}

		if let Some(init) = service.init {
			config.insert("init".to_string(), json!(init));
		}

		if let Some(tty) = service.tty {
			config.insert("tty".to_string(), json!(tty));
		}

		if let Some(stdin_open) = service.stdin_open {
			config.insert("interactive".to_string(), json!(stdin_open));
		}

		if let Some(network_mode) = &service.network_mode {
			if network_mode.starts_with("service:") || network_mode.starts_with("container:") {
				self.warn(format!(
					"network_mode `{network_mode}` is not supported, put the tasks in the same group to share a network namespace"
				));
			} else {
				config.insert("network_mode".to_string(), json!(network_mode));
			}
		}

		if let Some(logging) = &service.logging {
			let mut block = Map::new();

			if let Some(driver) = &logging.driver {
				block.insert("type".to_string(), json!(driver));
			}

			if let Some(options) = &logging.options
				&& !options.is_empty()
			{
				let options = ListOrMap::Map(options.clone()).to_map();

				block.insert("config".to_string(), string_map(options));
			}

			if !block.is_empty() {
				config.insert("logging".to_string(), Value::Object(block));
			}
		}

		Ok(config)
	}

	pub(super) fn env(&self) -> IndexMap<String, String> {
		self
			.service
			.environment
			.as_ref()
			.map(ListOrMap::to_map)
			.unwrap_or_default()
	}

	/// Resolves cpu and memory, with limits first, raised to reservations when those are higher.
	pub(super) fn resources(&mut self) -> Result<Resources, ConvertError> {
		let service = self.service;
		let defaults = self.options.resource_defaults;

		let limits = service.deploy.as_ref().and_then(|deploy| deploy.limits());
		let reservations = service
			.deploy
			.as_ref()
			.and_then(|deploy| deploy.reservations());

		let cpu_limit = limits.and_then(|spec| spec.cpus.as_ref());
		let cpu_reservation = reservations.and_then(|spec| spec.cpus.as_ref());
		let memory_limit = limits.and_then(|spec| spec.memory.as_ref());
		let memory_reservation = reservations.and_then(|spec| spec.memory.as_ref());

		let mut cpu = defaults.cpu;

		if cpu_limit.is_none() && cpu_reservation.is_none() {
			if let Some(cpus) = &service.cpus {
				cpu = cpu_to_mhz(cpus)?;
			}
		} else {
			if let Some(limit) = cpu_limit {
				cpu = cpu_to_mhz(limit)?;
			}

			if let Some(reservation) = cpu_reservation {
				cpu = cpu.max(cpu_to_mhz(reservation)?);
			}
		}

		let mut memory = defaults.memory;

		if memory_limit.is_none() && memory_reservation.is_none() {
			if let Some(mem_limit) = &service.mem_limit {
				memory = memory_to_mb(mem_limit)?;
			}

			if let Some(mem_reservation) = &service.mem_reservation {
				memory = memory.max(memory_to_mb(mem_reservation)?);
			}
		} else {
			if let Some(limit) = memory_limit {
				memory = memory_to_mb(limit)?;
			}

			if let Some(reservation) = memory_reservation {
				memory = memory.max(memory_to_mb(reservation)?);
			}
		}

		if memory < MIN_MEMORY_MB {
			self.warn(format!(
				"memory is set to {memory}MB, below the minimum of {MIN_MEMORY_MB}MB accepted by Nomad"
			));
		}

		Ok(Resources { cpu, memory })
	}
}

#[cfg(test)]
mod tests {
	use docker_compose_config::{ComposeFile, Service};
	use indoc::indoc;
	use pretty_assertions::assert_eq;

	use super::*;
	use crate::ConvertOptions;

	fn resources_of(yaml: &str) -> (Resources, Vec<String>) {
		let service: Service = serde_yaml_ng::from_str(yaml).unwrap();
		let file = ComposeFile::default();
		let options = ConvertOptions::default();

		let mut ctx = ServiceContext {
			name: "api",
			service: &service,
			file: &file,
			options: &options,
			warnings: vec![],
		};

		let resources = ctx.resources().unwrap();

		(resources, ctx.warnings)
	}

	#[test]
	fn reservations_raise_the_limits() {
		let (higher_reservations, _) = resources_of(indoc! {"
			deploy:
			  resources:
			    limits:
			      cpus: '0.5'
			      memory: 256M
			    reservations:
			      cpus: '1.5'
			      memory: 1G
		"});

		assert_eq!(higher_reservations, Resources { cpu: 1500, memory: 1024 });

		let (lower_reservations, _) = resources_of(indoc! {"
			deploy:
			  resources:
			    limits:
			      cpus: '2'
			      memory: 2G
			    reservations:
			      cpus: '0.25'
			      memory: 64M
		"});

		assert_eq!(lower_reservations, Resources { cpu: 2000, memory: 2048 });

		// Reservations below the defaults keep them
		let (reservations_only, _) = resources_of(indoc! {"
			deploy:
			  resources:
			    reservations:
			      cpus: '0.05'
			      memory: 64M
		"});

		assert_eq!(reservations_only, Resources { cpu: 100, memory: 128 });
	}

	#[test]
	fn legacy_resource_keys() {
		let (resources, warnings) = resources_of(indoc! {"
			cpus: 0.75
			mem_limit: 512m
			mem_reservation: 768m
		"});

		assert_eq!(resources, Resources { cpu: 750, memory: 768 });
		assert!(warnings.is_empty());

		let (tiny, warnings) = resources_of("mem_limit: 4m");

		assert_eq!(tiny.memory, 4);
		assert_eq!(warnings.len(), 1);
	}

	#[test]
	fn commands() {
		let list = StringOrList::List(vec![
			"npm".to_string(),
			"run".to_string(),
			"start".to_string(),
		]);

		assert_eq!(
			split_command(&list),
			Some((
				"npm".to_string(),
				vec!["run".to_string(), "start".to_string()]
			))
		);

		assert_eq!(
			split_command(&StringOrList::String("redis-server".to_string())),
			Some(("redis-server".to_string(), vec![]))
		);

		assert_eq!(
			split_command(&StringOrList::String("echo hi && sleep 5".to_string())),
			Some((
				"/bin/sh".to_string(),
				vec!["-c".to_string(), "echo hi && sleep 5".to_string()]
			))
		);

		assert_eq!(split_command(&StringOrList::List(vec![])), None);
	}
}
