use docker_compose_config::{Healthcheck, StringOrList, parse_expose};
use nomad_job_config::{Check, CheckType, Network, Port, Service, TaskGroup};

use super::{COMPOSE_TAG, ServiceContext};
use crate::ConvertError;

const DEFAULT_CHECK_INTERVAL: &str = "30s";
const DEFAULT_CHECK_TIMEOUT: &str = "5s";

/// Converts a compose healthcheck into a script check, unless it is disabled.
fn convert_healthcheck(healthcheck: &Healthcheck, name: &str, task: &str) -> Option<Check> {
	if healthcheck.disable == Some(true) {
		return None;
	}

	let (command, args) = match healthcheck.test.as_ref()? {
		StringOrList::String(script) => (
			"/bin/sh".to_string(),
			vec!["-c".to_string(), script.clone()],
		),
		StringOrList::List(test) => match test.split_first()? {
			(sentinel, _) if sentinel == "NONE" => return None,
			(sentinel, rest) if sentinel == "CMD" => {
				let (command, args) = rest.split_first()?;

				(command.clone(), args.to_vec())
			}
			(sentinel, rest) if sentinel == "CMD-SHELL" => (
				"/bin/sh".to_string(),
				vec!["-c".to_string(), rest.join(" ")],
			),
			(command, args) => (command.clone(), args.to_vec()),
		},
	};

	Some(Check {
		type_: CheckType::Script,
		name: format!("{name}-health"),
		command: Some(command),
		args,
		interval: healthcheck
			.interval
			.clone()
			.unwrap_or_else(|| DEFAULT_CHECK_INTERVAL.to_string()),
		timeout: healthcheck
			.timeout
			.clone()
			.unwrap_or_else(|| DEFAULT_CHECK_TIMEOUT.to_string()),
		task: Some(task.to_string()),
	})
}

impl ServiceContext<'_> {
	/// Adds the network block for the declared ports, returning the labels of the ports.
	pub(super) fn network(&mut self, group: &mut TaskGroup) -> Result<Vec<String>, ConvertError> {
		let service = self.service;

		if service.declared_port_count() == 0 {
			return Ok(vec![]);
		}

		let mut network = Network {
			mode: match service.network_mode.as_deref() {
				Some(mode @ ("host" | "none")) => mode.to_string(),
				_ => self.options.network_mode.clone(),
			},
			..Default::default()
		};

		for (index, port) in service.ports.iter().flatten().enumerate() {
			let mapping = port.mapping()?;

			if mapping.host_ip.is_some() {
				self.warn(format!(
					"the host ip of the port {} is ignored, use `host_network` to bind to specific interfaces",
					mapping.target
				));
			}

			network.ports.insert(
				format!("port_{index}"),
				Port {
					static_: mapping.published,
					to: Some(mapping.target),
					host_network: None,
				},
			);
		}

		for (index, expose) in service.expose.iter().flatten().enumerate() {
			let (target, _) = parse_expose(expose)?;

			network.ports.insert(
				format!("expose_{index}"),
				Port {
					static_: None,
					to: Some(target),
					host_network: None,
				},
			);
		}

		let labels = network.ports.keys().cloned().collect();

		group.network = Some(network);

		Ok(labels)
	}

	/// One registration per port, or a single one without a port.
	pub(super) fn discovery_services(&self, port_labels: &[String]) -> Vec<Service> {
		let checks: Vec<Check> = self
			.service
			.healthcheck
			.as_ref()
			.and_then(|healthcheck| convert_healthcheck(healthcheck, self.name, self.name))
			.into_iter()
			.collect();

		if port_labels.is_empty() {
			return vec![Service {
				name: self.name.to_string(),
				port: None,
				tags: vec![COMPOSE_TAG.to_string()],
				checks,
			}];
		}

		port_labels
			.iter()
			.enumerate()
			.map(|(index, label)| Service {
				name: format!("{}-{index}", self.name),
				port: Some(label.clone()),
				tags: vec![COMPOSE_TAG.to_string()],
				checks: checks.clone(),
			})
			.collect()
	}
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;
	use serde_json::json;

	use super::*;

	fn healthcheck(value: serde_json::Value) -> Healthcheck {
		serde_json::from_value(value).unwrap()
	}

	#[test]
	fn cmd_checks_run_the_command() {
		let check = convert_healthcheck(
			&healthcheck(json!({
				"test": ["CMD", "curl", "-f", "http://localhost"],
				"interval": "10s"
			})),
			"web",
			"web",
		)
		.unwrap();

		assert_eq!(check.command.as_deref(), Some("curl"));
		assert_eq!(check.args, vec!["-f", "http://localhost"]);
		assert_eq!(check.interval, "10s");
		assert_eq!(check.timeout, "5s");
		assert_eq!(check.task.as_deref(), Some("web"));
	}

	#[test]
	fn shell_checks_are_wrapped() {
		let from_list = convert_healthcheck(
			&healthcheck(json!({ "test": ["CMD-SHELL", "pg_isready", "-U", "postgres"] })),
			"db",
			"db",
		)
		.unwrap();

		let from_string = convert_healthcheck(
			&healthcheck(json!({ "test": "pg_isready -U postgres" })),
			"db",
			"db",
		)
		.unwrap();

		assert_eq!(from_list.command.as_deref(), Some("/bin/sh"));
		assert_eq!(from_list.args, vec!["-c", "pg_isready -U postgres"]);
		assert_eq!(from_list.args, from_string.args);
		assert_eq!(from_list.interval, "30s");
	}

	#[test]
	fn disabled_checks() {
		assert!(
			convert_healthcheck(
				&healthcheck(json!({ "test": ["CMD", "true"], "disable": true })),
				"a",
				"a"
			)
			.is_none()
		);
		assert!(convert_healthcheck(&healthcheck(json!({ "test": ["NONE"] })), "a", "a").is_none());
		assert!(convert_healthcheck(&healthcheck(json!({ "interval": "5s" })), "a", "a").is_none());
	}
}
