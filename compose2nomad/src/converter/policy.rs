use docker_compose_config::SingleValue;
use indexmap::IndexMap;
use nomad_job_config::{
	Affinity, Constraint, Job, Operator, RestartMode, RestartPolicy, Spread, TaskGroup,
};
use serde::Deserialize;
use serde_json::Value;

use super::{Converter, NOMAD_EXTENSION, ServiceContext};

/// Job-level settings that have no counterpart in compose.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct NomadExtension {
	constraints: Vec<ExtensionConstraint>,
	affinities: Vec<Affinity>,
	spreads: Vec<Spread>,
	meta: IndexMap<String, SingleValue>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ExtensionConstraint {
	/// Same syntax as the placement constraints, like `node.labels.zone == east`.
	Expression(String),
	Block(Constraint),
}

// Tried in this order, so that `==` is not read as `=`
const SYMBOLIC_OPERATORS: &[&str] = &["==", "!=", ">=", "<=", "=", ">", "<"];

/// Maps the attributes of swarm nodes to their Nomad equivalents.
fn rewrite_attribute(attribute: &str) -> String {
	if let Some(label) = attribute.strip_prefix("node.labels.") {
		return format!("${{meta.{label}}}");
	}

	match attribute {
		"node.hostname" => "${attr.unique.hostname}".to_string(),
		"node.platform.os" => "${attr.kernel.name}".to_string(),
		"node.platform.arch" => "${attr.cpu.arch}".to_string(),
		other => other.to_string(),
	}
}

fn split_symbolic(expression: &str) -> Option<(&str, &str, &str)> {
	expression.char_indices().find_map(|(index, _)| {
		let rest = &expression[index..];

		SYMBOLIC_OPERATORS
			.iter()
			.find(|op| rest.starts_with(**op))
			.map(|op| {
				(
					expression[..index].trim(),
					*op,
					rest[op.len()..].trim(),
				)
			})
	})
}

/// Parses `attribute operator value`, or a bare attribute that must be `true`.
///
/// Also returns the operator if it was not recognized, in which case `=` is used.
fn parse_constraint(expression: &str) -> (Constraint, Option<String>) {
	let tokens: Vec<&str> = expression.split_whitespace().collect();

	let build = |attribute: &str, operator: Operator, value: Option<String>| Constraint {
		attribute: Some(rewrite_attribute(attribute)),
		operator,
		value,
	};

	match tokens.as_slice() {
		[attribute, operator, value @ ..] if !value.is_empty() => {
			let value = Some(value.join(" "));

			match operator.parse::<Operator>() {
				Ok(operator) => (build(attribute, operator, value), None),
				Err(_) => (
					build(attribute, Operator::Eq, value),
					Some((*operator).to_string()),
				),
			}
		}
		[attribute, operator] if operator.parse::<Operator>().is_ok_and(Operator::is_unary) => (
			build(attribute, operator.parse().unwrap_or_default(), None),
			None,
		),
		_ => match split_symbolic(expression) {
			Some((attribute, operator, value)) if !attribute.is_empty() => (
				build(
					attribute,
					operator.parse().unwrap_or_default(),
					Some(value.to_string()),
				),
				None,
			),
			_ => match tokens.as_slice() {
				[attribute] => (
					build(attribute, Operator::Eq, Some("true".to_string())),
					None,
				),
				[attribute, value] => (
					build(attribute, Operator::Eq, Some((*value).to_string())),
					Some(String::new()),
				),
				_ => (
					build(expression.trim(), Operator::Eq, Some("true".to_string())),
					None,
				),
			},
		},
	}
}

fn unknown_operator_message(expression: &str, operator: &str) -> String {
	if operator.is_empty() {
		format!("the constraint `{expression}` has no operator, `=` is used")
	} else {
		format!("the constraint `{expression}` uses the unknown operator `{operator}`, `=` is used")
	}
}

/// Reads `spread` entries from swarm placement preferences.
fn preference_spread(preference: &Value) -> Option<Spread> {
	let attribute = preference.get("spread")?.as_str()?;

	Some(Spread {
		attribute: rewrite_attribute(attribute),
		weight: None,
		targets: vec![],
	})
}

impl ServiceContext<'_> {
	pub(super) fn restart_policy(&mut self) -> RestartPolicy {
		let service = self.service;
		let mut policy = RestartPolicy::default();

		if let Some(restart) = service.restart.as_deref() {
			match restart {
				"always" => policy.attempts = 0,
				"on-failure" => policy.mode = RestartMode::Fail,
				"no" | "unless-stopped" => {
					policy.attempts = 0;
					policy.mode = RestartMode::Fail;
				}
				other => match other
					.strip_prefix("on-failure:")
					.and_then(|attempts| attempts.trim().parse::<u32>().ok())
				{
					Some(attempts) => {
						policy.attempts = attempts;
						policy.mode = RestartMode::Fail;
					}
					None => self.warn(format!(
						"unknown restart policy `{other}`, the default policy is used"
					)),
				},
			}
		}

		let Some(deploy_policy) = service
			.deploy
			.as_ref()
			.and_then(|deploy| deploy.restart_policy.as_ref())
		else {
			return policy;
		};

		if let Some(max_attempts) = deploy_policy.max_attempts {
			policy.attempts = max_attempts;
		}

		if let Some(delay) = &deploy_policy.delay {
			policy.delay.clone_from(delay);
		}

		if let Some(window) = &deploy_policy.window {
			policy.interval.clone_from(window);
		}

		match deploy_policy.condition.as_deref() {
			None | Some("any") => {}
			Some("none") => {
				policy.attempts = 0;
				policy.mode = RestartMode::Fail;
			}
			Some("on-failure") => policy.mode = RestartMode::Fail,
			Some(other) => self.warn(format!(
				"unknown restart condition `{other}`, expected `none`, `on-failure` or `any`"
			)),
		}

		policy
	}

	/// Adds the constraints and spreads from `deploy.placement`.
	pub(super) fn placement(&mut self, group: &mut TaskGroup) {
		let service = self.service;

		let Some(placement) = service
			.deploy
			.as_ref()
			.and_then(|deploy| deploy.placement.as_ref())
		else {
			return;
		};

		for expression in placement.constraints.iter().flatten() {
			let (constraint, unknown_operator) = parse_constraint(expression);

			if let Some(operator) = unknown_operator {
				self.warn(unknown_operator_message(expression, &operator));
			}

			group.constraints.push(constraint);
		}

		for preference in placement.preferences.iter().flatten() {
			match preference_spread(preference) {
				Some(spread) => group.spreads.push(spread),
				None => self.warn(format!(
					"the placement preference `{preference}` is not supported, only `spread` is"
				)),
			}
		}

		match placement.max_replicas_per_node {
			Some(1) => group.constraints.push(Constraint {
				attribute: None,
				operator: Operator::DistinctHosts,
				value: Some("true".to_string()),
			}),
			Some(max) => self.warn(format!(
				"`max_replicas_per_node: {max}` is not supported, only a value of 1 can be mapped to `distinct_hosts`"
			)),
			None => {}
		}
	}
}

impl Converter<'_> {
	/// Applies the job-level settings of the `x-nomad` extension.
	pub(super) fn apply_extension(&mut self, job: &mut Job) {
		let extension = match self.file.extension::<NomadExtension>(NOMAD_EXTENSION) {
			None => return,
			Some(Ok(extension)) => extension,
			Some(Err(e)) => {
				self.warnings.push(format!("{e}, the extension is ignored"));
				return;
			}
		};

		for constraint in extension.constraints {
			match constraint {
				ExtensionConstraint::Block(constraint) => job.constraints.push(constraint),
				ExtensionConstraint::Expression(expression) => {
					let (constraint, unknown_operator) = parse_constraint(&expression);

					if let Some(operator) = unknown_operator {
						self.warnings.push(format!(
							"`{NOMAD_EXTENSION}`: {}",
							unknown_operator_message(&expression, &operator)
						));
					}

					job.constraints.push(constraint);
				}
			}
		}

		job.affinities.extend(extension.affinities);
		job.spreads.extend(extension.spreads);
		job.meta.extend(
			extension
				.meta
				.into_iter()
				.map(|(key, value)| (key, value.to_string())),
		);
	}
}

#[cfg(test)]
mod tests {
	use docker_compose_config::{ComposeFile, Service};
	use indoc::indoc;
	use pretty_assertions::assert_eq;

	use super::*;
	use crate::ConvertOptions;

	fn constraint(attribute: &str, operator: Operator, value: &str) -> Constraint {
		Constraint::new(attribute, operator, value)
	}

	fn restart_policy_of(yaml: &str) -> (RestartPolicy, Vec<String>) {
		let service: Service = serde_yaml_ng::from_str(yaml).unwrap();
		let file = ComposeFile::default();
		let options = ConvertOptions::default();

		let mut ctx = ServiceContext {
			name: "web",
			service: &service,
			file: &file,
			options: &options,
			warnings: vec![],
		};

		let policy = ctx.restart_policy();

		(policy, ctx.warnings)
	}

	fn policy(attempts: u32, delay: &str, interval: &str, mode: RestartMode) -> RestartPolicy {
		RestartPolicy {
			attempts,
			delay: delay.to_string(),
			interval: interval.to_string(),
			mode,
		}
	}

	#[test]
	fn restart_values() {
		let cases = [
			("image: nginx", policy(3, "15s", "5m", RestartMode::Delay)),
			("restart: always", policy(0, "15s", "5m", RestartMode::Delay)),
			("restart: \"no\"", policy(0, "15s", "5m", RestartMode::Fail)),
			("restart: unless-stopped", policy(0, "15s", "5m", RestartMode::Fail)),
			("restart: on-failure", policy(3, "15s", "5m", RestartMode::Fail)),
			("restart: on-failure:5", policy(5, "15s", "5m", RestartMode::Fail)),
		];

		for (yaml, expected) in cases {
			let (policy, warnings) = restart_policy_of(yaml);

			assert_eq!(policy, expected, "{yaml}");
			assert!(warnings.is_empty());
		}
	}

	#[test]
	fn unknown_restart_values_keep_the_default() {
		let (policy, warnings) = restart_policy_of("restart: sometimes");

		assert_eq!(policy, RestartPolicy::default());
		assert_eq!(warnings.len(), 1);
		assert!(warnings[0].contains("`sometimes`"));
	}

	#[test]
	fn deploy_restart_policy() {
		let (overridden, _) = restart_policy_of(indoc! {"
			restart: always
			deploy:
			  restart_policy:
			    max_attempts: 7
			    delay: 30s
			    window: 2m
		"});

		assert_eq!(overridden, policy(7, "30s", "2m", RestartMode::Delay));

		let (on_failure, _) = restart_policy_of(indoc! {"
			deploy:
			  restart_policy:
			    condition: on-failure
			    max_attempts: 2
		"});

		assert_eq!(on_failure, policy(2, "15s", "5m", RestartMode::Fail));

		// `none` wins over max_attempts
		let (never, warnings) = restart_policy_of(indoc! {"
			deploy:
			  restart_policy:
			    condition: none
			    max_attempts: 4
			    delay: 1s
		"});

		assert_eq!(never, policy(0, "1s", "5m", RestartMode::Fail));
		assert!(warnings.is_empty());
	}

	#[test]
	fn constraint_expressions() {
		assert_eq!(
			parse_constraint("node.role == manager"),
			(constraint("node.role", Operator::Eq, "manager"), None)
		);

		assert_eq!(
			parse_constraint("node.labels.zone!=us-east-1"),
			(constraint("${meta.zone}", Operator::NotEq, "us-east-1"), None)
		);

		assert_eq!(
			parse_constraint("node.hostname regexp ^web-[0-9]+$"),
			(
				constraint("${attr.unique.hostname}", Operator::Regexp, "^web-[0-9]+$"),
				None
			)
		);

		assert_eq!(
			parse_constraint("node.labels.ssd"),
			(constraint("${meta.ssd}", Operator::Eq, "true"), None)
		);
	}

	#[test]
	fn unknown_operators_fall_back_to_equality() {
		let (parsed, unknown) = parse_constraint("node.platform.os ~= linux");

		assert_eq!(parsed, constraint("${attr.kernel.name}", Operator::Eq, "linux"));
		assert_eq!(unknown.as_deref(), Some("~="));
	}

	#[test]
	fn unary_operators() {
		let (parsed, unknown) = parse_constraint("${meta.gpu} is_set");

		assert_eq!(parsed.operator, Operator::IsSet);
		assert_eq!(parsed.value, None);
		assert_eq!(unknown, None);
	}

	#[test]
	fn preferences() {
		let spread = preference_spread(&serde_json::json!({ "spread": "node.labels.zone" })).unwrap();

		assert_eq!(spread.attribute, "${meta.zone}");
		assert!(preference_spread(&serde_json::json!({ "pack": "x" })).is_none());
	}
}
