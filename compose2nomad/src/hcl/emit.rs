use indexmap::IndexMap;
use nomad_job_config::*;
use serde_json::{Map, Value};

use super::{Block, Expr, HclOptions};

/// Driver config keys that the docker driver expects as blocks rather than maps.
const CONFIG_BLOCK_KEYS: &[&str] = &["logging", "mount"];

pub(crate) trait AsHcl {
	fn as_hcl(&self) -> Block;
}

fn json_to_expr(value: &Value) -> Option<Expr> {
	match value {
		Value::Null => None,
		Value::Bool(b) => Some(Expr::Bool(*b)),
		Value::Number(n) => {
			if let Some(i) = n.as_i64() {
				Some(Expr::Int(i))
			} else if let Some(f) = n.as_f64() {
				Some(Expr::Float(f))
			} else {
				Some(Expr::String(n.to_string()))
			}
		}
		Value::String(s) => Some(Expr::String(s.clone())),
		Value::Array(items) => Some(Expr::List(items.iter().filter_map(json_to_expr).collect())),
		Value::Object(map) => Some(Expr::Map(
			map
				.iter()
				.filter_map(|(key, value)| Some((key.clone(), json_to_expr(value)?)))
				.collect(),
		)),
	}
}

fn object_block(kind: &str, map: &Map<String, Value>) -> Block {
	let mut block = Block::new(kind);

	for (key, value) in map {
		if value.is_object() {
			push_nested(&mut block, key, value);
		} else if let Some(expr) = json_to_expr(value) {
			block.attr(key, expr);
		}
	}

	block
}

/// Adds objects as blocks, and arrays of objects as repeated blocks.
fn push_nested(parent: &mut Block, key: &str, value: &Value) {
	match value {
		Value::Object(map) => parent.block(object_block(key, map)),
		Value::Array(items) if items.iter().all(Value::is_object) => {
			for item in items.iter().filter_map(Value::as_object) {
				parent.block(object_block(key, item));
			}
		}
		other => {
			if let Some(expr) = json_to_expr(other) {
				parent.attr(key, expr);
			}
		}
	}
}

fn config_block(config: &IndexMap<String, Value>) -> Block {
	let mut block = Block::new("config");

	for (key, value) in config {
		if CONFIG_BLOCK_KEYS.contains(&key.as_str()) {
			push_nested(&mut block, key, value);
		} else if let Some(expr) = json_to_expr(value) {
			block.attr(key, expr);
		}
	}

	block
}

impl AsHcl for UpdateStrategy {
	fn as_hcl(&self) -> Block {
		let mut block = Block::new("update");

		add_string!(self, block => stagger);
		add_value!(self, block => max_parallel);

		block
	}
}

impl AsHcl for Constraint {
	fn as_hcl(&self) -> Block {
		let mut block = Block::new("constraint");

		if let Some(attribute) = &self.attribute {
			block.attr("attribute", Expr::Interpolated(attribute.clone()));
		}

		add_display!(self, block => operator);
		add_optional_string!(self, block => value);

		block
	}
}

impl AsHcl for Affinity {
	fn as_hcl(&self) -> Block {
		let mut block = Block::new("affinity");

		add_interpolated!(self, block => attribute);
		add_display!(self, block => operator);
		add_string!(self, block => value);
		add_value!(self, block => weight);

		block
	}
}

impl AsHcl for SpreadTarget {
	fn as_hcl(&self) -> Block {
		let mut block = Block::labeled("target", &self.value);

		add_value!(self, block => percent);

		block
	}
}

impl AsHcl for Spread {
	fn as_hcl(&self) -> Block {
		let mut block = Block::new("spread");

		add_interpolated!(self, block => attribute);
		add_optional_value!(self, block => weight);
		add_blocks!(self, block => targets);

		block
	}
}

impl AsHcl for Network {
	fn as_hcl(&self) -> Block {
		let mut block = Block::new("network");

		add_string!(self, block => mode);

		for (label, port) in &self.ports {
			let mut port_block = Block::labeled("port", label);

			add_optional_value!(port, port_block => static_, to);
			add_optional_string!(port, port_block => host_network);

			block.block(port_block);
		}

		block
	}
}

impl AsHcl for Check {
	fn as_hcl(&self) -> Block {
		let mut block = Block::new("check");

		add_display!(self, block => type_);
		add_string!(self, block => name);
		add_optional_string!(self, block => command);
		add_string_list!(self, block => args);
		add_string!(self, block => interval, timeout);
		add_optional_string!(self, block => task);

		block
	}
}

impl AsHcl for Service {
	fn as_hcl(&self) -> Block {
		let mut block = Block::new("service");

		add_string!(self, block => name);
		add_optional_string!(self, block => port);
		add_string_list!(self, block => tags);
		add_blocks!(self, block => checks);

		block
	}
}

impl AsHcl for RestartPolicy {
	fn as_hcl(&self) -> Block {
		let mut block = Block::new("restart");

		add_value!(self, block => attempts);
		add_string!(self, block => delay, interval);
		add_display!(self, block => mode);

		block
	}
}

impl AsHcl for Resources {
	fn as_hcl(&self) -> Block {
		let mut block = Block::new("resources");

		add_value!(self, block => cpu, memory);

		block
	}
}

impl AsHcl for Template {
	fn as_hcl(&self) -> Block {
		let mut block = Block::new("template");

		add_string!(self, block => data, destination, change_mode);

		block
	}
}

impl AsHcl for VolumeMount {
	fn as_hcl(&self) -> Block {
		let mut block = Block::new("volume_mount");

		add_string!(self, block => volume, destination);
		add_value!(self, block => read_only);

		block
	}
}

fn volume_block(name: &str, volume: &Volume) -> Block {
	let mut block = Block::labeled("volume", name);

	add_display!(volume, block => type_);
	add_string!(volume, block => source);
	add_value!(volume, block => read_only);
	add_optional_string!(volume, block => access_mode, attachment_mode);

	block
}

fn task_block(name: &str, task: &Task) -> Block {
	let mut block = Block::labeled("task", name);

	add_string!(task, block => driver);
	add_optional_string!(task, block => user, kill_timeout, kill_signal);

	block.block(config_block(&task.config));

	add_map_block!(task, block => env);

	block.block(task.resources.as_hcl());

	add_blocks!(task, block => templates);

	for mount in task.volume_mounts.values() {
		block.block(mount.as_hcl());
	}

	add_blocks!(task, block => constraints, services);
	add_map_block!(task, block => meta);

	block
}

fn group_block(name: &str, group: &TaskGroup) -> Block {
	let mut block = Block::labeled("group", name);

	add_value!(group, block => count);

	if let Some(network) = &group.network {
		block.block(network.as_hcl());
	}

	for (volume_name, volume) in &group.volumes {
		block.block(volume_block(volume_name, volume));
	}

	add_blocks!(group, block => services);

	if let Some(restart) = &group.restart {
		block.block(restart.as_hcl());
	}

	add_blocks!(group, block => constraints, spreads);
	add_map_block!(group, block => meta);

	for (task_name, task) in &group.tasks {
		block.block(task_block(task_name, task));
	}

	block
}

pub(super) fn job_block(job: &Job, options: &HclOptions) -> Block {
	let mut block = Block::labeled("job", &job.id);

	if job.name != job.id {
		add_string!(job, block => name);
	}

	add_string!(job, block => region);
	block.attr("datacenters", &job.datacenters);
	add_display!(job, block => type_);
	add_value!(job, block => priority);
	add_string!(job, block => namespace);

	add_map_block!(job, block => meta);
	add_blocks!(job, block => constraints, affinities, spreads);

	if let Some(update) = &job.update {
		block.block(update.as_hcl());
	}

	for (group_name, group) in &job.groups {
		if options.include_comments {
			block.comment(format!("Compose service: {group_name}"));
		}

		block.block(group_block(group_name, group));
	}

	block
}

#[cfg(test)]
mod tests {
	use indoc::indoc;
	use pretty_assertions::assert_eq;
	use serde_json::json;

	use super::*;

	#[test]
	fn logging_and_mounts_are_blocks() {
		let mut config = IndexMap::new();
		config.insert("image".to_string(), json!("nginx"));
		config.insert(
			"logging".to_string(),
			json!({ "type": "json-file", "config": { "max-size": "10m" } }),
		);
		config.insert(
			"mount".to_string(),
			json!([{ "type": "tmpfs", "target": "/run", "readonly": false, "tmpfs_options": { "size": 1024 } }]),
		);
		config.insert("sysctl".to_string(), json!({ "net.core.somaxconn": "1024" }));

		assert_eq!(
			config_block(&config).to_string(),
			indoc! {r#"
				config {
				  image = "nginx"

				  logging {
				    type = "json-file"

				    config {
				      max-size = "10m"
				    }
				  }

				  mount {
				    type     = "tmpfs"
				    target   = "/run"
				    readonly = false

				    tmpfs_options {
				      size = 1024
				    }
				  }

				  sysctl = {
				    "net.core.somaxconn" = "1024"
				  }
				}
			"#}
		);
	}

	#[test]
	fn constraints_without_attributes() {
		let constraint = Constraint {
			attribute: None,
			operator: Operator::DistinctHosts,
			value: Some("true".to_string()),
		};

		assert_eq!(
			constraint.as_hcl().to_string(),
			indoc! {r#"
				constraint {
				  operator = "distinct_hosts"
				  value    = "true"
				}
			"#}
		);
	}

	#[test]
	fn placement_attributes_keep_their_interpolation() {
		let constraint = Constraint::new("${attr.kernel.name}", Operator::Eq, "${linux}");

		assert_eq!(
			constraint.as_hcl().to_string(),
			indoc! {r#"
				constraint {
				  attribute = "${attr.kernel.name}"
				  operator  = "="
				  value     = "$${linux}"
				}
			"#}
		);

		let spread = Spread {
			attribute: "${node.datacenter}".to_string(),
			weight: None,
			targets: Vec::new(),
		};

		assert!(
			spread
				.as_hcl()
				.to_string()
				.contains("attribute = \"${node.datacenter}\"")
		);
	}
}
