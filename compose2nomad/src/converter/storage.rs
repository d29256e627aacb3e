use docker_compose_config::{MountKind, ServiceVolume, StringOrNum};
use nomad_job_config::{Task, TaskGroup, Volume, VolumeMount, VolumeType};
use serde_json::{Map, Value, json};

use super::ServiceContext;
use crate::{ConvertError, units::size_to_bytes};

const CSI_ACCESS_MODE: &str = "single-node-writer";
const CSI_ATTACHMENT_MODE: &str = "file-system";

/// A `mount` entry of the docker driver for a tmpfs.
fn tmpfs_mount(target: &str, size: Option<u64>) -> Value {
	let mut mount = Map::new();

	mount.insert("type".to_string(), json!("tmpfs"));
	mount.insert("target".to_string(), json!(target));
	mount.insert("readonly".to_string(), json!(false));

	if let Some(size) = size {
		mount.insert("tmpfs_options".to_string(), json!({ "size": size }));
	}

	Value::Object(mount)
}

/// Parses a `tmpfs` entry, such as `/run:size=64m,mode=1777`.
fn parse_tmpfs_entry(entry: &str) -> Result<(String, Option<u64>), ConvertError> {
	let (target, options) = entry.split_once(':').unwrap_or((entry, ""));

	let size = options
		.split(',')
		.find_map(|option| option.strip_prefix("size="))
		.map(|size| size_to_bytes(&StringOrNum::String(size.to_string())))
		.transpose()?;

	Ok((target.to_string(), size))
}

/// Turns a host path into something usable as the name of a Nomad host volume.
fn host_volume_name(path: &str) -> String {
	let name: String = path
		.trim_start_matches(['.', '~', '/'])
		.chars()
		.map(|c| {
			if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
				c
			} else {
				'-'
			}
		})
		.collect();

	if name.is_empty() {
		"root".to_string()
	} else {
		name
	}
}

impl ServiceContext<'_> {
	/// Adds the group volumes with their task mounts, and the tmpfs mounts to the driver config.
	pub(super) fn volumes(&mut self, group: &mut TaskGroup, task: &mut Task) -> Result<(), ConvertError> {
		let service = self.service;
		let mut tmpfs_mounts: Vec<Value> = vec![];

		for (index, volume) in service.volumes.iter().flatten().enumerate() {
			let mount = volume.mount()?;

			let (type_, source) = match mount.kind {
				MountKind::Anonymous => {
					self.warn(format!(
						"the anonymous volume at `{}` is skipped, give it a source to persist its data",
						mount.target
					));
					continue;
				}
				MountKind::Tmpfs => {
					let size = match volume {
						ServiceVolume::Advanced(settings) => settings
							.tmpfs
							.as_ref()
							.and_then(|tmpfs| tmpfs.size.as_ref())
							.map(size_to_bytes)
							.transpose()?,
						ServiceVolume::Simple(_) => None,
					};

					tmpfs_mounts.push(tmpfs_mount(&mount.target, size));
					continue;
				}
				MountKind::Bind => {
					let path = mount.source.clone().unwrap_or_default();
					let name = host_volume_name(&path);

					if mount.is_relative_bind() {
						self.warn(format!(
							"the relative path `{path}` is mapped to the host volume `{name}`, which must be declared on the Nomad clients"
						));
					} else {
						self.warn(format!(
							"the bind mount `{path}` is mapped to the host volume `{name}`, which must be declared on the Nomad clients"
						));
					}

					(VolumeType::Host, name)
				}
				MountKind::Named => {
					let name = mount.source.clone().unwrap_or_default();

					let source = self
						.file
						.volumes
						.as_ref()
						.and_then(|volumes| volumes.get(&name))
						.and_then(|volume| volume.as_ref()?.name.clone())
						.unwrap_or(name);

					(VolumeType::Csi, source)
				}
			};

			let volume_name = format!("volume_{index}");

			let (access_mode, attachment_mode) = match type_ {
				VolumeType::Csi => (
					Some(CSI_ACCESS_MODE.to_string()),
					Some(CSI_ATTACHMENT_MODE.to_string()),
				),
				VolumeType::Host => (None, None),
			};

			group.volumes.insert(
				volume_name.clone(),
				Volume {
					type_,
					source,
					read_only: mount.read_only,
					access_mode,
					attachment_mode,
				},
			);

			task.volume_mounts.insert(
				format!("mount_{index}"),
				VolumeMount {
					volume: volume_name,
					destination: mount.target,
					read_only: mount.read_only,
				},
			);
		}

		for entry in service.tmpfs.iter().flat_map(|tmpfs| tmpfs.to_list()) {
			let (target, size) = parse_tmpfs_entry(&entry)?;

			tmpfs_mounts.push(tmpfs_mount(&target, size));
		}

		if !tmpfs_mounts.is_empty() {
			task
				.config
				.insert("mount".to_string(), Value::Array(tmpfs_mounts));
		}

		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;

	use super::*;

	#[test]
	fn tmpfs_entries() {
		assert_eq!(parse_tmpfs_entry("/run").unwrap(), ("/run".to_string(), None));
		assert_eq!(
			parse_tmpfs_entry("/cache:mode=1777,size=64m").unwrap(),
			("/cache".to_string(), Some(64 * 1024 * 1024))
		);
		assert!(parse_tmpfs_entry("/cache:size=lots").is_err());
	}

	#[test]
	fn host_volume_names() {
		assert_eq!(host_volume_name("/var/lib/data"), "var-lib-data");
		assert_eq!(host_volume_name("./config"), "config");
		assert_eq!(host_volume_name("/"), "root");
	}
}
