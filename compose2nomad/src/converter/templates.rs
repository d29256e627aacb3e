use docker_compose_config::{ServiceConfigOrSecret, TopLevelConfig};
use nomad_job_config::Template;

use super::ServiceContext;
use crate::ConvertError;

const CHANGE_MODE: &str = "restart";

/// Where a config or secret is rendered, relative to the given task directory.
fn destination(dir: &str, reference: &ServiceConfigOrSecret) -> String {
	let target = reference
		.target()
		.unwrap_or_else(|| reference.source())
		.trim_start_matches('/');

	format!("{dir}/{target}")
}

fn secret_body(source: &str) -> String {
	format!("{{{{ with secret \"secret/data/{source}\" }}}}{{{{ .Data.data.value }}}}{{{{ end }}}}")
}

impl ServiceContext<'_> {
	fn config_body(&mut self, name: &str, config: &TopLevelConfig) -> Result<String, ConvertError> {
		if let Some(content) = &config.content {
			Ok(content.clone())
		} else if config.is_external() {
			let key = config.name.as_deref().unwrap_or(name);

			Ok(format!("{{{{ key \"configs/{key}\" }}}}"))
		} else if let Some(file) = &config.file {
			self.warn(format!(
				"the config `{name}` reads `{file}`, which must be present on the Nomad clients"
			));

			Ok(format!("{{{{ file \"{file}\" }}}}"))
		} else if let Some(variable) = &config.environment {
			Ok(format!("{{{{ env \"{variable}\" }}}}"))
		} else {
			Err(ConvertError::ConfigWithoutSource(name.to_string()))
		}
	}

	/// Renders configs into `local/` and secrets into `secrets/`.
	pub(super) fn templates(&mut self) -> Result<Vec<Template>, ConvertError> {
		let service = self.service;
		let mut templates = vec![];

		for reference in service.configs.iter().flatten() {
			let name = reference.source();

			let config = self
				.file
				.config(name)
				.ok_or_else(|| ConvertError::UnknownConfig(name.to_string()))?;

			templates.push(Template {
				data: self.config_body(name, &config)?,
				destination: destination("local", reference),
				change_mode: CHANGE_MODE.to_string(),
			});
		}

		for reference in service.secrets.iter().flatten() {
			let name = reference.source();

			let secret = self
				.file
				.secret(name)
				.ok_or_else(|| ConvertError::UnknownSecret(name.to_string()))?;

			if let Some(file) = &secret.file {
				self.warn(format!(
					"the secret `{name}` is read from Vault, the content of `{file}` must be stored at `secret/data/{name}`"
				));
			}

			templates.push(Template {
				data: secret_body(name),
				destination: destination("secrets", reference),
				change_mode: CHANGE_MODE.to_string(),
			});
		}

		Ok(templates)
	}
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;

	use super::*;

	#[test]
	fn secret_lookups() {
		assert_eq!(
			secret_body("db_password"),
			r#"{{ with secret "secret/data/db_password" }}{{ .Data.data.value }}{{ end }}"#
		);
	}

	#[test]
	fn destinations() {
		let short = ServiceConfigOrSecret::Short("app_config".to_string());
		let long: ServiceConfigOrSecret =
			serde_json::from_value(serde_json::json!({ "source": "app", "target": "/etc/app.conf" }))
				.unwrap();

		assert_eq!(destination("local", &short), "local/app_config");
		assert_eq!(destination("secrets", &long), "secrets/etc/app.conf");
	}
}
