#[cfg(test)]
mod cli_tests;

mod config_discovery;

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use config_discovery::*;
use merge_it::Merge;
use serde_json::Value;
use tracing::debug;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[cfg(feature = "nomad-api")]
use crate::client::{DEFAULT_NOMAD_ADDRESS, NomadClient};
use crate::{
	AppError, ConversionResult, ConvertOptions, OptionsConfig, OutputFormat, convert,
	fs::{STDIO_PATH, read_input, write_output},
	validate,
};

pub async fn main_entrypoint() -> Result<(), AppError> {
	Cli::parse().execute().await
}

fn init_tracing(verbose: bool) {
	let filter = if verbose {
		EnvFilter::new("debug")
	} else {
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
	};

	// Fails only if a subscriber is already installed, as in tests
	let _ = tracing_subscriber::registry()
		.with(filter)
		.with(
			fmt::layer()
				.with_target(false)
				.with_writer(std::io::stderr),
		)
		.try_init();
}

fn display_path(path: &Path) -> String {
	if path == Path::new(STDIO_PATH) {
		"<stdin>".to_string()
	} else {
		path.display().to_string()
	}
}

/// Reads a compose file (or stdin) into a document tree.
fn read_compose_file(path: &Path) -> Result<Value, AppError> {
	let text = read_input(path)?;

	serde_yaml_ng::from_str(&text).map_err(|e| AppError::DeserializationError {
		file: path.to_path_buf(),
		error: e.to_string(),
	})
}

fn print_diagnostics(warnings: &[String], errors: &[String]) {
	for warning in warnings {
		eprintln!("warning: {warning}");
	}

	for error in errors {
		eprintln!("error: {error}");
	}
}

fn convert_file(path: &Path, options: &ConvertOptions) -> Result<ConversionResult, AppError> {
	let document = read_compose_file(path)?;

	let result = convert(&document, options);

	debug!(
		groups = result.job.groups.len(),
		warnings = result.warnings.len(),
		errors = result.errors.len(),
		"Converted `{}`",
		display_path(path)
	);

	print_diagnostics(&result.warnings, &result.errors);

	Ok(result)
}

impl Cli {
	async fn execute(self) -> Result<(), AppError> {
		init_tracing(self.verbose);

		let file_config = get_config_from_cli(self.config, self.ignore_config_file)?;

		let resolve = |cli_options: Option<OptionsConfig>| {
			let mut config = file_config.clone();

			if let Some(cli_options) = cli_options {
				config.merge(cli_options);
			}

			config.resolve()
		};

		match self.command {
			Commands::Convert {
				input,
				output,
				format,
				options,
			} => {
				let options = resolve(options);

				let result = convert_file(&input, &options)?;

				let rendered = result
					.render(format, options.include_comments)
					.map_err(|e| AppError::SerializationError {
						file: output.clone().unwrap_or_else(|| PathBuf::from("<stdout>")),
						error: e.to_string(),
					})?;

				write_output(output.as_deref(), &rendered)?;

				if !result.is_success() {
					return Err(AppError::ConversionFailed(result.errors.len()));
				}
			}

			Commands::Validate { input } => {
				let document = read_compose_file(&input)?;

				let result = validate(&document);

				print_diagnostics(&result.warnings, &result.errors);

				if !result.is_valid {
					return Err(AppError::ValidationFailed(result.errors.len()));
				}

				eprintln!("{} is valid", display_path(&input));
			}

			#[cfg(feature = "nomad-api")]
			Commands::Deploy {
				input,
				options,
				api,
			} => {
				let options = resolve(options);

				let result = convert_file(&input, &options)?;

				if !result.is_success() {
					return Err(AppError::ConversionFailed(result.errors.len()));
				}

				let client = api.client()?;

				if !client.health_check().await {
					return Err(AppError::Api {
						url: api.address,
						message: "the Nomad agent is not reachable".to_string(),
					});
				}

				let submission = client
					.submit_job(&result.to_hcl(options.include_comments))
					.await?;

				println!(
					"Submitted the job `{}` ({}), status: {}",
					submission.id, submission.name, submission.status
				);
			}

			#[cfg(feature = "nomad-api")]
			Commands::Status { job_id, api } => {
				let status = api.client()?.get_job(&job_id).await?;

				println!("ID     = {}", status.id);
				println!("Name   = {}", status.name);
				println!("Type   = {}", status.type_);
				println!("Status = {}", status.status);
			}

			#[cfg(feature = "nomad-api")]
			Commands::Stop { job_id, purge, api } => {
				api.client()?.stop_job(&job_id, purge).await?;

				eprintln!(
					"Stopped the job `{job_id}`{}",
					if purge { " and purged it" } else { "" }
				);
			}

			#[cfg(feature = "schemars")]
			Commands::JsonSchema { output } => {
				OptionsConfig::generate_json_schema(&output)?;
			}
		}

		Ok(())
	}
}

/// Connection settings for the Nomad API.
#[cfg(feature = "nomad-api")]
#[derive(clap::Args, Debug, Clone)]
pub struct ApiArgs {
	/// The address of the Nomad agent.
	#[arg(long, env = "NOMAD_ADDR", default_value = DEFAULT_NOMAD_ADDRESS)]
	pub address: String,

	/// The ACL token for the requests.
	#[arg(long, env = "NOMAD_TOKEN", hide_env_values = true)]
	pub token: Option<String>,
}

#[cfg(feature = "nomad-api")]
impl ApiArgs {
	fn client(&self) -> Result<NomadClient, AppError> {
		NomadClient::new(&self.address, self.token.clone())
	}
}

#[derive(Parser, Debug, Clone)]
#[command(name = "compose2nomad")]
#[command(version, about, long_about = None)]
pub struct Cli {
	/// Logs the progress of the conversion. Overrides RUST_LOG.
	#[arg(short, long, global = true)]
	pub verbose: bool,

	/// Sets a custom config file. Any file named `compose2nomad.{yaml,yml,toml,json}` in the cwd or in `XDG_CONFIG_HOME/compose2nomad` will be detected automatically.
	#[arg(short, long, value_name = "FILE", global = true)]
	pub config: Option<PathBuf>,

	/// Ignores any automatically detected config file.
	#[arg(long, global = true)]
	pub ignore_config_file: bool,

	#[command(subcommand)]
	pub command: Commands,
}

/// The cli commands.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
	/// Converts a compose file into a Nomad job.
	Convert {
		/// The compose file, or `-` for stdin.
		input: PathBuf,

		/// The output file. Prints to stdout if absent or `-`.
		#[arg(short, long)]
		output: Option<PathBuf>,

		#[arg(short, long, value_enum, default_value_t)]
		format: OutputFormat,

		#[command(flatten)]
		options: Option<OptionsConfig>,
	},

	/// Checks a compose file without converting it.
	Validate {
		/// The compose file, or `-` for stdin.
		input: PathBuf,
	},

	#[cfg(feature = "nomad-api")]
	/// Converts a compose file and submits the job to a Nomad cluster.
	Deploy {
		/// The compose file, or `-` for stdin.
		input: PathBuf,

		#[command(flatten)]
		options: Option<OptionsConfig>,

		#[command(flatten)]
		api: ApiArgs,
	},

	#[cfg(feature = "nomad-api")]
	/// Shows the status of a job.
	Status {
		job_id: String,

		#[command(flatten)]
		api: ApiArgs,
	},

	#[cfg(feature = "nomad-api")]
	/// Stops a running job.
	Stop {
		job_id: String,

		/// Removes the job from the cluster state.
		#[arg(long)]
		purge: bool,

		#[command(flatten)]
		api: ApiArgs,
	},

	#[cfg(feature = "schemars")]
	/// Generates the json schema for the configuration file
	JsonSchema {
		/// The output path for the json schema
		output: PathBuf,
	},
}
