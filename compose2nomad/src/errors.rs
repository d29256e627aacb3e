use std::{io, path::PathBuf};

use docker_compose_config::ComposeError;
use thiserror::Error;

/// The reasons why a single service could not be translated.
///
/// These never abort a conversion. They are collected as `Service '<name>': <error>`
/// entries and the service is left out of the job.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConvertError {
	#[error("no image or build specified")]
	MissingImage,

	#[error(transparent)]
	Compose(#[from] ComposeError),

	#[error("invalid cpu value `{0}`, expected a positive number of cores")]
	InvalidCpu(String),

	#[error("invalid memory value `{0}`, expected digits with an optional unit (b, k, m, g)")]
	InvalidMemory(String),

	#[error("references the undeclared config `{0}`")]
	UnknownConfig(String),

	#[error("references the undeclared secret `{0}`")]
	UnknownSecret(String),

	#[error("config `{0}` has no file, content, environment or external source")]
	ConfigWithoutSource(String),

	#[error("collides with the service `{0}` (names are compared case-insensitively)")]
	NameCollision(String),
}

/// The kinds of errors that can occur while running the cli.
#[derive(Debug, Error)]
pub enum AppError {
	// I/O errors
	#[error("Could not read the contents of `{path}`: {source}")]
	ReadError { path: PathBuf, source: io::Error },

	#[error("Failed to create or write to the file `{path}`: {source}")]
	WriteError { path: PathBuf, source: io::Error },

	// Serde errors
	#[error("Error while serializing the content for `{file:?}`: {error}")]
	SerializationError { file: PathBuf, error: String },

	#[error("Error while deserializing the contents of `{file:?}`: {error}")]
	DeserializationError { file: PathBuf, error: String },

	#[error("Invalid config format for `{0:?}`. Allowed formats are: yaml, yml, toml, json")]
	InvalidConfigFormat(PathBuf),

	// Outcomes
	#[error("Validation failed with {0} error(s)")]
	ValidationFailed(usize),

	#[error("Conversion failed with {0} error(s)")]
	ConversionFailed(usize),

	#[cfg(feature = "nomad-api")]
	#[error("Request to the Nomad API at `{url}` failed: {message}")]
	Api { url: String, message: String },

	#[error(transparent)]
	Other(#[from] anyhow::Error),
}
