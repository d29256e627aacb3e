use clap::{CommandFactory, Parser};
use pretty_assertions::assert_eq;

use super::*;
use crate::ResourceDefaultsConfig;

#[test]
fn verify_cli() {
	Cli::command().debug_assert();
}

#[test]
fn convert_flags_become_option_overrides() {
	let cli = Cli::try_parse_from([
		"compose2nomad",
		"convert",
		"docker-compose.yml",
		"--job-name",
		"shop",
		"--datacenters",
		"dc1,dc2",
		"--skip-validation",
		"--default-memory",
		"512",
		"-f",
		"json",
	])
	.unwrap();

	let Commands::Convert {
		input,
		format,
		options,
		..
	} = cli.command
	else {
		panic!("Expected the convert command");
	};

	assert_eq!(input, PathBuf::from("docker-compose.yml"));
	assert_eq!(format, OutputFormat::Json);

	let options = options.unwrap();

	assert_eq!(options.job_name.as_deref(), Some("shop"));
	assert_eq!(
		options.datacenters,
		Some(vec!["dc1".to_string(), "dc2".to_string()])
	);
	assert_eq!(options.skip_validation, Some(true));
	assert_eq!(
		options.resource_defaults,
		Some(ResourceDefaultsConfig {
			cpu: None,
			memory: Some(512)
		})
	);
}

#[test]
fn priorities_out_of_range_are_rejected() {
	assert!(Cli::try_parse_from(["compose2nomad", "convert", "-", "--priority", "101"]).is_err());
}

#[test]
fn absent_options_stay_unset() {
	let cli = Cli::try_parse_from(["compose2nomad", "convert", "-"]).unwrap();

	let Commands::Convert { options, .. } = cli.command else {
		panic!("Expected the convert command");
	};

	let options = options.unwrap_or_default();

	assert_eq!(options, OptionsConfig::default());
}

#[test]
fn job_types_are_parsed() {
	let cli = Cli::try_parse_from([
		"compose2nomad",
		"convert",
		"-",
		"--job-type",
		"batch",
		"--include-comments",
	])
	.unwrap();

	let Commands::Convert { options, .. } = cli.command else {
		panic!("Expected the convert command");
	};

	let options = options.unwrap();

	assert_eq!(options.job_type, Some(nomad_job_config::JobType::Batch));
	assert_eq!(options.include_comments, Some(true));
	assert!(
		Cli::try_parse_from(["compose2nomad", "convert", "-", "--job-type", "daemon"]).is_err()
	);
}

#[test]
fn explicit_config_files_must_exist() {
	assert!(get_config_from_cli(Some(PathBuf::from("missing/compose2nomad.yaml")), false).is_err());
}
