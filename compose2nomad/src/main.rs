use clap::{CommandFactory, error::ErrorKind};
use compose2nomad::cli::{Cli, main_entrypoint};

#[tokio::main]
async fn main() {
	if let Err(e) = main_entrypoint().await {
		let mut cmd = Cli::command();
		cmd.error(ErrorKind::InvalidValue, e).exit();
	}
}
