use clap::Parser;
use tracing::error;
use wc_cli::{cli::Cli, commands, logging, output};

#[tokio::main]
async fn main() {
	let cli = Cli::parse();
	logging::init_logging(cli.verbose);

	let result = match commands::dispatch(cli).await {
		Ok(value) => output::emit(&value),
		Err(err) => Err(err),
	};

	if let Err(err) = result {
		error!(target = "wc", "{err:#}");
		std::process::exit(1);
	}
}
