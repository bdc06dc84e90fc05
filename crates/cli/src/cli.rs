use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "wc")]
#[command(about = "Pair with a wallet over a relay bridge and send it requests")]
#[command(version)]
pub struct Cli {
	/// Increase verbosity (-v info, -vv debug, -vvv trace)
	#[arg(short, long, global = true, action = clap::ArgAction::Count)]
	pub verbose: u8,

	/// Config file (defaults to <config dir>/wc/config.json)
	#[arg(long, global = true, value_name = "FILE")]
	pub config: Option<PathBuf>,

	/// Bridge server URL
	#[arg(long, global = true, value_name = "URL")]
	pub bridge: Option<String>,

	/// Name shown to the wallet
	#[arg(long, global = true, value_name = "NAME")]
	pub dapp_name: Option<String>,

	/// Directory holding the session registry
	#[arg(long, global = true, value_name = "DIR")]
	pub store_dir: Option<PathBuf>,

	#[command(subcommand)]
	pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
	/// Resume a stored session or pair with a new wallet
	Pair(PairArgs),

	/// Encrypt and submit a JSON request to the paired wallet
	Send {
		/// Request body as JSON
		request: String,
		/// Wait for the wallet's answer
		#[arg(long)]
		wait: bool,
	},

	/// Show the wallet's answer to a submitted transaction
	Status { transaction_id: String },

	/// Manage stored sessions
	Sessions {
		#[command(subcommand)]
		action: SessionsAction,
	},
}

#[derive(Args, Debug, Default)]
pub struct PairArgs {
	/// Session lifetime in seconds
	#[arg(long, value_name = "SECS")]
	pub ttl_secs: Option<u64>,

	/// Wait for the wallet to approve the session
	#[arg(long)]
	pub wait: bool,

	/// Do not print the pairing QR code
	#[arg(long)]
	pub no_qr: bool,
}

#[derive(Subcommand, Debug)]
pub enum SessionsAction {
	/// List stored sessions, most recent first
	List,
	/// Remove expired sessions
	Purge,
	/// Remove one session
	#[command(alias = "rm")]
	Remove { session_id: String },
	/// Create the session registry
	Init,
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_globals_after_subcommand() {
		let cli = Cli::try_parse_from(["wc", "pair", "--wait", "--ttl-secs", "60", "-vv", "--bridge", "http://localhost:5001"]).unwrap();
		assert_eq!(cli.verbose, 2);
		assert_eq!(cli.bridge.as_deref(), Some("http://localhost:5001"));
		let Commands::Pair(args) = cli.command else {
			panic!("expected pair");
		};
		assert!(args.wait);
		assert!(!args.no_qr);
		assert_eq!(args.ttl_secs, Some(60));
	}

	#[test]
	fn parses_sessions_remove_alias() {
		let cli = Cli::try_parse_from(["wc", "sessions", "rm", "abc123"]).unwrap();
		assert!(matches!(
			cli.command,
			Commands::Sessions {
				action: SessionsAction::Remove { ref session_id }
			} if session_id == "abc123"
		));
	}

	#[test]
	fn send_requires_request() {
		assert!(Cli::try_parse_from(["wc", "send"]).is_err());
	}
}
