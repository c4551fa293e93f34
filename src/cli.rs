use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Declarative migration tool for the protocol's admin surface: diff the
/// declared configuration against the chain and batch the difference into
/// disposable migration units.
#[derive(Parser)]
#[command(name = "chainwright", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Reconcile on-chain state with the declared configuration
    Reconcile {
        #[command(flatten)]
        target: TargetArgs,
    },

    /// Compute and print the pending work without sending transactions
    Plan {
        #[command(flatten)]
        target: TargetArgs,
    },

    /// Print the stage graph in execution order
    Stages {
        /// Include the opt-in cleanup stage
        #[arg(long)]
        clean: bool,
    },
}

/// Where to reconcile and with which inputs. Shared by `reconcile` and
/// `plan`; the signing key comes from CHAINWRIGHT_PRIVATE_KEY, never the
/// command line.
#[derive(Args)]
pub struct TargetArgs {
    /// Network to reconcile (avalanche, localhost, or a custom name with
    /// --rpc-url and --chain-id)
    #[arg(long, default_value = "localhost")]
    pub network: String,

    /// Override the network's RPC endpoint
    #[arg(long)]
    pub rpc_url: Option<String>,

    /// Override the network's chain ID
    #[arg(long)]
    pub chain_id: Option<u64>,

    /// Deployments file (default: deployments/<network>.json)
    #[arg(long)]
    pub deployments: Option<PathBuf>,

    /// Exported address book, for replace detection
    #[arg(long, default_value = "build/addresses.json")]
    pub address_book: PathBuf,

    /// Pending migration ledger, read and rewritten every pass
    #[arg(long, default_value = "data/contract-migrations.json")]
    pub migrations_file: PathBuf,

    /// Directory of compiled unit artifacts (<Name>.json with bytecode)
    #[arg(long, default_value = "build/artifacts")]
    pub artifacts_dir: PathBuf,

    /// Most operations per migration unit (a replace pair counts as two)
    #[arg(long, default_value = "8")]
    pub max_batch: usize,

    /// Run the cleanup stage, stripping roles from unrecognized contracts
    #[arg(long)]
    pub clean: bool,
}
