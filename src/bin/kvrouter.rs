//! kvrouter CLI

use clap::{Parser, Subcommand};
use kvrouter::client::{Cluster, NodeHandle, Normalize};
use kvrouter::common::{parse_duration, Config};
use kvrouter::node::cleanup_data_dirs;
use kvrouter::protocol::{Command, Reply};
use kvrouter::testing;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "kvrouter")]
#[command(about = "Leader-following client for Raft key-value clusters")]
#[command(version)]
struct Cli {
    /// Config file (toml); KVROUTER_* environment variables override it
    #[arg(long, default_value = "kvrouter")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one command on the cluster leader, following redirects
    Exec {
        /// Member ports (comma-separated)
        #[arg(long, value_delimiter = ',', required = true)]
        port: Vec<u16>,

        /// Member host (defaults to the configured host)
        #[arg(long)]
        host: Option<String>,

        /// Command name followed by its arguments
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        command: Vec<String>,
    },

    /// Start a local fixture cluster and serve until Ctrl-C
    Local {
        /// Number of members
        #[arg(long, default_value = "3")]
        nodes: usize,

        /// Leader-less period of fresh members, e.g. "500ms"
        #[arg(long)]
        election_delay: Option<String>,
    },

    /// Remove leftover fixture data directories
    Cleanup {
        /// Directory to sweep (defaults to the configured data root)
        #[arg(long)]
        root: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = Config::load_from(&cli.config)?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    match cli.command {
        Commands::Exec {
            port,
            host,
            command,
        } => {
            let host = host.unwrap_or_else(|| config.host.clone());
            let nodes = port
                .into_iter()
                .map(|p| NodeHandle::remote(host.clone(), p))
                .collect();
            let mut cluster = Cluster::new(nodes).with_max_redirects(config.max_redirects);

            let cmd = Command::from_parts(command.as_slice())
                .ok_or_else(|| anyhow::anyhow!("missing command name"))?;
            let reply = cluster.execute(cmd).await?;
            match reply {
                Reply::Error(text) => println!("(error) {}", text),
                reply => println!("{}", reply.normalize()),
            }
            if let Some(leader) = cluster.current() {
                tracing::info!("Served by {}", leader.addr());
            }
        }

        Commands::Local {
            nodes,
            election_delay,
        } => {
            if let Some(delay) = election_delay {
                config.local.election_delay_ms = parse_duration(&delay)?.as_millis() as u64;
            }
            let mut cluster = testing::open_cluster(nodes, &config).await?;
            for node in cluster.nodes() {
                let role = if node.join().is_empty() { "leader" } else { "follower" };
                println!("{} ({})", node.addr(), role);
            }
            println!("Ready. Press Ctrl-C to stop.");

            tokio::signal::ctrl_c().await?;
            cluster.close();
            let removed =
                cleanup_data_dirs(&config.local.data_root, &config.local.data_dir_prefix)?;
            println!("Stopped, removed {} data directories", removed);
        }

        Commands::Cleanup { root } => {
            let root = root.unwrap_or_else(|| config.local.data_root.clone());
            print!("Cleanup: may take some time... ");
            let removed = cleanup_data_dirs(&root, &config.local.data_dir_prefix)?;
            println!("OK ({} removed)", removed);
        }
    }

    Ok(())
}
