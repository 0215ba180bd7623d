#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

use clap::{Args, Parser, Subcommand};
use mural_replication::NodeConfig;
use std::path::PathBuf;

mod client;

use client::BoardClient;

#[derive(Parser)]
#[command(name = "mural", about = "Replicated bulletin board node")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    #[arg(long, env = "MURAL_DATA_DIR", default_value = "./data")]
    data_dir: PathBuf,
    #[arg(long, env = "MURAL_NODE_ID")]
    node_id: Option<String>,
    /// Address the client API listens on
    #[arg(long, env = "MURAL_CLIENT_ADDR")]
    client_addr: Option<String>,
    /// Address the peer protocol listens on; must match this node's entry in --peers
    #[arg(long, env = "MURAL_PEER_ADDR")]
    peer_addr: Option<String>,
    /// Peer addresses of every node in the cluster, comma separated
    #[arg(long, env = "MURAL_PEERS", value_delimiter = ',')]
    peers: Option<Vec<String>>,
    #[arg(long, env = "MURAL_STARTUP_DELAY_MS")]
    startup_delay_ms: Option<u64>,
    #[arg(long, env = "MURAL_PEER_TIMEOUT_MS")]
    peer_timeout_ms: Option<u64>,
}

#[derive(Subcommand)]
enum Command {
    /// Print the resolved node configuration as JSON and exit
    Config,
    /// Log in to a node and print the session token
    Login {
        #[command(flatten)]
        node: NodeArg,
        username: String,
        password: String,
    },
    /// Post a message with a session token from `mural login`
    Post {
        #[command(flatten)]
        node: NodeArg,
        #[arg(long, env = "MURAL_TOKEN")]
        token: String,
        /// Message text; multiple words are joined with spaces
        #[arg(required = true, num_args = 1..)]
        content: Vec<String>,
    },
    /// Print every message on a node's board
    Read {
        #[command(flatten)]
        node: NodeArg,
    },
    /// Interactive client: login, post and read at a prompt
    Shell {
        #[command(flatten)]
        node: NodeArg,
    },
}

#[derive(Args)]
struct NodeArg {
    /// Client API address of the node to talk to
    #[arg(long, env = "MURAL_NODE", default_value = "127.0.0.1:8000")]
    node: String,
}

impl Cli {
    /// node.json (or defaults), then flags and MURAL_* variables on top.
    fn resolve_config(&self) -> mural::Result<NodeConfig> {
        let mut config = NodeConfig::load_or_default(&self.data_dir);
        if let Some(node_id) = &self.node_id {
            config.node_id = node_id.clone();
        }
        if let Some(client_addr) = &self.client_addr {
            config.client_addr = client_addr.clone();
        }
        if let Some(peer_addr) = &self.peer_addr {
            config.peer_addr = peer_addr.clone();
        }
        if let Some(peers) = &self.peers {
            config.peers = peers
                .iter()
                .map(|p| p.trim().to_string())
                .filter(|p| !p.is_empty())
                .collect();
        }
        if let Some(ms) = self.startup_delay_ms {
            config.startup_delay_ms = ms;
        }
        if let Some(ms) = self.peer_timeout_ms {
            config.peer_timeout_ms = ms;
        }
        config.validate()?;
        Ok(config)
    }
}

async fn run_client(command: &Command) -> client::Result<()> {
    match command {
        Command::Login {
            node,
            username,
            password,
        } => {
            let mut client = BoardClient::new(&node.node, None)?;
            let token = client.login(username, password).await?;
            eprintln!("Logged in as {}", username);
            println!("{}", token);
        }
        Command::Post {
            node,
            token,
            content,
        } => {
            let client = BoardClient::new(&node.node, Some(token.clone()))?;
            let message = client.post(&content.join(" ")).await?;
            println!("Posted {}", message.id);
        }
        Command::Read { node } => {
            let client = BoardClient::new(&node.node, None)?;
            print!("{}", client::format_board(&client.read().await?));
        }
        Command::Shell { node } => {
            client::run_shell(BoardClient::new(&node.node, None)?).await?;
        }
        Command::Config => {}
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match &cli.command {
        Some(Command::Config) => {
            println!("{}", serde_json::to_string_pretty(&cli.resolve_config()?)?);
            Ok(())
        }
        Some(command) => {
            if let Err(e) = run_client(command).await {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
            Ok(())
        }
        None => {
            mural_http::init_tracing();
            let config = cli.resolve_config()?;
            mural_http::serve(config, &cli.data_dir).await
        }
    }
}
