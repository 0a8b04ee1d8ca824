use std::net::SocketAddr;
use std::process;

use clap::{Parser, Subcommand};
use scoped_secrets_core::crypto::{generate_key_pair, seal};
use scoped_secrets_core::{ContextConfig, EnvBag, SecretContext, SnapshotStrategy};
use scoped_secrets_demo::{AppState, DemoRuntimeConfig, MemoryKv, telemetry};

#[derive(Parser)]
#[command(name = "scoped-secrets-demo", about = "Scoped secret context demo")]
struct DemoArgs {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve HTTP requests, each inside its own secret context
    Serve {
        /// Bind address
        #[arg(long, env = "DEMO__BIND_ADDRESS", default_value = "127.0.0.1:8787")]
        bind: SocketAddr,
        /// Resolve encrypted values on first read instead of up front
        #[arg(long)]
        lazy: bool,
        /// Names readable through `/v1/config/{name}`
        #[arg(long, env = "DEMO__EXPOSED_NAMES", value_delimiter = ',')]
        expose: Vec<String>,
    },
    /// Encrypt a value for the given public key
    Seal {
        /// Hex encoded secp256k1 public key
        #[arg(long, env = "DOTENV_PUBLIC_KEY")]
        public_key: String,
        value: String,
    },
    /// Print a fresh key pair
    Keypair,
}

#[tokio::main]
async fn main() {
    if let Err(err) = real_main().await {
        eprintln!("demo exited with error: {err:#}");
        process::exit(1);
    }
}

async fn real_main() -> anyhow::Result<()> {
    let args = DemoArgs::parse();
    match args.command {
        Command::Serve { bind, lazy, expose } => {
            telemetry::init()?;
            let mut config = ContextConfig::from_env();
            if lazy {
                config = config.strategy(SnapshotStrategy::Lazy);
            }
            let state = AppState::new(
                SecretContext::new(config),
                EnvBag::from_process_env(),
                MemoryKv::new(),
            )
            .expose(expose);
            scoped_secrets_demo::run(DemoRuntimeConfig { http_addr: bind }, state).await
        }
        Command::Seal { public_key, value } => {
            println!("{}", seal(&public_key, &value)?);
            Ok(())
        }
        Command::Keypair => {
            let (private_key, public_key) = generate_key_pair();
            println!("DOTENV_PUBLIC_KEY={public_key}");
            println!("DOTENV_PRIVATE_KEY={private_key}");
            Ok(())
        }
    }
}
