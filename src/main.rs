use bulbswap::migrate::MigrationRequest;
use bulbswap::model::RenameMode;
use bulbswap::output::Format;
use bulbswap::store::credentials::CredentialStore;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "bulbswap",
    version = bulbswap::build_info::VERSION_LABEL,
    about = "Move a replaced bulb's groups, scenes, rules and automations to its successor"
)]
struct Cli {
    /// Output format
    #[arg(long, global = true, value_enum, default_value = "pretty")]
    format: Format,
    /// Bridge address (IP or hostname); overrides stored credentials
    #[arg(long, global = true, env = "BULBSWAP_HOST")]
    host: Option<String>,
    /// API username (application key); overrides stored credentials
    #[arg(long, global = true, env = "BULBSWAP_USERNAME", hide_env_values = true)]
    username: Option<String>,
    /// Accept the bridge's self-signed TLS certificate
    #[arg(long, global = true)]
    insecure: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Remember the bridge address and API username for later runs
    Login,
    /// Forget stored bridge credentials
    Logout,
    /// List lights with their v1 and v2 ids
    Lights,
    /// Copy every reference of the old bulb to the new one
    Migrate {
        /// v1 id of the bulb being replaced
        #[arg(long)]
        old: String,
        /// v1 id of the replacement bulb
        #[arg(long)]
        new: String,
        /// How the two bulbs are renamed afterwards
        #[arg(long, value_enum, default_value = "inherit")]
        mode: RenameMode,
        /// Read everything and log the writes without sending them
        #[arg(long)]
        dry_run: bool,
    },
}

fn run(cli: Cli, format: Format) -> bulbswap::error::Result<()> {
    let store = CredentialStore::open_default()?;
    match cli.command {
        Commands::Login => {
            let (Some(host), Some(username)) = (cli.host, cli.username) else {
                return Err(bulbswap::error::BulbError::NotConfigured);
            };
            bulbswap::commands::login::run(&store, host, username, cli.insecure, format)
        }
        Commands::Logout => bulbswap::commands::logout::run(&store, format),
        Commands::Lights => {
            let config = store.resolve(cli.host, cli.username, cli.insecure)?;
            bulbswap::commands::lights::run(config, format)
        }
        Commands::Migrate {
            old,
            new,
            mode,
            dry_run,
        } => {
            let request = MigrationRequest {
                old,
                new,
                mode,
                dry_run,
            };
            let config = store.resolve(cli.host, cli.username, cli.insecure)?;
            bulbswap::commands::migrate::run(config, &store, request, format)
        }
    }
}

fn main() {
    let cli = Cli::parse();
    let format = cli.format;
    if let Err(e) = run(cli, format) {
        match format {
            Format::Json => {
                eprintln!(
                    "{}",
                    serde_json::json!({
                        "error": e.code(),
                        "message": e.to_string()
                    })
                );
            }
            _ => eprintln!("error: {e}"),
        }
        std::process::exit(1);
    }
}
