use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "instancebot")]
#[command(about = "Discord slash-command control for a cloud compute instance", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version
    Version,

    /// Create the configuration directory and a template config file.
    Init {
        /// Config file path (default: INSTANCEBOT_CONFIG_PATH or ~/.instancebot/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,
    },

    /// Run the interactions webhook server.
    Serve {
        /// Config file path (default: INSTANCEBOT_CONFIG_PATH or ~/.instancebot/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,

        /// Webhook port (default from config or 8080)
        #[arg(long, short)]
        port: Option<u16>,
    },

    /// Register the guild slash command once, without waiting for Discord's
    /// Ping. Needs DISCORD_BOT_TOKEN (or discord.botToken in the config).
    Register {
        /// Config file path (default: INSTANCEBOT_CONFIG_PATH or ~/.instancebot/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Version) => {
            println!("instancebot {}", env!("CARGO_PKG_VERSION"));
        }
        Some(Commands::Init { config }) => {
            if let Err(e) = run_init(config) {
                log::error!("init failed: {}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Serve { config, port }) => {
            if let Err(e) = run_serve(config, port).await {
                log::error!("serve failed: {}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Register { config }) => {
            if let Err(e) = run_register(config).await {
                log::error!("register failed: {}", e);
                std::process::exit(1);
            }
        }
        None => {
            println!("Run with --help for usage");
        }
    }
}

fn run_init(config_path: Option<std::path::PathBuf>) -> anyhow::Result<()> {
    let path = config_path.unwrap_or_else(lib::config::default_config_path);
    let dir = lib::init::init_config_dir(&path)?;
    println!("initialized configuration at {}", dir.display());
    Ok(())
}

async fn run_serve(
    config_path: Option<std::path::PathBuf>,
    port: Option<u16>,
) -> anyhow::Result<()> {
    let (mut config, path) = lib::config::load_config(config_path)?;
    lib::init::require_initialized(&path)?;
    if let Some(p) = port {
        config.webhook.port = p;
    }
    log::info!(
        "starting webhook on {}:{}",
        config.webhook.bind,
        config.webhook.port
    );
    lib::webhook::run_server(config).await
}

async fn run_register(config_path: Option<std::path::PathBuf>) -> anyhow::Result<()> {
    use anyhow::Context;

    let (config, path) = lib::config::load_config(config_path)?;
    lib::init::require_initialized(&path)?;
    let application_id = config
        .discord
        .application_id
        .as_deref()
        .context("missing discord.applicationId")?;
    let guild_id = config
        .discord
        .guild_id
        .as_deref()
        .context("missing discord.guildId")?;
    let token = lib::config::resolve_bot_token(&config);
    let client = lib::discord::DiscordClient::new(&config.discord.api_base, token, application_id);
    client.register_guild_commands(guild_id).await?;
    println!("registered /{} in guild {}", lib::discord::COMMAND_NAME, guild_id);
    Ok(())
}
