mod commands;
mod gateway;

use clap::{Parser, Subcommand};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use warden_auth::{Gatekeeper, SessionDefaults};
use warden_channels::telegram::TelegramChannel;
use warden_cloudflare::CloudflareApi;
use warden_core::{
    config::{self, Config},
    sanitize,
    traits::{Channel, ControlApi},
};

#[derive(Parser)]
#[command(
    name = "warden",
    version,
    about = "Warden: a single-owner remote control bot"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to config file.
    #[arg(short, long, env = "WARDEN_CONFIG", default_value = "config.toml")]
    config: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the bot.
    Start,
    /// Validate the config and print a summary.
    Status,
}

/// Install the global subscriber. `RUST_LOG` wins over the configured level.
/// The returned guard flushes the log file on drop.
fn init_logging(cfg: &Config) -> anyhow::Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&cfg.warden.log_level));

    let (file_layer, guard) = match cfg.warden.log_file.as_deref() {
        Some(path) => {
            let path = config::shellexpand(path);
            let path = Path::new(&path);
            let dir = path.parent().unwrap_or_else(|| Path::new("."));
            let file = path
                .file_name()
                .ok_or_else(|| anyhow::anyhow!("log_file has no file name: {}", path.display()))?;
            std::fs::create_dir_all(dir)?;
            let (writer, guard) =
                tracing_appender::non_blocking(tracing_appender::rolling::never(dir, file));
            (
                Some(fmt::layer().with_writer(writer).with_ansi(false)),
                Some(guard),
            )
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .init();

    Ok(guard)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Start => {
            let cfg = config::load(&cli.config)?;
            let _log_guard = init_logging(&cfg)?;
            info!("Loaded config from {}", cli.config);

            // Granted chats get a shell as this user.
            if unsafe { libc::geteuid() } == 0 {
                warn!("running as root: every granted chat gets root access");
            }

            let mut channels: HashMap<String, Arc<dyn Channel>> = HashMap::new();
            if let Some(ref tg) = cfg.channel.telegram {
                if tg.enabled {
                    if tg.bot_token.is_empty() {
                        anyhow::bail!(
                            "Telegram is enabled but bot_token is empty. \
                             Set it in config.toml or {} env var.",
                            config::BOT_TOKEN_ENV
                        );
                    }
                    channels.insert(
                        "telegram".to_string(),
                        Arc::new(TelegramChannel::new(tg.clone())),
                    );
                }
            }
            if channels.is_empty() {
                anyhow::bail!("No channels enabled. Enable at least one channel in config.toml.");
            }

            let control: Option<Arc<dyn ControlApi>> = cfg
                .cloudflare
                .enabled
                .then(|| Arc::new(CloudflareApi::from_config(&cfg.cloudflare)) as Arc<dyn ControlApi>);

            let env = sanitize::inherited_env();
            if !env.removed.is_empty() {
                info!(
                    "withheld from session environment: {}",
                    env.removed.join(", ")
                );
            }
            let defaults = SessionDefaults::from_config(&cfg.session, env.vars);
            info!(
                "session defaults: shell {} in {}",
                defaults.default_shell(),
                defaults.cwd.display()
            );

            let gate = Gatekeeper::new(cfg.auth.owner, defaults)
                .with_deny_message(cfg.auth.deny_message.clone());

            println!("{} - starting...", cfg.warden.name);
            let gw = Arc::new(gateway::Gateway::new(Arc::new(gate), channels, control));
            gw.run().await?;
        }
        Commands::Status => {
            let cfg = config::load(&cli.config)?;
            println!("{} - Status Check\n", cfg.warden.name);
            println!("Config: {}", cli.config);
            println!("Owner: {}", cfg.auth.owner);
            println!("Log level: {}", cfg.warden.log_level);
            println!();

            match cfg.channel.telegram {
                Some(ref tg) => println!(
                    "  telegram: {}",
                    if tg.enabled && !tg.bot_token.is_empty() {
                        "configured"
                    } else if tg.enabled {
                        "enabled but missing bot_token"
                    } else {
                        "disabled"
                    }
                ),
                None => println!("  telegram: not configured"),
            }
            println!(
                "  cloudflare: {}",
                if cfg.cloudflare.enabled {
                    "configured"
                } else {
                    "disabled"
                }
            );

            let shells = cfg.session.resolve_shells();
            println!("  shells: {}", shells.join(", "));
            println!("  directory: {}", cfg.session.resolve_cwd().display());
        }
    }

    Ok(())
}
