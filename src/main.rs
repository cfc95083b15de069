mod dispatcher;
mod gateway;
mod modules;

use blacksky_channels::{ConsoleTransport, FileCredentialStore};
use blacksky_commands::{
    install_bundled_catalog, CommandCatalog, CommandRegistry, ConfiguredRoles, CooldownLedger,
    PermissionGate, RegistryOptions,
};
use blacksky_core::{
    config::{self, Config},
    traits::{CredentialStore, Transport},
};
use clap::{Parser, Subcommand, ValueEnum};
use dispatcher::Dispatcher;
use gateway::{ReconnectPolicy, SessionGateway};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Sender used for console input when no owner is configured.
const CONSOLE_FALLBACK_SENDER: &str = "5500000000000@s.whatsapp.net";

#[derive(Parser)]
#[command(name = "blacksky", version, about = "Blacksky — WhatsApp command bot")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to config file.
    #[arg(short, long, default_value = "config.toml", env = "BLACKSKY_CONFIG")]
    config: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect and start answering commands.
    Start {
        /// Transport to connect with. Defaults to WhatsApp when it is enabled
        /// in the config, otherwise the console.
        #[arg(short, long, value_enum)]
        transport: Option<TransportKind>,
    },
    /// Show configuration, stored credentials and the command catalog.
    Status,
    /// List every registered command by category.
    Commands,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum TransportKind {
    Console,
    Whatsapp,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut cfg = config::load(&cli.config)?;
    cfg.apply_env();
    cfg.validate()?;
    let data_dir = cfg.data_dir();

    match cli.command {
        Commands::Start { transport } => {
            let _log_guard = init_tracing(&cfg, Some(&data_dir.join("logs")));
            start(cfg, transport).await?;
        }
        Commands::Status => {
            init_tracing(&cfg, None);
            status(&cli.config, &cfg).await;
        }
        Commands::Commands => {
            init_tracing(&cfg, None);
            let registry = build_registry(&cfg);
            let report = registry.load(modules::all(Instant::now())).await;
            println!("Blacksky — {}\n", report.summary());
            for (category, entries) in registry.snapshot().categories() {
                println!("{category}:");
                for entry in entries {
                    println!(
                        "  {}{:<12} {:<6} {:>3}s{}  {}",
                        cfg.bot.prefix,
                        entry.name,
                        entry.required_role.as_str(),
                        entry.cooldown_secs,
                        if entry.group_only { " [group]" } else { "" },
                        entry.description.as_deref().unwrap_or(""),
                    );
                }
            }
            for (module, error) in &report.failed {
                println!("\n  failed: {module}: {error}");
            }
        }
    }

    Ok(())
}

/// Console logging plus, when `log_dir` is given, a daily rolling file.
///
/// The returned guard flushes the file writer and must live until exit.
fn init_tracing(
    cfg: &Config,
    log_dir: Option<&Path>,
) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cfg.bot.log_level.as_str()));

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "blacksky.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_ansi(false).with_writer(writer)),
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
    guard
}

fn build_registry(cfg: &Config) -> Arc<CommandRegistry> {
    let catalog_dir = cfg.data_dir().join("commands");
    install_bundled_catalog(&catalog_dir, modules::BUNDLED_CATALOG);
    let catalog = CommandCatalog::load_dir(catalog_dir);
    CommandRegistry::new(
        Arc::new(catalog),
        RegistryOptions {
            prefix: cfg.bot.prefix.clone(),
            default_cooldown_secs: cfg.cooldown.default_secs,
        },
    )
}

fn whatsapp_enabled(cfg: &Config) -> bool {
    cfg.channel.whatsapp.as_ref().is_some_and(|w| w.enabled)
}

fn build_transport(cfg: &Config, kind: TransportKind) -> anyhow::Result<Arc<dyn Transport>> {
    match kind {
        TransportKind::Console => {
            let sender = cfg
                .auth
                .owners
                .first()
                .map(|o| format!("{o}@s.whatsapp.net"))
                .unwrap_or_else(|| CONSOLE_FALLBACK_SENDER.to_string());
            Ok(Arc::new(ConsoleTransport::stdio(sender)))
        }
        #[cfg(feature = "whatsapp-web")]
        TransportKind::Whatsapp => {
            let wa = cfg.channel.whatsapp.clone().unwrap_or_default();
            Ok(Arc::new(blacksky_channels::WhatsAppTransport::new(wa)))
        }
        #[cfg(not(feature = "whatsapp-web"))]
        TransportKind::Whatsapp => anyhow::bail!(
            "this build has no WhatsApp support. Rebuild with `--features whatsapp-web`."
        ),
    }
}

async fn start(cfg: Config, transport: Option<TransportKind>) -> anyhow::Result<()> {
    let started = Instant::now();
    let kind = transport.unwrap_or(if whatsapp_enabled(&cfg) {
        TransportKind::Whatsapp
    } else {
        TransportKind::Console
    });
    let transport = build_transport(&cfg, kind)?;
    let credentials = Arc::new(FileCredentialStore::whatsapp_session(&cfg.data_dir()));
    let gateway = SessionGateway::new(
        transport,
        credentials,
        ReconnectPolicy::from_config(&cfg.gateway),
    )
    .with_qr_rendering(kind == TransportKind::Whatsapp);

    let registry = build_registry(&cfg);

    // Modules are loaded once the first connection is up; until then only
    // the built-in commands answer.
    let mut ready = gateway.ready();
    let loader = registry.clone();
    let load_handle = tokio::spawn(async move {
        if ready.wait_for(|n| *n >= 1).await.is_err() {
            return;
        }
        let report = loader.load(modules::all(started)).await;
        info!("Commands loaded: {}", report.summary());
    });

    let cooldowns = Arc::new(CooldownLedger::new());
    let sweep_handle = (cfg.cooldown.sweep_interval_secs > 0).then(|| {
        let ledger = cooldowns.clone();
        let period = Duration::from_secs(cfg.cooldown.sweep_interval_secs);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.tick().await;
            loop {
                interval.tick().await;
                let removed = ledger.sweep(chrono::Utc::now().timestamp_millis());
                if removed > 0 {
                    debug!("cooldowns: swept {removed} expired records");
                }
            }
        })
    });

    let dispatcher = Dispatcher::new(
        registry,
        cooldowns,
        PermissionGate::new(Arc::new(ConfiguredRoles::from_config(&cfg.auth))),
        cfg.bot.prefix.clone(),
        cfg.notices.clone(),
    );

    println!("Blacksky — starting on {}...", transport_label(kind));
    let (tx, mut rx) = mpsc::channel(256);
    let run = gateway.run(tx);
    tokio::pin!(run);

    let result = loop {
        tokio::select! {
            Some((session, message)) = rx.recv() => {
                // Gating runs inline so per-sender order is preserved; the
                // handler itself continues on its own task.
                let _ = dispatcher.dispatch(session, message).await;
            }
            result = &mut run => {
                break result.map_err(anyhow::Error::from);
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Received shutdown signal");
                break Ok(());
            }
        }
    };

    load_handle.abort();
    if let Some(handle) = sweep_handle {
        handle.abort();
    }
    let state = gateway.state();
    info!("Session gateway stopped ({})", state.status);
    if let Err(e) = &result {
        warn!("Shutting down after error: {e}");
    }
    result
}

fn transport_label(kind: TransportKind) -> &'static str {
    match kind {
        TransportKind::Console => "console",
        TransportKind::Whatsapp => "whatsapp",
    }
}

async fn status(config_path: &str, cfg: &Config) {
    let data_dir = cfg.data_dir();
    println!("Blacksky — Status Check\n");
    println!("Config: {config_path}");
    println!("Data dir: {}", data_dir.display());
    println!("Prefix: {}", cfg.bot.prefix);
    println!(
        "Owners: {}",
        if cfg.auth.owners.is_empty() {
            "none".to_string()
        } else {
            cfg.auth.owners.join(", ")
        }
    );
    println!();

    let credentials = FileCredentialStore::whatsapp_session(&data_dir);
    println!(
        "  whatsapp: {}",
        match (cfg!(feature = "whatsapp-web"), whatsapp_enabled(cfg)) {
            (false, _) => "not compiled in",
            (true, true) => "enabled",
            (true, false) => "disabled",
        }
    );
    println!(
        "  session: {} ({})",
        if credentials.exists().await {
            "paired"
        } else {
            "not paired"
        },
        credentials.location()
    );

    let catalog = CommandCatalog::load_dir(data_dir.join("commands"));
    println!("  catalog: {} command records", catalog.len());
}
