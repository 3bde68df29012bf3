use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};

use ipsentry::application::gate::{CommandRouter, Restricted};
use ipsentry::application::handlers::{IpHandler, PingHandler};
use ipsentry::application::reporter::ErrorReporter;
use ipsentry::domain::entities::{ChatContext, Command, OperatorSet, User};
use ipsentry::domain::traits::{MessageFormat, Transport};
use ipsentry::infrastructure::adapters::console::ConsoleTransport;
use ipsentry::infrastructure::adapters::telegram::{self, TelegramTransport};
use ipsentry::infrastructure::config::Config;
use ipsentry::infrastructure::resolver::AddressResolver;

#[derive(Parser)]
#[command(name = "ipsentry")]
#[command(about = "Operator-gated bot reporting the host's public IP", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, default_value = "config.yaml")]
    config: String,

    /// Bot token (overrides config)
    #[arg(short, long)]
    token: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the bot
    Run,
    /// Show version
    Version,
    /// Generate default config
    InitConfig,
}

fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run => {
            run_bot(cli.config, cli.token);
        }
        Commands::Version => {
            println!("ipsentry v{}", env!("CARGO_PKG_VERSION"));
        }
        Commands::InitConfig => {
            init_config();
        }
    }
}

fn run_bot(config_path: String, token_override: Option<String>) {
    // Load config
    let config = if std::path::Path::new(&config_path).exists() {
        match Config::load(&config_path) {
            Ok(config) => config,
            Err(e) => {
                tracing::error!("Failed to load config: {}", e);
                std::process::exit(1);
            }
        }
    } else {
        tracing::warn!("Config file {} not found, using environment", config_path);
        Config::load_env()
    };

    let operators = match config.operator_set() {
        Ok(set) => Arc::new(set),
        Err(e) => {
            tracing::error!("Invalid operator configuration: {}", e);
            std::process::exit(1);
        }
    };

    tracing::info!(
        "Starting {}: {} operator(s) configured",
        config.bot.name,
        operators.len()
    );

    let resolver = match AddressResolver::new(
        config.resolver.sources.clone(),
        Duration::from_secs(config.resolver.timeout_secs),
    ) {
        Ok(resolver) => Arc::new(resolver),
        Err(e) => {
            tracing::error!("Failed to build resolver: {}", e);
            std::process::exit(1);
        }
    };

    // Command surface: both commands gated to operators
    let mut router = CommandRouter::new();
    router.register("ping", Restricted::new(PingHandler, operators.clone()));
    router.register("ip", Restricted::new(IpHandler::new(resolver), operators.clone()));
    tracing::info!("Registered {} command handler(s)", router.len());

    let reporter = ErrorReporter::new(operators.clone());

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            tracing::error!("Failed to start runtime: {}", e);
            std::process::exit(1);
        }
    };

    let token = token_override.or_else(|| config.telegram.token.clone());
    if let Some(token) = token {
        let transport = match TelegramTransport::new(token, config.telegram.proxy.as_deref()) {
            Ok(transport) => transport,
            Err(e) => {
                tracing::error!("Failed to build Telegram transport: {}", e);
                std::process::exit(1);
            }
        };
        rt.block_on(run_telegram_bot(transport, router, reporter, operators));
    } else {
        // Dev mode: no token, read commands from stdin
        rt.block_on(run_console_bot(router, reporter, operators));
    }
}

async fn run_telegram_bot(
    transport: TelegramTransport,
    router: CommandRouter,
    reporter: ErrorReporter,
    operators: Arc<OperatorSet>,
) {
    match transport.fetch_username().await {
        Ok(username) => tracing::info!("Bot started: @{}", username),
        Err(e) => {
            tracing::error!("Failed to reach Telegram API: {}", e);
            return;
        }
    }

    if let Err(e) = transport.register_commands().await {
        tracing::warn!("Failed to register commands: {}", e);
    }

    // Startup notification to every operator
    for operator in operators.iter() {
        if let Err(e) = transport
            .send_message(operator, "Started...", MessageFormat::Plain)
            .await
        {
            tracing::warn!("Failed to notify operator {}: {}", operator, e);
        }
    }

    let mut offset: i64 = 0;
    let timeout_seconds = 30;

    tracing::info!("Starting update loop...");

    loop {
        match transport.get_updates(offset, timeout_seconds).await {
            Ok(updates) => {
                if !updates.is_empty() {
                    offset = TelegramTransport::get_next_offset(&updates);
                }
                for update in &updates {
                    let Some(cmd) = telegram::parse_command(update) else {
                        continue;
                    };
                    let result = router.dispatch(&cmd, &transport).await;
                    // Failures are broadcast to operators, then logged here
                    if let Err(err) = reporter.guard(&transport, Some(&cmd), result).await {
                        tracing::error!("Command /{} failed: {}", cmd.name, err);
                    }
                }
            }
            Err(e) => {
                tracing::warn!("getUpdates failed: {}", e);
                tokio::time::sleep(Duration::from_secs(3)).await;
            }
        }
    }
}

async fn run_console_bot(
    router: CommandRouter,
    reporter: ErrorReporter,
    operators: Arc<OperatorSet>,
) {
    let transport = ConsoleTransport::new();
    // The console user acts as the first configured operator
    let operator_id = operators
        .iter()
        .next()
        .map(|s| s.to_string())
        .unwrap_or_default();

    tracing::info!("Console mode, type /ping or /ip (Ctrl-D to exit)");

    while let Some(line) = transport.read_line("> ") {
        let Some(rest) = line.strip_prefix('/') else {
            continue;
        };
        let mut parts = rest.split_whitespace();
        let Some(name) = parts.next() else {
            continue;
        };
        let args: Vec<String> = parts.map(|s| s.to_string()).collect();

        let cmd = Command::new(name)
            .with_args(args)
            .with_invoker(User::new(operator_id.clone()))
            .with_chat(ChatContext::new("console"));

        let result = router.dispatch(&cmd, &transport).await;
        if let Err(err) = reporter.guard(&transport, Some(&cmd), result).await {
            tracing::error!("Command /{} failed: {}", cmd.name, err);
        }
    }
}

fn init_config() {
    let path = "config.yaml";
    if std::path::Path::new(path).exists() {
        tracing::warn!("{} already exists, not overwriting", path);
        return;
    }
    match std::fs::write(path, Config::default_yaml()) {
        Ok(()) => println!("Wrote default config to {}", path),
        Err(e) => tracing::error!("Failed to write {}: {}", path, e),
    }
}
