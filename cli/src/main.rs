use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use console::style;
use toolweave_core::{ToolCatalog, config};
use tracing_subscriber::EnvFilter;
mod chat;
mod onboard;

#[derive(Parser)]
#[command(name = "toolweave")]
#[command(about = "toolweave - chat with a model that calls local and MCP tools", long_about = None)]
struct Cli {
    /// Log orchestration details to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    Onboard,
    Chat {
        #[arg(short, long)]
        message: Option<String>,
    },
    /// List the tools every configured provider advertises
    Tools,
    /// Invoke one tool directly, bypassing the model
    Call {
        name: String,
        #[arg(default_value = "{}")]
        args: String,
    },
}

fn init_tracing(verbose: bool) {
    let default_directives = if verbose {
        "warn,toolweave_core=debug,toolweave_cli=debug"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(verbose)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let command = cli.command.unwrap_or_else(|| {
        if !config::config_exists() {
            Commands::Onboard
        } else {
            Commands::Chat { message: None }
        }
    });

    match command {
        Commands::Onboard => {
            let onboard_config = onboard::run_onboard().map_err(|e| {
                eprintln!("❌ Onboarding failed: {}", e);
                anyhow::anyhow!("Onboarding failed: {}", e)
            })?;
            config::save_config(&onboard_config)?;
        }
        Commands::Chat { message } => {
            let config = config::Config::load_or_init()?;
            let orchestrator = chat::build_orchestrator(&config)?;
            let providers = chat::connect_providers(&config).await?;
            let mut session = chat::ChatSession::new(&config, orchestrator, providers);

            match message {
                Some(msg) => chat::run_once(&mut session, &msg).await?,
                None => chat::run_repl(&mut session).await?,
            }
        }
        Commands::Tools => {
            let config = config::Config::load_or_init()?;
            let providers = chat::connect_providers(&config).await?;
            let catalog = ToolCatalog::build(&providers).await?;

            if catalog.is_empty() {
                println!("{} No tools available", style("!").yellow());
                return Ok(());
            }

            println!(
                "{} Available tools ({})",
                style("✓").green().bold(),
                catalog.len()
            );
            println!();
            for descriptor in catalog.descriptors() {
                let owner = catalog
                    .resolve(&descriptor.name)
                    .map(|(provider, _)| provider.name().to_string())
                    .unwrap_or_default();
                println!(
                    "  {} {} — {}",
                    style(&descriptor.name).white().bold(),
                    style(format!("[{}]", owner)).dim(),
                    descriptor.description
                );
            }
        }
        Commands::Call { name, args } => {
            let config = config::Config::load_or_init()?;
            let providers = chat::connect_providers(&config).await?;
            let catalog = ToolCatalog::build(&providers).await?;

            let args: serde_json::Value =
                serde_json::from_str(&args).context("Tool arguments must be valid JSON")?;
            let (provider, _) = catalog
                .resolve(&name)
                .ok_or_else(|| anyhow::anyhow!("Tool '{}' not found", name))?;

            match provider.invoke(&name, args).await {
                Ok(output) => println!("{}", output),
                Err(e) => {
                    eprintln!("❌ Error: {}", e);
                    anyhow::bail!("Tool call failed: {}", e);
                }
            }
        }
    }

    Ok(())
}
