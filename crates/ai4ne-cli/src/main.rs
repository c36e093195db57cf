use ai4ne_agent::{DecisionOutcome, DecisionService};
use ai4ne_ai::LLMProviderFactory;
use ai4ne_core::{
    Ai4neConfig, ConfigManager, ContextFetcher, DecisionContract, DecisionMode,
    DecisionRequest, HttpInventoryClient, LoggingConfig, RouteDecision,
};
use ai4ne_tools::RoutingToolSchemas;
use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{filter::EnvFilter, fmt, layer::SubscriberExt, Registry};

#[derive(Parser)]
#[command(
    name = "ai4ne",
    version,
    about = "AI4NE - LLM-driven network routing decisions",
    long_about = "Asks a language model to pick a path through the network topology, either with the inventory embedded in the prompt (direct) or by letting the model call the inventory tools itself (agentic)."
)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(short, long, global = true, help = "Enable verbose logging")]
    verbose: bool,

    #[arg(
        short,
        long,
        global = true,
        env = "AI4NE_CONFIG",
        help = "Configuration file path"
    )]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Run one routing decision")]
    Decide {
        #[arg(long, value_enum, help = "Decision protocol (defaults to the configured mode)")]
        mode: Option<ModeArg>,

        #[arg(long, value_enum, help = "Answer shape (defaults to the configured contract)")]
        contract: Option<ContractArg>,

        #[arg(short, long, value_enum, default_value = "pretty", help = "Output format")]
        output: OutputFormat,

        #[arg(help = "Natural-language routing request")]
        request: String,
    },

    #[command(about = "Print the tool declarations offered to the model")]
    Tools,

    #[command(about = "Configuration management")]
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    #[command(about = "Probe the inventory service and the LLM provider")]
    Check,
}

#[derive(Subcommand)]
enum ConfigAction {
    #[command(about = "Show the effective configuration")]
    Show {
        #[arg(long, help = "Show as JSON")]
        json: bool,
    },

    #[command(
        about = "Write a default configuration file",
        long_about = "Write a default configuration file (~/.ai4ne/config.toml unless --path is given).\n\
                      \n\
                      Configuration hierarchy (highest to lowest priority):\n\
                      1. Environment variables\n\
                      2. Local .env (current directory), else ~/.ai4ne.env\n\
                      3. Local .ai4ne.toml (current directory)\n\
                      4. Global ~/.ai4ne/config.toml\n\
                      5. Built-in defaults"
    )]
    Init {
        #[arg(short, long, help = "Target file")]
        path: Option<PathBuf>,

        #[arg(short, long, help = "Overwrite an existing file")]
        force: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ModeArg {
    Direct,
    Agentic,
}

impl From<ModeArg> for DecisionMode {
    fn from(arg: ModeArg) -> Self {
        match arg {
            ModeArg::Direct => DecisionMode::Direct,
            ModeArg::Agentic => DecisionMode::Agentic,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum ContractArg {
    Path,
    Devices,
}

impl From<ContractArg> for DecisionContract {
    fn from(arg: ContractArg) -> Self {
        match arg {
            ContractArg::Path => DecisionContract::Path,
            ContractArg::Devices => DecisionContract::Devices,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Pretty,
    Json,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    // config init must work even when the current configuration is broken
    if let Commands::Config {
        action: ConfigAction::Init { path, force },
    } = &cli.command
    {
        return handle_config_init(path.clone(), *force);
    }

    let config_mgr = match &cli.config {
        Some(path) => ConfigManager::load_from(path),
        None => ConfigManager::load(),
    }
    .context("Failed to load configuration")?;
    let config = config_mgr.config().clone();

    init_tracing(&config.logging, cli.verbose);

    match cli.command {
        Commands::Decide {
            mode,
            contract,
            output,
            request,
        } => {
            let mode = mode.map(Into::into).unwrap_or(config.decision.mode);
            let contract = contract.map(Into::into).unwrap_or(config.decision.contract);
            handle_decide(&config, DecisionRequest::new(request), mode, contract, output).await
        }
        Commands::Tools => {
            println!(
                "{}",
                serde_json::to_string_pretty(&RoutingToolSchemas::all())?
            );
            Ok(())
        }
        Commands::Config { action } => match action {
            ConfigAction::Show { json } => {
                handle_config_show(&config, config_mgr.config_path(), json)
            }
            ConfigAction::Init { .. } => Ok(()),
        },
        Commands::Check => handle_check(&config).await,
    }
}

/// Logs go to stderr so JSON output on stdout stays machine-readable
fn init_tracing(logging: &LoggingConfig, verbose: bool) {
    let env_filter = || {
        if verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level))
        }
    };

    match logging.format.as_str() {
        "json" => {
            let subscriber = Registry::default()
                .with(env_filter())
                .with(fmt::layer().json().with_writer(std::io::stderr));
            tracing::subscriber::set_global_default(subscriber).ok();
        }
        "compact" => {
            let subscriber = Registry::default()
                .with(env_filter())
                .with(fmt::layer().compact().with_writer(std::io::stderr));
            tracing::subscriber::set_global_default(subscriber).ok();
        }
        _ => {
            let subscriber = Registry::default()
                .with(env_filter())
                .with(fmt::layer().with_writer(std::io::stderr));
            tracing::subscriber::set_global_default(subscriber).ok();
        }
    }
}

async fn handle_decide(
    config: &Ai4neConfig,
    request: DecisionRequest,
    mode: DecisionMode,
    contract: DecisionContract,
    output: OutputFormat,
) -> Result<()> {
    let service =
        DecisionService::from_config(config).context("Failed to initialise decision service")?;

    info!(%mode, %contract, "Submitting routing request");
    let outcome = service
        .decide_with(&request, mode, contract)
        .await
        .map_err(|e| anyhow!("{} [{}]", e, e.kind()))?;

    match output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&outcome)?),
        OutputFormat::Pretty => print_outcome(&outcome),
    }
    Ok(())
}

fn print_outcome(outcome: &DecisionOutcome) {
    match &outcome.decision {
        RouteDecision::Path(plan) => {
            println!("{}", "Selected path".green().bold());
            println!("  {}", plan.selected_path.join(" -> ").yellow());
            println!("\n{}", "Motivation".green().bold());
            println!("  {}", plan.motivation);
        }
        RouteDecision::Devices(selection) => {
            println!("{}", "Selected devices".green().bold());
            for id in &selection.selected_device_ids {
                println!("  - {}", id.yellow());
            }
        }
    }

    let report = &outcome.report;
    println!("\n{}", "Report".blue().bold());
    println!("  Request ID:   {}", report.request_id);
    println!("  Mode:         {}", report.mode);
    println!("  Contract:     {}", report.contract);
    println!("  Model rounds: {}", report.model_rounds);
    println!("  Tokens:       {}", report.total_tokens);
    println!("  Duration:     {} ms", report.duration_ms);

    if !report.tool_calls.is_empty() {
        println!("  Tool calls:");
        for record in &report.tool_calls {
            let status = if record.success {
                "ok".green()
            } else {
                "failed".red()
            };
            println!(
                "    {} {} ({} ms, {} bytes)",
                status, record.name, record.duration_ms, record.result_bytes
            );
        }
    }
}

fn handle_config_show(
    config: &Ai4neConfig,
    config_path: Option<&std::path::Path>,
    json: bool,
) -> Result<()> {
    let mut shown = config.clone();
    if shown.llm.api_key.is_some() {
        shown.llm.api_key = Some("********".to_string());
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&shown)?);
        return Ok(());
    }

    println!("{}", "Current Configuration:".blue().bold());
    match config_path {
        Some(path) => println!("  Config File: {}", path.display()),
        None => println!("  Config File: {}", "none (defaults)".yellow()),
    }

    println!("\n  {}", "Inventory:".green().bold());
    println!("    Base URL: {}", shown.inventory.base_url.yellow());
    println!("    Timeout: {}s", shown.inventory.timeout_secs);

    println!("\n  {}", "LLM:".green().bold());
    println!("    Provider: {}", shown.llm.provider.yellow());
    if let Some(model) = shown.llm.model.as_deref() {
        println!("    Model: {}", model.yellow());
    }
    if let Some(base_url) = shown.llm.base_url.as_deref() {
        println!("    Base URL: {}", base_url);
    }
    println!(
        "    API Key: {}",
        if shown.llm.api_key.is_some() {
            "set".green()
        } else {
            "not set".yellow()
        }
    );
    println!("    Temperature: {}", shown.llm.temperature);
    println!("    Max Tokens: {}", shown.llm.max_tokens);
    println!("    Structured Output: {}", shown.llm.structured_output);

    println!("\n  {}", "Decision:".green().bold());
    println!("    Mode: {}", shown.decision.mode.to_string().yellow());
    println!("    Contract: {}", shown.decision.contract.to_string().yellow());
    println!("    Max Tool Rounds: {}", shown.decision.max_tool_rounds);
    println!("    Time Budget: {}s", shown.decision.max_duration_secs);
    println!("    Validate References: {}", shown.decision.validate_references);

    println!("\n  {}", "Logging:".green().bold());
    println!("    Level: {}", shown.logging.level);
    println!("    Format: {}", shown.logging.format);

    Ok(())
}

fn handle_config_init(path: Option<PathBuf>, force: bool) -> Result<()> {
    let path = match path {
        Some(path) => path,
        None => dirs::home_dir()
            .ok_or_else(|| anyhow!("Could not determine home directory"))?
            .join(".ai4ne")
            .join("config.toml"),
    };

    if path.exists() && !force {
        println!(
            "{} Configuration file already exists: {}",
            "!".yellow().bold(),
            path.display()
        );
        println!("   Use --force to overwrite");
        return Ok(());
    }

    ConfigManager::create_default_config(&path)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    println!("{} Created config file: {}", "✓".green(), path.display());
    println!("\nAPI keys are best kept in the environment (OPENAI_API_KEY, ANTHROPIC_API_KEY).");
    Ok(())
}

async fn handle_check(config: &Ai4neConfig) -> Result<()> {
    let mut healthy = true;

    println!("{}", "Inventory service".blue().bold());
    let inventory = HttpInventoryClient::new(&config.inventory)
        .context("Failed to create inventory client")?;
    println!("  URL: {}", inventory.base_url());
    match ContextFetcher::new(Arc::new(inventory)).fetch_all().await {
        Ok(context) => {
            let devices = match context.devices.records() {
                Ok(records) => format!("{} devices", records.len()),
                Err(_) => format!("{} bytes of device data", context.devices.raw().len()),
            };
            println!(
                "  {} {}, {} nodes, {} edges",
                "✓".green(),
                devices,
                context.topology.nodes().len(),
                context.topology.edges().len()
            )
        }
        Err(e) => {
            healthy = false;
            println!("  {} {}", "✗".red(), e);
        }
    }

    println!("\n{}", "LLM provider".blue().bold());
    match LLMProviderFactory::create_from_config(&config.llm) {
        Ok(provider) => {
            println!(
                "  Provider: {} ({})",
                provider.provider_name(),
                provider.model_name()
            );
            if LLMProviderFactory::check_availability(&provider).await {
                println!("  {} reachable", "✓".green());
            } else {
                healthy = false;
                println!("  {} not reachable", "✗".red());
            }
        }
        Err(e) => {
            healthy = false;
            println!("  {} {:#}", "✗".red(), e);
        }
    }

    if healthy {
        Ok(())
    } else {
        Err(anyhow!("one or more checks failed"))
    }
}
