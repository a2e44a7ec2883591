use anyhow::{Context, Result};
use console::style;
use dialoguer::{Confirm, Input, Select};
use toolweave_core::config::{Config, McpServerConfig};

const BANNER: &str = r"
    -------------------------------------

     t o o l w e a v e

     model  <->  local tools  <->  MCP

    -------------------------------------
";

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

fn print_step(step: usize, total: usize, title: &str) {
    println!();
    println!(
        "{}",
        style(format!("[{}/{}] {}", step, total, title))
            .cyan()
            .bold()
    );
    println!();
}

fn setup_base_url() -> Result<Option<String>> {
    let base_url: String = Input::new()
        .with_prompt("Chat completions base URL")
        .default(DEFAULT_BASE_URL.to_string())
        .interact_text()
        .context("Failed to read base URL")?;

    let base_url = base_url.trim().trim_end_matches('/').to_string();
    if base_url == DEFAULT_BASE_URL {
        Ok(None)
    } else {
        Ok(Some(base_url))
    }
}

fn setup_api_key() -> Result<String> {
    let api_key: String = Input::new()
        .with_prompt("Enter your API key (leave empty to use TOOLWEAVE_API_KEY)")
        .allow_empty(true)
        .interact_text()
        .context("Failed to read API key")?;

    let api_key = api_key.trim().to_string();
    if api_key.is_empty()
        && std::env::var("TOOLWEAVE_API_KEY").is_err()
        && std::env::var("OPENAI_API_KEY").is_err()
    {
        return Err(anyhow::anyhow!(
            "API key cannot be empty unless TOOLWEAVE_API_KEY or OPENAI_API_KEY is set"
        ));
    }

    Ok(api_key)
}

fn setup_model() -> Result<String> {
    let models = vec!["gpt-4o", "gpt-4o-mini", "gpt-4.1", "gpt-4.1-mini"];

    let selection = Select::new()
        .with_prompt("Select your model")
        .items(&models)
        .default(0)
        .interact()
        .context("Failed to select model")?;

    Ok(models[selection].to_string())
}

fn setup_tools() -> Result<(bool, Vec<McpServerConfig>)> {
    let local_tools = Confirm::new()
        .with_prompt("Enable the built-in GetCurrentTime and BookMeeting tools?")
        .default(true)
        .interact()
        .context("Failed to read local tools choice")?;

    let url: String = Input::new()
        .with_prompt("MCP server URL (leave empty to skip)")
        .allow_empty(true)
        .interact_text()
        .context("Failed to read MCP server URL")?;

    let url = url.trim();
    let servers = if url.is_empty() {
        Vec::new()
    } else {
        vec![McpServerConfig {
            name: "mcp".to_string(),
            url: url.to_string(),
        }]
    };

    Ok((local_tools, servers))
}

pub fn run_onboard() -> Result<Config> {
    println!("{}", style(BANNER).cyan().bold());

    println!("  {}", style("Welcome to toolweave!").white().bold());
    println!(
        "  {}",
        style("This wizard connects a chat model to your tools.").dim()
    );
    println!();

    print_step(1, 4, "Endpoint");
    let base_url = setup_base_url()?;

    print_step(2, 4, "API Key Setup");
    let api_key = setup_api_key()?;

    print_step(3, 4, "Model Selection");
    let model = setup_model()?;

    print_step(4, 4, "Tool Providers");
    let (local_tools, mcp_servers) = setup_tools()?;

    let config = Config {
        api_key,
        base_url,
        model,
        local_tools,
        mcp_servers,
        ..Default::default()
    };

    if !config.local_tools && config.mcp_servers.is_empty() {
        println!(
            "  {} No tool providers configured; the model will answer without tools.",
            style("!").yellow()
        );
    }

    println!();
    println!("  {} Configuration complete!", style("✓").green().bold());
    println!(
        "  {} Config saved to {}",
        style("→").green(),
        style(toolweave_core::config::get_config_path().display()).cyan()
    );
    println!();
    println!(
        "  {} You can now run: {}",
        style("→").green(),
        style("toolweave chat").cyan().bold()
    );
    println!();

    Ok(config)
}
