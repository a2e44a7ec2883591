use anyhow::{Context, Result};
use console::style;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use toolweave_core::config::{self, Config};
use toolweave_core::{
    ChatMessage, DispatchMode, McpToolProvider, ModelParams, ToolOrchestrator, ToolProvider,
    TurnEvent, TurnObserver,
};

const HISTORY_FILE: &str = "history.txt";
const PREVIEW_LEN: usize = 160;

/// Local registry (when enabled) followed by one provider per MCP server, in
/// configuration order.
pub async fn connect_providers(config: &Config) -> Result<Vec<Arc<dyn ToolProvider>>> {
    let mut providers: Vec<Arc<dyn ToolProvider>> = Vec::new();

    if config.local_tools {
        providers.push(Arc::new(toolweave_core::default_local_tools()));
    }

    for server in &config.mcp_servers {
        let provider = McpToolProvider::connect_http(&server.name, &server.url)
            .await
            .with_context(|| {
                format!(
                    "Could not connect to MCP server '{}' at {}",
                    server.name, server.url
                )
            })?;
        providers.push(Arc::new(provider));
    }

    Ok(providers)
}

pub fn build_orchestrator(config: &Config) -> Result<ToolOrchestrator> {
    let endpoint = toolweave_core::create_endpoint(config)?;

    let mut orchestrator = ToolOrchestrator::new(endpoint)
        .with_max_rounds(config.max_rounds)
        .with_observer(console_observer());
    if config.sequential_tools {
        orchestrator = orchestrator.with_dispatch_mode(DispatchMode::Sequential);
    }
    if let Some(timeout) = config.tool_timeout() {
        orchestrator = orchestrator.with_tool_timeout(timeout);
    }
    Ok(orchestrator)
}

fn console_observer() -> TurnObserver {
    Arc::new(|event: &TurnEvent| match event {
        TurnEvent::RoundStarted { .. } => {}
        TurnEvent::ToolCallStarted { call } => {
            println!(
                "  {} {} {}",
                style("⚙").cyan(),
                style(&call.name).white().bold(),
                style(preview(&call.arguments)).dim()
            );
        }
        TurnEvent::ToolCallFinished { tool_name, result } => {
            let marker = if result.is_error {
                style("✗").red()
            } else {
                style("✓").green()
            };
            println!(
                "    {} {} {}",
                marker,
                style(tool_name).dim(),
                style(preview(&result.content)).dim()
            );
        }
    })
}

fn preview(text: &str) -> String {
    let line = text.replace('\n', " ");
    match line.char_indices().nth(PREVIEW_LEN) {
        Some((idx, _)) => format!("{}…", &line[..idx]),
        None => line,
    }
}

/// One conversation plus the providers and orchestrator serving it.
pub struct ChatSession {
    orchestrator: ToolOrchestrator,
    providers: Vec<Arc<dyn ToolProvider>>,
    params: ModelParams,
    history: Vec<ChatMessage>,
}

impl ChatSession {
    pub fn new(
        config: &Config,
        orchestrator: ToolOrchestrator,
        providers: Vec<Arc<dyn ToolProvider>>,
    ) -> Self {
        let mut history = Vec::new();
        if !config.system_prompt.trim().is_empty() {
            history.push(ChatMessage::system(config.system_prompt.clone()));
        }

        Self {
            orchestrator,
            providers,
            params: config.params.clone(),
            history,
        }
    }

    /// Runs one turn. Ctrl+C while the turn is in flight cancels it. A failed
    /// turn is rolled back so the next question starts from the last answer.
    pub async fn ask(&mut self, input: &str) -> Result<String> {
        let checkpoint = self.history.len();
        self.history.push(ChatMessage::user(input));

        let cancel = CancellationToken::new();
        let watcher = {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    cancel.cancel();
                }
            })
        };

        let result = self
            .orchestrator
            .run_turn_with_cancel(&mut self.history, &self.providers, &self.params, &cancel)
            .await;
        watcher.abort();

        match result {
            Ok(answer) => Ok(answer),
            Err(e) => {
                self.history.truncate(checkpoint);
                Err(e.into())
            }
        }
    }
}

fn print_answer(answer: &str) {
    if answer.trim().is_empty() {
        println!("{}", style("(no answer)").dim());
    } else {
        termimad::print_text(answer);
    }
}

pub async fn run_once(session: &mut ChatSession, message: &str) -> Result<()> {
    println!("\n🤔 Processing...\n");
    match session.ask(message).await {
        Ok(answer) => {
            print_answer(&answer);
            Ok(())
        }
        Err(e) => {
            eprintln!("❌ Error: {:#}", e);
            anyhow::bail!("Turn failed: {}", e);
        }
    }
}

pub async fn run_repl(session: &mut ChatSession) -> Result<()> {
    let mut editor = DefaultEditor::new().context("Failed to initialise line editor")?;
    let history_path = config::get_toolweave_dir().join(HISTORY_FILE);
    if editor.load_history(&history_path).is_err() {
        tracing::debug!(path = %history_path.display(), "No line history yet");
    }

    println!("{}", style("toolweave").cyan().bold());
    println!("Type your message (\"exit\" or Ctrl+D to quit, Ctrl+C cancels a turn):\n");

    loop {
        match editor.readline("> ") {
            Ok(line) => {
                let input = line.trim();
                if input.is_empty() {
                    continue;
                }
                if input == "exit" {
                    println!("\n👋 Goodbye!");
                    break;
                }
                let _ = editor.add_history_entry(input);

                println!("\n🤔 Processing...\n");
                match session.ask(input).await {
                    Ok(answer) => print_answer(&answer),
                    Err(e) => eprintln!("❌ Error: {:#}", e),
                }
                println!();
            }
            Err(ReadlineError::Interrupted) => {
                println!("{}", style("(type \"exit\" or press Ctrl+D to quit)").dim());
            }
            Err(ReadlineError::Eof) => {
                println!("\n👋 Goodbye!");
                break;
            }
            Err(e) => {
                eprintln!("❌ Error: {}", e);
                break;
            }
        }
    }

    if let Err(e) = editor.save_history(&history_path) {
        tracing::warn!(path = %history_path.display(), error = %e, "Could not save line history");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preview_truncates_long_text_on_char_boundary() {
        let long = "é".repeat(PREVIEW_LEN + 10);
        let short = preview(&long);
        assert_eq!(short.chars().count(), PREVIEW_LEN + 1);
        assert!(short.ends_with('…'));
    }

    #[test]
    fn preview_flattens_newlines() {
        assert_eq!(preview("a\nb"), "a b");
    }

    #[test]
    fn session_seeds_system_prompt() {
        let config = Config {
            api_key: "key".to_string(),
            ..Default::default()
        };
        let orchestrator = build_orchestrator(&config).unwrap();
        let session = ChatSession::new(&config, orchestrator, Vec::new());
        assert_eq!(session.history.len(), 1);
        assert_eq!(session.history[0].content, config.system_prompt);
    }
}
