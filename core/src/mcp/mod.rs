//! Remote tool providers over the Model Context Protocol (rmcp SDK).
//!
//! ```rust,ignore
//! let remote = McpToolProvider::connect_http("time", "http://localhost:5000/mcp").await?;
//! let providers: Vec<Arc<dyn ToolProvider>> = vec![Arc::new(remote)];
//! let answer = orchestrator.run_turn(&mut history, &providers, &params).await?;
//! ```

mod client;

pub use client::McpToolProvider;
