pub mod agent;
pub mod config;
pub mod endpoints;
pub mod error;
pub mod mcp;
pub mod tools;
pub mod traits;

pub use agent::{DispatchMode, ToolCatalog, ToolOrchestrator, TurnEvent, TurnObserver};
pub use config::*;
pub use endpoints::*;
pub use error::*;
pub use mcp::*;
pub use tools::*;
pub use traits::*;
