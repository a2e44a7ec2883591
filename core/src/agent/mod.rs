pub mod catalog;
pub mod orchestrator;

pub use catalog::ToolCatalog;
pub use orchestrator::{DispatchMode, ToolOrchestrator, TurnEvent, TurnObserver};
