//! Configuration management for acton-chain.
//!
//! # Configuration File Format
//!
//! Configuration is stored in TOML format. The search order is:
//! 1. `./acton-chain.toml` (project-local)
//! 2. `~/.config/acton-chain/config.toml` (XDG config)
//!
//! Every section and key is optional.
//!
//! # Example Configuration
//!
//! ```toml
//! [limits]
//! max_iterations = 10
//! max_depth = 5
//! invocation_timeout_secs = 30
//! chain_timeout_secs = 120
//! loop_window = 5
//! loop_threshold = 2
//!
//! [approval]
//! sensitive_tools = ["file_write", "file_delete", "send_email"]
//!
//! # Forward `text` (or `processed_data`) of the previous result as `body`
//! [extraction.forward.summarize]
//! param = "body"
//! keys = ["text", "processed_data"]
//!
//! [logging]
//! level = "info"
//! target = "stderr"
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use acton_chain::config;
//!
//! let config = config::load()?;
//! let orchestrator = ChainOrchestrator::with_builtins()?
//!     .with_limits(config.chain_limits())
//!     .with_policy(config.approval_policy())
//!     .with_extractor(config.parameter_extractor());
//! ```

mod file;
mod types;

pub use file::{from_path, from_str, load, search_paths, xdg_config_dir};

pub use types::{ApprovalConfig, ChainConfig, ExtractionConfig, LimitsConfig};
