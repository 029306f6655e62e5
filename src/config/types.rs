//! Configuration types.
//!
//! Every section is optional in the file; missing values fall back to the
//! same defaults the library uses.

use crate::chain::{
    ApprovalPolicy, ChainLimits, ForwardKey, ParameterExtractor, DEFAULT_LOOP_THRESHOLD,
    DEFAULT_LOOP_WINDOW, DEFAULT_MAX_DEPTH, DEFAULT_MAX_ITERATIONS, DEFAULT_SENSITIVE_TOOLS,
};
use crate::error::ChainError;
use crate::logging::LoggingConfig;
use crate::tools::DEFAULT_TOOL_TIMEOUT;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Root configuration structure for acton-chain.
///
/// ```toml
/// [limits]
/// max_iterations = 8
/// max_depth = 3
/// chain_timeout_secs = 60
///
/// [approval]
/// sensitive_tools = ["file_write", "file_delete", "deploy"]
///
/// [extraction.forward.summarize]
/// param = "body"
/// keys = ["text", "processed_data"]
///
/// [logging]
/// level = "info"
/// target = "file"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainConfig {
    /// Chain limits
    pub limits: LimitsConfig,
    /// Approval gate
    pub approval: ApprovalConfig,
    /// Extra parameter extraction rules
    pub extraction: ExtractionConfig,
    /// Logging setup
    pub logging: LoggingConfig,
}

impl ChainConfig {
    /// Creates a configuration with every default.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Checks values that parse but cannot be used.
    ///
    /// # Errors
    ///
    /// Returns a configuration error naming the offending field.
    pub fn validate(&self) -> Result<(), ChainError> {
        if self.limits.max_iterations == 0 {
            return Err(ChainError::configuration(
                "limits.max_iterations",
                "must be at least 1",
            ));
        }
        if self.limits.invocation_timeout_secs == 0 {
            return Err(ChainError::configuration(
                "limits.invocation_timeout_secs",
                "must be at least 1",
            ));
        }
        if self.limits.chain_timeout_secs == Some(0) {
            return Err(ChainError::configuration(
                "limits.chain_timeout_secs",
                "must be at least 1 when set",
            ));
        }
        for (tool, rule) in &self.extraction.forward {
            if rule.keys.is_empty() {
                return Err(ChainError::configuration(
                    format!("extraction.forward.{tool}.keys"),
                    "must list at least one key",
                ));
            }
        }
        Ok(())
    }

    /// Returns the chain limits.
    #[must_use]
    pub fn chain_limits(&self) -> ChainLimits {
        ChainLimits::from(&self.limits)
    }

    /// Returns the approval policy.
    #[must_use]
    pub fn approval_policy(&self) -> ApprovalPolicy {
        ApprovalPolicy::from(&self.approval)
    }

    /// Returns the parameter extractor.
    #[must_use]
    pub fn parameter_extractor(&self) -> ParameterExtractor {
        ParameterExtractor::from(&self.extraction)
    }
}

/// `[limits]` section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum invocations per chain, initial one included
    pub max_iterations: usize,
    /// Maximum trigger nesting
    pub max_depth: usize,
    /// Default per-invocation timeout
    pub invocation_timeout_secs: u64,
    /// Wall-clock budget for a whole chain
    pub chain_timeout_secs: Option<u64>,
    /// Trailing invocations inspected by loop detection
    pub loop_window: usize,
    /// Repeats tolerated inside the loop window
    pub loop_threshold: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            max_depth: DEFAULT_MAX_DEPTH,
            invocation_timeout_secs: DEFAULT_TOOL_TIMEOUT.as_secs(),
            chain_timeout_secs: None,
            loop_window: DEFAULT_LOOP_WINDOW,
            loop_threshold: DEFAULT_LOOP_THRESHOLD,
        }
    }
}

impl From<&LimitsConfig> for ChainLimits {
    fn from(config: &LimitsConfig) -> Self {
        let limits = ChainLimits::default()
            .with_caps(config.max_iterations, config.max_depth)
            .with_invocation_timeout(Duration::from_secs(config.invocation_timeout_secs))
            .with_loop_detection(config.loop_window, config.loop_threshold);

        match config.chain_timeout_secs {
            Some(secs) => limits.with_chain_timeout(Duration::from_secs(secs)),
            None => limits,
        }
    }
}

/// `[approval]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApprovalConfig {
    /// Tools whose invocations need a human decision
    pub sensitive_tools: Vec<String>,
}

impl Default for ApprovalConfig {
    fn default() -> Self {
        Self {
            sensitive_tools: DEFAULT_SENSITIVE_TOOLS
                .iter()
                .map(|name| (*name).to_string())
                .collect(),
        }
    }
}

impl From<&ApprovalConfig> for ApprovalPolicy {
    fn from(config: &ApprovalConfig) -> Self {
        ApprovalPolicy::new(config.sensitive_tools.iter().cloned())
    }
}

/// `[extraction]` section.
///
/// Rules are added on top of the built-in strategies and replace them for
/// the same tool.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Tool name to forwarding rule
    pub forward: BTreeMap<String, ForwardKey>,
}

impl From<&ExtractionConfig> for ParameterExtractor {
    fn from(config: &ExtractionConfig) -> Self {
        config
            .forward
            .iter()
            .fold(ParameterExtractor::default(), |extractor, (tool, rule)| {
                extractor.with_strategy(tool.clone(), rule.clone())
            })
    }
}
