//! Approval gate for sensitive tools.
//!
//! `ApprovalPolicy` decides whether an invocation needs a human decision;
//! an `ApprovalHandler` supplies that decision. The chain executor treats a
//! missing handler as a denial.

use crate::chain::outcome::ToolInvocation;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeSet;
use std::fmt;
use tokio::sync::{mpsc, oneshot};

/// Tools that require approval unless configured otherwise.
pub const DEFAULT_SENSITIVE_TOOLS: &[&str] = &[
    "file_write",
    "file_delete",
    "send_email",
    "make_payment",
    "system_command",
    "database_modify",
];

/// The set of tool names whose invocations need human approval.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApprovalPolicy {
    sensitive_tools: BTreeSet<String>,
}

impl Default for ApprovalPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_SENSITIVE_TOOLS.iter().copied())
    }
}

impl ApprovalPolicy {
    /// Creates a policy from a set of tool names.
    #[must_use]
    pub fn new<I, S>(sensitive_tools: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            sensitive_tools: sensitive_tools.into_iter().map(Into::into).collect(),
        }
    }

    /// A policy under which nothing needs approval.
    #[must_use]
    pub fn none() -> Self {
        Self {
            sensitive_tools: BTreeSet::new(),
        }
    }

    /// Adds a sensitive tool name.
    #[must_use]
    pub fn with_tool(mut self, tool_name: impl Into<String>) -> Self {
        self.sensitive_tools.insert(tool_name.into());
        self
    }

    /// Returns true if invoking `tool_name` needs approval. Only the name
    /// is consulted.
    #[must_use]
    pub fn requires_approval(&self, tool_name: &str, _args: &Value) -> bool {
        self.sensitive_tools.contains(tool_name)
    }

    /// Returns the sensitive tool names, sorted.
    pub fn sensitive_tools(&self) -> impl Iterator<Item = &str> {
        self.sensitive_tools.iter().map(String::as_str)
    }
}

/// Supplies human decisions for sensitive invocations.
///
/// # Example
///
/// ```rust
/// use acton_chain::chain::{ApprovalHandler, ToolInvocation};
/// use async_trait::async_trait;
///
/// #[derive(Debug)]
/// struct OnlyTmp;
///
/// #[async_trait]
/// impl ApprovalHandler for OnlyTmp {
///     async fn approve(&self, invocation: &ToolInvocation) -> bool {
///         invocation.arguments["path"]
///             .as_str()
///             .is_some_and(|p| p.starts_with("/tmp/"))
///     }
/// }
/// ```
#[async_trait]
pub trait ApprovalHandler: Send + Sync + fmt::Debug {
    /// Returns true to let the invocation run.
    async fn approve(&self, invocation: &ToolInvocation) -> bool;
}

/// Approves everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct AutoApprove;

#[async_trait]
impl ApprovalHandler for AutoApprove {
    async fn approve(&self, _invocation: &ToolInvocation) -> bool {
        true
    }
}

/// Denies everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct AutoDeny;

#[async_trait]
impl ApprovalHandler for AutoDeny {
    async fn approve(&self, _invocation: &ToolInvocation) -> bool {
        false
    }
}

/// Decides with a synchronous closure.
pub struct FnApproval<F> {
    decide: F,
}

impl<F> FnApproval<F>
where
    F: Fn(&ToolInvocation) -> bool + Send + Sync,
{
    /// Wraps a closure.
    #[must_use]
    pub fn new(decide: F) -> Self {
        Self { decide }
    }
}

impl<F> fmt::Debug for FnApproval<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnApproval").finish_non_exhaustive()
    }
}

#[async_trait]
impl<F> ApprovalHandler for FnApproval<F>
where
    F: Fn(&ToolInvocation) -> bool + Send + Sync,
{
    async fn approve(&self, invocation: &ToolInvocation) -> bool {
        (self.decide)(invocation)
    }
}

/// A pending decision delivered over a `ChannelApproval`.
///
/// Dropping the request without responding denies the invocation.
#[derive(Debug)]
pub struct ApprovalRequest {
    /// The invocation awaiting a decision
    pub invocation: ToolInvocation,
    reply: oneshot::Sender<bool>,
}

impl ApprovalRequest {
    /// Sends a decision.
    pub fn respond(self, approved: bool) {
        // The chain may have been cancelled and stopped listening.
        let _ = self.reply.send(approved);
    }

    /// Approves the invocation.
    pub fn approve(self) {
        self.respond(true);
    }

    /// Denies the invocation.
    pub fn deny(self) {
        self.respond(false);
    }
}

/// Forwards decisions to another task over an mpsc channel.
///
/// The receiving side (a UI, a CLI prompt, a test) answers each
/// `ApprovalRequest`. A closed channel or a dropped request is a denial.
#[derive(Debug, Clone)]
pub struct ChannelApproval {
    sender: mpsc::Sender<ApprovalRequest>,
}

impl ChannelApproval {
    /// Creates a handler and the receiver its requests arrive on.
    #[must_use]
    pub fn channel(buffer: usize) -> (Self, mpsc::Receiver<ApprovalRequest>) {
        let (sender, receiver) = mpsc::channel(buffer.max(1));
        (Self { sender }, receiver)
    }

    /// Wraps an existing sender.
    #[must_use]
    pub fn from_sender(sender: mpsc::Sender<ApprovalRequest>) -> Self {
        Self { sender }
    }
}

#[async_trait]
impl ApprovalHandler for ChannelApproval {
    async fn approve(&self, invocation: &ToolInvocation) -> bool {
        let (reply, decision) = oneshot::channel();
        let request = ApprovalRequest {
            invocation: invocation.clone(),
            reply,
        };

        if self.sender.send(request).await.is_err() {
            tracing::warn!(
                tool_name = %invocation.tool_name,
                "Approval channel closed; denying invocation"
            );
            return false;
        }

        decision.await.unwrap_or(false)
    }
}
