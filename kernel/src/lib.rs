//! Durable agent orchestration kernel.
//!
//! The substrate (`signal`, `history`, `workflow`, `engine`, `activity`, `retry`)
//! is shared by four workflows: the root supervisor (`supervisor`), the planned
//! agent executor (`planned_agent`), the periodic friend scheduler (`friend`),
//! and the external-thread monitor (`thread_monitor`).

pub mod activity;
pub mod chat;
pub mod command;
pub mod engine;
pub mod error;
pub mod friend;
pub mod history;
pub mod llm;
pub mod memory;
pub mod message;
pub mod model_spec;
pub mod network;
pub mod planned_agent;
pub mod registry;
pub mod retry;
pub mod signal;
pub mod supervisor;
pub mod thread_monitor;
pub mod tool_source;
pub mod tools;
pub mod workflow;

pub use activity::{execute_activity, ActivityOptions};
pub use chat::{ChatPublisher, RecordingChatPublisher};
pub use command::{Command, CommandEnvelope, SeenCommands};
pub use engine::WorkflowEngine;
pub use error::{ActivityError, CommandError, ErrorKind, ToolError, WorkflowError};
pub use friend::{ActivityWeights, FriendDeps};
pub use history::HistoryTracker;
pub use llm::{LlmClient, LlmResponse, MockLlm};
pub use message::{Message, Role};
pub use network::{ExternalThreadStore, NetworkPublisher};
pub use registry::{AgentInfo, Blueprint, Run, RunStatus};
pub use retry::RetryPolicy;
pub use signal::SignalRouter;
pub use supervisor::{RootStateSnapshot, RootSupervisor};
pub use thread_monitor::{ThreadMonitorDeps, ThreadMonitorState};
pub use tools::{Tool, ToolDef, ToolRegistry};
pub use workflow::WorkflowContext;
