//! Root supervisor workflow (§4.3): owns the Registry, ActiveRuns, and the tool
//! catalog; dispatches commands (§4.2); exposes queries; spawns planned-agent
//! children and tracks their terminal status.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::command::{Command, CommandEnvelope, SeenCommands};
use crate::engine::WorkflowEngine;
use crate::error::CommandError;
use crate::history::HistoryTracker;
use crate::llm::LlmClient;
use crate::planned_agent::{self, PlanInput};
use crate::registry::{AgentInfo, Blueprint, Run, RunStatus};
use crate::tools::{ToolDef, ToolRegistry};

/// Read-only projection of supervisor state (§4.2 `get_state`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RootStateSnapshot {
    pub registry: HashMap<String, AgentInfo>,
    pub active_runs: HashMap<String, Run>,
    pub tools: HashMap<String, ToolDef>,
}

const SEEN_COMMANDS_CAPACITY: usize = 10_000;

/// The supervisor's live state, id-keyed maps it alone mutates (§3 ownership rule).
pub struct RootSupervisor {
    registry: DashMap<String, AgentInfo>,
    active_runs: Arc<DashMap<String, Run>>,
    tools: Arc<ToolRegistry>,
    seen: SeenCommands,
    engine: Arc<WorkflowEngine>,
    llm: Arc<dyn LlmClient>,
    history: Arc<HistoryTracker>,
}

impl RootSupervisor {
    pub fn new(engine: Arc<WorkflowEngine>, tools: Arc<ToolRegistry>, llm: Arc<dyn LlmClient>) -> Self {
        Self::with_history_threshold(
            engine,
            tools,
            llm,
            crate::history::DEFAULT_HISTORY_THRESHOLD_BYTES,
        )
    }

    /// Same as `new`, but with an explicit history-compaction threshold — used by
    /// tests to drive `should_compact` without generating megabytes of commands.
    pub fn with_history_threshold(
        engine: Arc<WorkflowEngine>,
        tools: Arc<ToolRegistry>,
        llm: Arc<dyn LlmClient>,
        threshold_bytes: usize,
    ) -> Self {
        Self {
            registry: DashMap::new(),
            active_runs: Arc::new(DashMap::new()),
            tools,
            seen: SeenCommands::new(SEEN_COMMANDS_CAPACITY),
            engine,
            llm,
            history: Arc::new(HistoryTracker::new(threshold_bytes)),
        }
    }

    /// Restores from a prior `continue_as_new` carry-over (§3: SeenCommands
    /// survives restarts; registry/active_runs are carried the same way).
    pub fn restore(
        engine: Arc<WorkflowEngine>,
        tools: Arc<ToolRegistry>,
        llm: Arc<dyn LlmClient>,
        registry: HashMap<String, AgentInfo>,
        active_runs: HashMap<String, Run>,
        seen_cmd_ids: Vec<String>,
    ) -> Self {
        let s = Self::new(engine, tools, llm);
        for (k, v) in registry {
            s.registry.insert(k, v);
        }
        for (k, v) in active_runs {
            s.active_runs.insert(k, v);
        }
        for id in seen_cmd_ids {
            s.seen.check_and_record(&id);
        }
        s
    }

    // ---- Command dispatch (§4.2) ----

    /// Dispatches one command envelope. Always returns without panicking: per §7
    /// propagation policy, command handlers never fail the supervisor. The `Result`
    /// is for the caller's own observability (CLI exit code, test assertions), not
    /// for the supervisor's control flow — a duplicate `cmd_id` is recorded as seen
    /// either way (I1).
    pub fn handle_command(&self, env: CommandEnvelope) -> Result<(), CommandError> {
        let bytes = serde_json::to_vec(&env).map(|v| v.len()).unwrap_or(0);
        self.history.record(bytes);
        if self.seen.check_and_record(&env.cmd_id) {
            tracing::debug!(cmd_id = %env.cmd_id, "duplicate command ignored");
            return Ok(());
        }
        let result = self.dispatch(env.command);
        if let Err(ref e) = result {
            tracing::warn!(error = %e, "command handler reported an error");
        }
        result
    }

    fn dispatch(&self, command: Command) -> Result<(), CommandError> {
        match command {
            Command::CreateAgent { agent_id, blueprint } => self.create_agent(agent_id, blueprint),
            Command::DeleteAgent { agent_id } => self.delete_agent(&agent_id),
            Command::StartAgent { agent_id, input } => self.start_agent(&agent_id, input),
            Command::SignalAgent { run_id, signal, payload } => {
                self.engine.signal(&run_id, &signal, payload);
                Ok(())
            }
            Command::RegisterTool { tool_def_json } => self.register_tool(tool_def_json),
            Command::DeregisterTool { tool_name } => {
                if self.tools.deregister(&tool_name) {
                    Ok(())
                } else {
                    Err(CommandError::NotFound(tool_name))
                }
            }
            Command::StopWorkflow => Err(CommandError::Validation("_stop_workflow".into())),
        }
    }

    /// Parses `tool_def_json` into a [`ToolDef`] and installs it as a catalog-only
    /// descriptor (§4.2 `register_tool`: "Parse to ToolDef; insert into catalog if
    /// name absent"). The wire format cannot carry a concrete `Tool` impl, so a tool
    /// registered this way is listable via `list_tools` but not dispatchable;
    /// native, executable tools are wired at process startup (`lib.rs`).
    fn register_tool(&self, tool_def_json: serde_json::Value) -> Result<(), CommandError> {
        let def: ToolDef = serde_json::from_value(tool_def_json)
            .map_err(|e| CommandError::Validation(e.to_string()))?;
        if !self.tools.register_def(def) {
            tracing::info!("duplicate register_tool ignored");
        }
        Ok(())
    }

    fn create_agent(&self, agent_id: String, blueprint_bytes: Vec<u8>) -> Result<(), CommandError> {
        let blueprint = Blueprint::parse(&blueprint_bytes)?;
        if blueprint.agent_id != agent_id {
            return Err(CommandError::Validation(
                "blueprint agent_id does not match command agent_id".into(),
            ));
        }
        if self.registry.contains_key(&agent_id) {
            tracing::info!(agent_id = %agent_id, "duplicate create_agent ignored");
            return Ok(());
        }
        self.registry.insert(
            agent_id.clone(),
            AgentInfo {
                agent_id,
                version: blueprint.version,
                blueprint_bytes,
                created_at: now_unix(),
            },
        );
        Ok(())
    }

    fn delete_agent(&self, agent_id: &str) -> Result<(), CommandError> {
        let has_live_run = self
            .active_runs
            .iter()
            .any(|r| r.agent_id == agent_id && !r.status.is_terminal());
        if has_live_run {
            return Err(CommandError::PreconditionFailed(format!(
                "agent '{agent_id}' has an active run"
            )));
        }
        match self.registry.remove(agent_id) {
            Some(_) => Ok(()),
            None => Err(CommandError::NotFound(agent_id.to_string())),
        }
    }

    fn start_agent(&self, agent_id: &str, input: serde_json::Value) -> Result<(), CommandError> {
        let info = self
            .registry
            .get(agent_id)
            .ok_or_else(|| CommandError::NotFound(agent_id.to_string()))?;
        let blueprint = Blueprint::parse(&info.blueprint_bytes)?;
        drop(info);

        let run_id = uuid::Uuid::new_v4().to_string();
        self.active_runs.insert(
            run_id.clone(),
            Run {
                run_id: run_id.clone(),
                agent_id: agent_id.to_string(),
                started_at: now_unix(),
                status: RunStatus::Running,
            },
        );

        let plan = input
            .get("plan")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();
        let plan_input = PlanInput {
            plan,
            model: blueprint.llm.model.clone(),
            max_steps: blueprint.budget.max_steps,
        };

        let active_runs = self.active_runs.clone();
        let engine = self.engine.clone();
        let llm = self.llm.clone();
        let tools = self.tools.clone();
        let run_id_for_task = run_id.clone();
        self.engine.spawn_child(run_id.clone(), async move {
            let outcome = planned_agent::run(&engine, &run_id_for_task, plan_input, llm, tools).await;
            let status = match outcome {
                Ok(_) => RunStatus::Completed,
                Err(e) => {
                    tracing::warn!(run_id = %run_id_for_task, error = %e, "planned agent run failed");
                    match e.kind {
                        crate::error::ErrorKind::Cancelled => RunStatus::Cancelled,
                        crate::error::ErrorKind::Timeout => RunStatus::Timeout,
                        _ => RunStatus::Failed,
                    }
                }
            };
            if let Some(mut run) = active_runs.get_mut(&run_id_for_task) {
                run.status = status;
            }
        });
        Ok(())
    }

    // ---- Queries (§4.2) ----

    pub fn get_state(&self) -> RootStateSnapshot {
        RootStateSnapshot {
            registry: self.registry.iter().map(|e| (e.key().clone(), e.value().clone())).collect(),
            active_runs: self.active_runs.iter().map(|e| (e.key().clone(), e.value().clone())).collect(),
            tools: self.tools.list_defs().into_iter().map(|t| (t.name.clone(), t)).collect(),
        }
    }

    pub fn list_agents(&self) -> HashMap<String, AgentInfo> {
        self.registry.iter().map(|e| (e.key().clone(), e.value().clone())).collect()
    }

    pub fn get_agent(&self, agent_id: &str) -> Option<AgentInfo> {
        self.registry.get(agent_id).map(|e| e.value().clone())
    }

    pub fn list_runs(&self) -> HashMap<String, Run> {
        self.active_runs.iter().map(|e| (e.key().clone(), e.value().clone())).collect()
    }

    pub fn list_tools(&self) -> HashMap<String, ToolDef> {
        self.tools.list_defs().into_iter().map(|t| (t.name.clone(), t)).collect()
    }

    // ---- History compaction (§4.3 main loop) ----

    pub fn history(&self) -> &HistoryTracker {
        &self.history
    }

    pub fn seen_snapshot(&self) -> Vec<String> {
        self.seen.snapshot()
    }

    /// Default heartbeat interval driving the supervisor's history-size check (§4.3).
    pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(300);

    /// Snapshots state and resets the history tracker (§4.1 `continue_as_new`). In
    /// this single-process, in-memory supervisor there's no separate process to
    /// restart: "continue as new" means the state this snapshot carries is all that
    /// survives, same as a real continue-as-new carries workflow state across the
    /// history reset.
    pub fn continue_as_new(&self) -> RootStateSnapshot {
        let snapshot = self.get_state();
        tracing::info!(
            history_bytes = self.history.size_bytes(),
            "continuing as new, resetting history"
        );
        self.history.reset();
        snapshot
    }

    /// The supervisor's main loop (§4.3): select over incoming commands and a
    /// heartbeat tick; after each command, check history size and self-compact —
    /// draining any commands queued during the check — before going back to sleep.
    /// Returns once `commands` is closed.
    pub async fn run_loop(self: Arc<Self>, mut commands: tokio::sync::mpsc::Receiver<CommandEnvelope>) {
        let mut heartbeat = tokio::time::interval(Self::HEARTBEAT_INTERVAL);
        loop {
            tokio::select! {
                maybe_cmd = commands.recv() => {
                    match maybe_cmd {
                        Some(env) => {
                            let _ = self.handle_command(env);
                        }
                        None => return,
                    }
                }
                _ = heartbeat.tick() => {}
            }
            if self.history.should_compact() {
                while let Ok(env) = commands.try_recv() {
                    let _ = self.handle_command(env);
                }
                self.continue_as_new();
            }
        }
    }
}

fn now_unix() -> i64 {
    chrono::Utc::now().timestamp()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockLlm;

    fn supervisor() -> Arc<RootSupervisor> {
        let engine = Arc::new(WorkflowEngine::new());
        let tools = Arc::new(ToolRegistry::new());
        let llm = Arc::new(MockLlm::fixed("done"));
        Arc::new(RootSupervisor::new(engine, tools, llm))
    }

    fn blueprint_bytes(agent_id: &str, version: &str) -> Vec<u8> {
        serde_json::json!({
            "agent_id": agent_id,
            "version": version,
            "description": "d",
            "budget": {"max_steps": 10, "max_tokens_total": 10000},
            "llm": {"model": "mock"},
            "graph": {"nodes": [], "revision": 1}
        })
        .to_string()
        .into_bytes()
    }

    fn envelope(cmd: Command, cmd_id: &str) -> CommandEnvelope {
        CommandEnvelope { command: cmd, cmd_id: cmd_id.to_string() }
    }

    /// **Scenario** (S1): create_agent then list_agents contains it; duplicate cmd_id
    /// re-send leaves the list unchanged; delete_agent empties it.
    #[test]
    fn s1_supervisor_lifecycle() {
        let sup = supervisor();
        sup.handle_command(envelope(
            Command::CreateAgent { agent_id: "A".into(), blueprint: blueprint_bytes("A", "1.0.0") },
            "c1",
        ))
        .unwrap();
        assert!(sup.list_agents().contains_key("A"));

        sup.handle_command(envelope(
            Command::CreateAgent { agent_id: "A".into(), blueprint: blueprint_bytes("A", "9.9.9") },
            "c1",
        ))
        .unwrap();
        assert_eq!(sup.get_agent("A").unwrap().version, "1.0.0");

        sup.handle_command(envelope(Command::DeleteAgent { agent_id: "A".into() }, "c2"))
            .unwrap();
        assert!(sup.list_agents().is_empty());
    }

    /// **Scenario** (I3): delete_agent on an agent with a non-terminal run is rejected.
    #[tokio::test]
    async fn i3_no_delete_with_live_run() {
        let sup = supervisor();
        sup.handle_command(envelope(
            Command::CreateAgent { agent_id: "A".into(), blueprint: blueprint_bytes("A", "1.0.0") },
            "c1",
        ))
        .unwrap();
        sup.handle_command(envelope(
            Command::StartAgent { agent_id: "A".into(), input: serde_json::json!({"plan": "1. Say hi."}) },
            "c2",
        ))
        .unwrap();
        let err = sup.dispatch_for_test(Command::DeleteAgent { agent_id: "A".into() });
        assert!(matches!(err, Err(CommandError::PreconditionFailed(_))));
    }

    /// **Scenario**: deregistering an unregistered tool returns NotFound.
    #[test]
    fn deregister_missing_tool_returns_not_found() {
        let sup = supervisor();
        let err = sup.dispatch_for_test(Command::DeregisterTool { tool_name: "nope".into() });
        assert!(matches!(err, Err(CommandError::NotFound(_))));
    }

    /// **Scenario** (§8 round-trip law): register_tool via the command surface makes
    /// the tool show up in list_tools.
    #[test]
    fn register_tool_command_is_visible_via_list_tools() {
        let sup = supervisor();
        let def_json = serde_json::json!({"name": "weather", "description": "looks up weather"});
        sup.handle_command(envelope(
            Command::RegisterTool { tool_def_json: def_json },
            "c1",
        ))
        .unwrap();
        assert!(sup.list_tools().contains_key("weather"));
    }

    /// **Scenario**: a malformed register_tool payload (missing required `name`) is
    /// a ValidationError, not a panic.
    #[test]
    fn register_tool_rejects_malformed_payload() {
        let sup = supervisor();
        let err = sup.dispatch_for_test(Command::RegisterTool {
            tool_def_json: serde_json::json!({"description": "no name"}),
        });
        assert!(matches!(err, Err(CommandError::Validation(_))));
    }

    /// **Scenario** (I4/S6): once recorded command bytes cross a small history
    /// threshold, should_compact is true; continue_as_new resets it and carries
    /// state forward unchanged.
    #[test]
    fn i4_history_compacts_and_carries_state() {
        let engine = Arc::new(WorkflowEngine::new());
        let tools = Arc::new(ToolRegistry::new());
        let llm = Arc::new(MockLlm::fixed("done"));
        let sup = Arc::new(RootSupervisor::with_history_threshold(engine, tools, llm, 64));

        sup.handle_command(envelope(
            Command::CreateAgent { agent_id: "A".into(), blueprint: blueprint_bytes("A", "1.0.0") },
            "c1",
        ))
        .unwrap();
        assert!(sup.history().should_compact());

        let snapshot = sup.continue_as_new();
        assert!(!sup.history().should_compact());
        assert!(snapshot.registry.contains_key("A"));

        sup.handle_command(envelope(
            Command::CreateAgent { agent_id: "B".into(), blueprint: blueprint_bytes("B", "1.0.0") },
            "c2",
        ))
        .unwrap();
        assert!(sup.list_agents().contains_key("A"));
        assert!(sup.list_agents().contains_key("B"));
    }

    impl RootSupervisor {
        fn dispatch_for_test(&self, cmd: Command) -> Result<(), CommandError> {
            self.dispatch(cmd)
        }
    }
}
