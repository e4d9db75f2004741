//! Planned agent workflow (§4.4): executes a numbered plan against a tool set, one
//! step at a time, each step a signalled suspension point.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::activity::{execute_activity, ActivityOptions};
use crate::engine::WorkflowEngine;
use crate::error::ActivityError;
use crate::llm::LlmClient;
use crate::message::Message;
use crate::tools::ToolRegistry;
use crate::workflow::WorkflowContext;

/// Parsed plan input, as accepted directly (`{plan, tool_names?, model, max_steps}`)
/// or derived from a blueprint by the supervisor (§4.4).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanInput {
    pub plan: String,
    pub model: String,
    pub max_steps: u32,
}

/// One entry in `PlanState.history` (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum HistoryEntry {
    Plan { steps: usize },
    StepStart { step_index: u32, body: String },
    ToolCall { name: String, arguments: serde_json::Value },
    ToolResult { name: String, text: String },
    Observation { text: String },
    Error { message: String },
    Final { output: String },
}

/// State of one planned-agent run (§3 `PlanState`), exposed via `get_state`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanState {
    pub plan_text: String,
    pub current_step: u32,
    pub max_steps: u32,
    pub model: String,
    pub history: Vec<HistoryEntry>,
    pub output: Option<String>,
    pub signals_pending: Vec<serde_json::Value>,
}

impl PlanState {
    fn new(input: &PlanInput) -> Self {
        Self {
            plan_text: input.plan.clone(),
            current_step: 0,
            max_steps: input.max_steps,
            model: input.model.clone(),
            history: Vec::new(),
            output: None,
            signals_pending: Vec::new(),
        }
    }
}

/// Parses a plan into ordered step bodies. A step boundary is a line whose
/// trimmed start matches `<digit>+.`; the rest of the line (trimmed) is the step
/// body (§4.4 step 1, a permissive parser).
pub fn parse_plan(plan: &str) -> Vec<String> {
    let mut steps = Vec::new();
    for line in plan.lines() {
        let trimmed = line.trim();
        let digits: String = trimmed.chars().take_while(|c| c.is_ascii_digit()).collect();
        if !digits.is_empty() {
            if let Some(rest) = trimmed.strip_prefix(&digits) {
                if let Some(body) = rest.strip_prefix('.') {
                    steps.push(body.trim().to_string());
                }
            }
        }
    }
    steps
}

/// One step's outcome, as returned by the agent-step activity (§4.4 step 2b).
struct StepResult {
    observation: String,
    tool_calls: Vec<(String, serde_json::Value, String)>,
    done: bool,
}

/// The agent-step activity: one LLM completion, zero or more tool invocations.
async fn agent_step_activity(
    step_body: &str,
    signals_pending: &[serde_json::Value],
    is_last_step: bool,
    llm: &Arc<dyn LlmClient>,
    tools: &Arc<ToolRegistry>,
    model: &str,
) -> Result<StepResult, ActivityError> {
    let mut messages = vec![Message::system(
        "Execute the given plan step. Call tools as needed, then report an observation.",
    )];
    if !signals_pending.is_empty() {
        messages.push(Message::system(format!(
            "Pending signals: {}",
            serde_json::Value::Array(signals_pending.to_vec())
        )));
    }
    messages.push(Message::user(step_body));

    let tool_specs: Vec<_> = tools.list_defs().into_iter().map(|d| crate::tool_source::ToolSpec {
        name: d.name,
        description: Some(d.description),
        input_schema: d.parameters_schema,
    }).collect();

    let response = llm
        .complete(&messages, Some(&tool_specs), model)
        .await
        .map_err(|e| ActivityError::transient(e.to_string()))?;

    let mut tool_calls = Vec::new();
    for call in &response.tool_calls {
        let result = tools.execute(&call.name, call.arguments.clone(), None).await;
        let text = match result {
            Ok(content) => content.text,
            Err(e) => format!("error: {e}"),
        };
        tool_calls.push((call.name.clone(), call.arguments.clone(), text));
    }

    // The model's own completion decision ends the plan early; the last parsed
    // step is a fallback so a plan the model never explicitly finishes still
    // terminates (§4.4 step 2b).
    Ok(StepResult {
        observation: response.content,
        tool_calls,
        done: response.done || is_last_step,
    })
}

/// Runs the planned-agent workflow to completion. Returns the final `PlanState` on
/// success, or an `ActivityError` carrying the terminal-outcome kind on failure
/// (`Cancelled`/`Timeout`/`Permanent` map to `CANCELLED`/`TIMEOUT`/`FAILED` at the
/// supervisor, per §4.3's per-Run state machine).
pub async fn run(
    engine: &Arc<WorkflowEngine>,
    run_id: &str,
    input: PlanInput,
    llm: Arc<dyn LlmClient>,
    tools: Arc<ToolRegistry>,
) -> Result<PlanState, ActivityError> {
    let ctx = WorkflowContext::new(run_id, engine.signals.clone(), Arc::new(crate::history::HistoryTracker::with_default_threshold()));
    let mut state = PlanState::new(&input);
    let steps = parse_plan(&input.plan);
    push_history(&ctx, &mut state, HistoryEntry::Plan { steps: steps.len() });

    let opts = ActivityOptions::agent_default();

    for (idx, body) in steps.iter().enumerate() {
        if state.current_step >= state.max_steps {
            push_history(&ctx, &mut state, HistoryEntry::Error { message: "budget_exceeded".into() });
            return Err(ActivityError::permanent("budget_exceeded"));
        }

        // Consume any signals that arrived since the last step boundary (§4.4 step 3).
        for (_name, payload) in ctx.drain_all_signals() {
            state.signals_pending.push(payload);
        }

        push_history(&ctx, &mut state, HistoryEntry::StepStart {
            step_index: idx as u32,
            body: body.clone(),
        });

        let is_last = idx + 1 == steps.len();
        let pending = state.signals_pending.clone();
        let step_llm = llm.clone();
        let step_tools = tools.clone();
        let step_model = state.model.clone();
        let step_body = body.clone();
        let result = execute_activity("agent-step", &opts, move || {
            let llm = step_llm.clone();
            let tools = step_tools.clone();
            let model = step_model.clone();
            let body = step_body.clone();
            let pending = pending.clone();
            async move { agent_step_activity(&body, &pending, is_last, &llm, &tools, &model).await }
        })
        .await;

        let step = match result {
            Ok(s) => s,
            Err(e) if e.kind == crate::error::ErrorKind::Cancelled => {
                push_history(&ctx, &mut state, HistoryEntry::Error { message: "cancelled".into() });
                return Err(e);
            }
            Err(e) => {
                push_history(&ctx, &mut state, HistoryEntry::Error { message: e.to_string() });
                return Err(e);
            }
        };

        state.signals_pending.clear();
        for (name, args, text) in &step.tool_calls {
            push_history(&ctx, &mut state, HistoryEntry::ToolCall { name: name.clone(), arguments: args.clone() });
            push_history(&ctx, &mut state, HistoryEntry::ToolResult { name: name.clone(), text: text.clone() });
        }
        push_history(&ctx, &mut state, HistoryEntry::Observation { text: step.observation.clone() });

        if step.done {
            state.output = Some(step.observation.clone());
            push_history(&ctx, &mut state, HistoryEntry::Final { output: step.observation });
            state.current_step = (idx + 1) as u32;
            return Ok(state);
        }
        state.current_step = (idx + 1) as u32;
    }

    if state.output.is_none() {
        push_history(&ctx, &mut state, HistoryEntry::Error { message: "budget_exceeded".into() });
        return Err(ActivityError::permanent("budget_exceeded"));
    }
    Ok(state)
}

/// Appends `entry` to `state.history` and records its approximate serialized size
/// against the workflow's history tracker, so `ctx.should_continue_as_new()` is a
/// real signal rather than dead scaffolding (§4.1's history-size policy applies to
/// every durable workflow, not only the root supervisor).
fn push_history(ctx: &WorkflowContext, state: &mut PlanState, entry: HistoryEntry) {
    let bytes = serde_json::to_vec(&entry).map(|v| v.len()).unwrap_or(0);
    ctx.record_history_event(bytes);
    state.history.push(entry);
}

/// Default execution timeout for a planned-agent child workflow (§5).
pub const WORKFLOW_EXECUTION_TIMEOUT: Duration = Duration::from_secs(120);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{LlmResponse, MockLlm};

    /// **Scenario**: numbered-line plan parses into ordered step bodies, ignoring
    /// non-step lines.
    #[test]
    fn parse_plan_extracts_ordered_steps() {
        let plan = "1. Say hello.\n2. Wait 1 second.\n3. Say goodbye.";
        let steps = parse_plan(plan);
        assert_eq!(steps, vec!["Say hello.", "Wait 1 second.", "Say goodbye."]);
    }

    /// **Scenario**: blank lines and non-numbered lines are ignored by the parser.
    #[test]
    fn parse_plan_ignores_non_step_lines() {
        let plan = "Intro text\n1. Do the thing.\n\nNotes: irrelevant";
        let steps = parse_plan(plan);
        assert_eq!(steps, vec!["Do the thing."]);
    }

    /// **Scenario** (S3): a 3-step plan completes with current_step == 3, three
    /// STEP_START entries, and exactly one FINAL.
    #[tokio::test]
    async fn s3_planned_execution_completes_all_steps() {
        let engine = Arc::new(WorkflowEngine::new());
        let llm: Arc<dyn LlmClient> = Arc::new(MockLlm::fixed("ok"));
        let tools = Arc::new(ToolRegistry::new());
        let input = PlanInput {
            plan: "1. Say hello.\n2. Wait 1 second.\n3. Say goodbye.".into(),
            model: "mock".into(),
            max_steps: 10,
        };
        let state = run(&engine, "run-1", input, llm, tools).await.unwrap();
        assert_eq!(state.current_step, 3);
        assert!(state.output.is_some());
        let step_starts = state.history.iter().filter(|e| matches!(e, HistoryEntry::StepStart { .. })).count();
        let finals = state.history.iter().filter(|e| matches!(e, HistoryEntry::Final { .. })).count();
        assert_eq!(step_starts, 3);
        assert_eq!(finals, 1);
    }

    /// **Scenario** (I7): current_step reaching max_steps before done ends in a
    /// budget_exceeded error.
    #[tokio::test]
    async fn i7_budget_exhaustion_is_reported() {
        let engine = Arc::new(WorkflowEngine::new());
        let llm: Arc<dyn LlmClient> = Arc::new(MockLlm::fixed("still working"));
        let tools = Arc::new(ToolRegistry::new());
        let input = PlanInput {
            plan: "1. Step one.\n2. Step two.\n3. Step three.".into(),
            model: "mock".into(),
            max_steps: 1,
        };
        let err = run(&engine, "run-2", input, llm, tools).await.unwrap_err();
        assert_eq!(err.message, "budget_exceeded");
    }

    /// **Scenario**: the model signals `done` on the first of three steps; the plan
    /// ends there rather than running to the structurally-last step.
    #[tokio::test]
    async fn model_signalled_done_ends_plan_early() {
        let engine = Arc::new(WorkflowEngine::new());
        let llm: Arc<dyn LlmClient> = Arc::new(MockLlm::new(vec![LlmResponse::finished("all done already")]));
        let tools = Arc::new(ToolRegistry::new());
        let input = PlanInput {
            plan: "1. Step one.\n2. Step two.\n3. Step three.".into(),
            model: "mock".into(),
            max_steps: 10,
        };
        let state = run(&engine, "run-3", input, llm, tools).await.unwrap();
        assert_eq!(state.current_step, 1);
        assert_eq!(state.output.as_deref(), Some("all done already"));
    }
}
