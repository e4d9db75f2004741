//! `twin` CLI: drive the root supervisor's command/query surface from the shell.
//!
//! Subcommands mirror §4.2's command table one-to-one. Every run is a fresh
//! in-process supervisor seeded with a mock LLM and the built-in tool catalog —
//! there is no server component (§1 Non-goals: no network-facing surface here).

use std::sync::Arc;

use clap::{Parser, Subcommand};
use kernel::command::{Command, CommandEnvelope};
use kernel::llm::MockLlm;
use kernel::tools::image_generate::{ImageGenerateTool, StubImageGenerator};
use kernel::tools::question_pool::QuestionPoolTool;
use kernel::{RootSupervisor, ToolRegistry, WorkflowEngine};

#[derive(Parser, Debug)]
#[command(name = "twin")]
#[command(about = "Inspect and drive the digital-twin orchestration kernel from the shell")]
struct Args {
    #[command(subcommand)]
    cmd: Command_,

    /// Idempotency key for mutating commands; a random uuid if omitted.
    #[arg(long)]
    cmd_id: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Command_ {
    /// Register a new agent blueprint (JSON file or literal string).
    CreateAgent {
        #[arg(long)]
        agent_id: String,
        #[arg(long)]
        blueprint: String,
    },
    /// Remove an agent; rejected while a non-terminal run references it.
    DeleteAgent {
        #[arg(long)]
        agent_id: String,
    },
    /// Start a planned run. `--plan` is a numbered-step plan text.
    StartAgent {
        #[arg(long)]
        agent_id: String,
        #[arg(long)]
        plan: String,
    },
    /// Deliver a named signal to a running agent.
    SignalAgent {
        #[arg(long)]
        run_id: String,
        #[arg(long)]
        signal: String,
        #[arg(long, default_value = "null")]
        payload: String,
    },
    /// Drop a native tool from the catalog.
    DeregisterTool {
        #[arg(long)]
        tool_name: String,
    },
    /// List registered agents.
    ListAgents,
    /// List active/terminal runs.
    ListRuns,
    /// Show one agent's blueprint metadata.
    GetAgent {
        #[arg(long)]
        agent_id: String,
    },
    /// List the tool catalog.
    ListTools,
}

fn build_supervisor() -> RootSupervisor {
    let tools = Arc::new(ToolRegistry::new());
    tools.register(Arc::new(ImageGenerateTool::new(Arc::new(StubImageGenerator))));
    tools.register(Arc::new(QuestionPoolTool::default_pool()));
    let engine = Arc::new(WorkflowEngine::new());
    let llm = Arc::new(MockLlm::new(Vec::new()));
    RootSupervisor::new(engine, tools, llm)
}

fn read_blueprint(arg: &str) -> Vec<u8> {
    match std::fs::read(arg) {
        Ok(bytes) => bytes,
        Err(_) => arg.as_bytes().to_vec(),
    }
}

#[tokio::main]
async fn main() {
    let _ = env_config::load_and_apply("twin", None);
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let cmd_id = args.cmd_id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    let supervisor = build_supervisor();

    let exit_code = match args.cmd {
        Command_::CreateAgent { agent_id, blueprint } => {
            let blueprint = read_blueprint(&blueprint);
            dispatch(&supervisor, Command::CreateAgent { agent_id, blueprint }, cmd_id)
        }
        Command_::DeleteAgent { agent_id } => {
            dispatch(&supervisor, Command::DeleteAgent { agent_id }, cmd_id)
        }
        Command_::StartAgent { agent_id, plan } => dispatch(
            &supervisor,
            Command::StartAgent { agent_id, input: serde_json::json!({"plan": plan}) },
            cmd_id,
        ),
        Command_::SignalAgent { run_id, signal, payload } => {
            let payload: serde_json::Value = serde_json::from_str(&payload).unwrap_or(serde_json::Value::Null);
            dispatch(&supervisor, Command::SignalAgent { run_id, signal, payload }, cmd_id)
        }
        Command_::DeregisterTool { tool_name } => {
            dispatch(&supervisor, Command::DeregisterTool { tool_name }, cmd_id)
        }
        Command_::ListAgents => {
            print_json(&supervisor.list_agents());
            0
        }
        Command_::ListRuns => {
            print_json(&supervisor.list_runs());
            0
        }
        Command_::GetAgent { agent_id } => match supervisor.get_agent(&agent_id) {
            Some(info) => {
                print_json(&info);
                0
            }
            None => {
                eprintln!("agent not found: {agent_id}");
                1
            }
        },
        Command_::ListTools => {
            print_json(&supervisor.list_tools());
            0
        }
    };

    std::process::exit(exit_code);
}

fn dispatch(supervisor: &RootSupervisor, command: Command, cmd_id: String) -> i32 {
    match supervisor.handle_command(CommandEnvelope { command, cmd_id }) {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("error: {e}");
            1
        }
    }
}

fn print_json(value: &impl serde::Serialize) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{s}"),
        Err(e) => eprintln!("error serializing output: {e}"),
    }
}
