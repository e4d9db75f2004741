//! Tool registry: the catalog collaborator of §6 ("register", "get", "execute").
//!
//! Structured the way the teacher splits `tools/trait.rs` (the `Tool` trait) from
//! `tools/mod.rs` (the registry that stores `Arc<dyn Tool>` by name) — one file per
//! concrete tool, a registry that's agnostic to what's inside it.

pub mod image_generate;
pub mod question_pool;

pub use image_generate::ImageGenerateTool;
pub use question_pool::QuestionPoolTool;

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;

use crate::tool_source::{ToolCallContent, ToolCallContext, ToolSourceError, ToolSpec};

/// A single tool invocable by name, with a JSON-schema argument spec.
///
/// **Interaction**: stored in [`ToolRegistry`] by [`Tool::name`]; invoked by the
/// planned-agent step activity and by the friend scheduler (`image-generate`).
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    fn spec(&self) -> ToolSpec;

    async fn call(
        &self,
        args: serde_json::Value,
        ctx: Option<&ToolCallContext>,
    ) -> Result<ToolCallContent, ToolSourceError>;
}

/// Catalog entry as exposed by `list_tools` (§4.2) — a descriptor, not the tool
/// implementation itself. `entrypoint_type` records how the catalog owner dispatches
/// calls for this name; the kernel only ever dispatches `Native` entries (tools
/// registered in-process via [`ToolRegistry::register`]); other entrypoint types are
/// recorded for inspection only, per §1's named-collaborator scoping of
/// per-integration tool code.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntrypointType {
    Native,
    Mcp,
}

impl Default for EntrypointType {
    /// `register_tool` (§4.2) carries only a JSON descriptor, never a `Tool` impl,
    /// so a descriptor installed that way can never be `Native`.
    fn default() -> Self {
        EntrypointType::Mcp
    }
}

/// A tool descriptor installed in the catalog (§3 `ToolDef`).
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ToolDef {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub parameters_schema: serde_json::Value,
    #[serde(default)]
    pub entrypoint_type: EntrypointType,
}

impl ToolDef {
    pub fn native(spec: &ToolSpec) -> Self {
        Self {
            name: spec.name.clone(),
            description: spec.description.clone().unwrap_or_default(),
            parameters_schema: spec.input_schema.clone(),
            entrypoint_type: EntrypointType::Native,
        }
    }
}

/// In-process tool catalog: register/deregister/get/execute by name (§6).
///
/// Names are catalog-wide unique across both maps below: `register`/`register_def`
/// silently ignores (log, don't fail) a duplicate name, matching the supervisor
/// command-handler propagation policy (§7).
pub struct ToolRegistry {
    /// Tools with a concrete `Tool` impl, wired at process startup — these are the
    /// only entries `execute` can actually dispatch.
    tools: DashMap<String, Arc<dyn Tool>>,
    /// Catalog-only descriptors installed via the `register_tool` command (§4.2):
    /// the wire format carries a `ToolDef`, never a `Tool` impl, so these are
    /// listable but not executable from the kernel.
    defs: DashMap<String, ToolDef>,
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: DashMap::new(),
            defs: DashMap::new(),
        }
    }

    fn name_taken(&self, name: &str) -> bool {
        self.tools.contains_key(name) || self.defs.contains_key(name)
    }

    /// Registers a native tool. Returns `false` (no-op) if the name is already taken.
    pub fn register(&self, tool: Arc<dyn Tool>) -> bool {
        let name = tool.name().to_string();
        if self.name_taken(&name) {
            tracing::warn!(tool = %name, "duplicate tool registration ignored");
            return false;
        }
        self.tools.insert(name, tool);
        true
    }

    /// Installs a bare descriptor with no backing `Tool` impl (§4.2 `register_tool`:
    /// "Parse to ToolDef; insert into catalog if name absent"). Returns `false`
    /// (no-op) if the name is already taken by either map.
    pub fn register_def(&self, def: ToolDef) -> bool {
        if self.name_taken(&def.name) {
            tracing::warn!(tool = %def.name, "duplicate tool registration ignored");
            return false;
        }
        self.defs.insert(def.name.clone(), def);
        true
    }

    pub fn deregister(&self, name: &str) -> bool {
        let removed_tool = self.tools.remove(name).is_some();
        let removed_def = self.defs.remove(name).is_some();
        removed_tool || removed_def
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).map(|t| t.value().clone())
    }

    pub fn list_defs(&self) -> Vec<ToolDef> {
        self.tools
            .iter()
            .map(|entry| ToolDef::native(&entry.value().spec()))
            .chain(self.defs.iter().map(|entry| entry.value().clone()))
            .collect()
    }

    pub async fn execute(
        &self,
        name: &str,
        args: serde_json::Value,
        ctx: Option<&ToolCallContext>,
    ) -> Result<ToolCallContent, ToolSourceError> {
        match self.get(name) {
            Some(tool) => tool.call(args, ctx).await,
            None if self.defs.contains_key(name) => Err(ToolSourceError::Transport(format!(
                "tool '{name}' is catalog-only, no native executor registered"
            ))),
            None => Err(ToolSourceError::NotFound(name.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }

        fn spec(&self) -> ToolSpec {
            ToolSpec {
                name: "echo".into(),
                description: Some("echoes input".into()),
                input_schema: serde_json::json!({}),
            }
        }

        async fn call(
            &self,
            args: serde_json::Value,
            _ctx: Option<&ToolCallContext>,
        ) -> Result<ToolCallContent, ToolSourceError> {
            Ok(ToolCallContent::text(args.to_string()))
        }
    }

    /// **Scenario**: register then execute returns the tool's output.
    #[tokio::test]
    async fn register_then_execute_round_trips() {
        let registry = ToolRegistry::new();
        assert!(registry.register(Arc::new(EchoTool)));
        let result = registry
            .execute("echo", serde_json::json!({"x": 1}), None)
            .await
            .unwrap();
        assert_eq!(result.text, "{\"x\":1}");
    }

    /// **Scenario**: duplicate registration is a no-op, first registration wins.
    #[tokio::test]
    async fn duplicate_registration_is_noop() {
        let registry = ToolRegistry::new();
        assert!(registry.register(Arc::new(EchoTool)));
        assert!(!registry.register(Arc::new(EchoTool)));
        assert_eq!(registry.list_defs().len(), 1);
    }

    /// **Scenario**: deregister then list_defs omits the tool (round-trip law, §8).
    #[tokio::test]
    async fn deregister_removes_from_catalog() {
        let registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool));
        assert!(registry.deregister("echo"));
        assert!(registry.list_defs().is_empty());
    }

    /// **Scenario**: executing an unregistered tool returns NotFound.
    #[tokio::test]
    async fn execute_unknown_tool_returns_not_found() {
        let registry = ToolRegistry::new();
        let err = registry
            .execute("missing", serde_json::json!({}), None)
            .await
            .unwrap_err();
        assert!(matches!(err, ToolSourceError::NotFound(_)));
    }

    /// **Scenario** (§8 round-trip law): a bare descriptor installed via
    /// `register_def` shows up in `list_defs`, but `execute` on it fails with a
    /// transport error rather than NotFound, since there's no executor behind it.
    #[tokio::test]
    async fn register_def_is_listed_but_not_executable() {
        let registry = ToolRegistry::new();
        let def = ToolDef {
            name: "weather".into(),
            description: "looks up weather".into(),
            parameters_schema: serde_json::json!({}),
            entrypoint_type: EntrypointType::Mcp,
        };
        assert!(registry.register_def(def));
        assert!(registry.list_defs().iter().any(|d| d.name == "weather"));
        let err = registry
            .execute("weather", serde_json::json!({}), None)
            .await
            .unwrap_err();
        assert!(matches!(err, ToolSourceError::Transport(_)));
    }

    /// **Scenario**: a name already taken by a native tool rejects a `register_def`
    /// with the same name, and vice versa.
    #[tokio::test]
    async fn register_def_respects_native_name_collisions() {
        let registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool));
        let def = ToolDef {
            name: "echo".into(),
            description: String::new(),
            parameters_schema: serde_json::Value::Null,
            entrypoint_type: EntrypointType::Mcp,
        };
        assert!(!registry.register_def(def));
        assert_eq!(registry.list_defs().len(), 1);
    }
}
