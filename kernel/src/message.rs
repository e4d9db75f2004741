//! Message types exchanged with the LLM-completion collaborator (spec §6).
//!
//! Extends the teacher's minimal `System`/`User`/`Assistant` message shape with a
//! `Tool` role, since the planned-agent step activity (§4.4) round-trips tool
//! results back through the same message list the LLM reads.

/// Role of a message in a completion request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// A single message in an ordered conversation passed to `LlmClient::complete`.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    pub fn tool(content: impl Into<String>) -> Self {
        Self {
            role: Role::Tool,
            content: content.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// **Scenario**: each constructor produces the matching role with the given content.
    #[test]
    fn constructors_set_role_and_content() {
        assert!(matches!(Message::system("s").role, Role::System));
        assert_eq!(Message::user("u").content, "u");
        assert!(matches!(Message::tool("t").role, Role::Tool));
    }

    /// **Scenario**: messages round-trip through serde, role included.
    #[test]
    fn message_serde_roundtrip() {
        let msg = Message::assistant("hi");
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"assistant\""));
        let back: Message = serde_json::from_str(&json).unwrap();
        assert_eq!(back.content, "hi");
    }
}
