// crates/claudex-types/src/hook_input.rs
//! Typed stdin payloads for each hook event (§6), replacing the dynamic
//! `input as Record<string, unknown>` shape the REDESIGN FLAGS call out.
//!
//! Each hook binary knows which event it implements from its own identity
//! (it is a distinct `[[bin]]` target), so it deserializes stdin directly
//! into the one variant it expects rather than sniffing a discriminant
//! field the host does not reliably send.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UserPromptSubmitInput {
    pub session_id: String,
    pub cwd: String,
    pub prompt: String,
    #[serde(default)]
    pub transcript_path: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SessionStartInput {
    pub session_id: String,
    pub cwd: String,
    #[serde(default)]
    pub source: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StopInput {
    pub session_id: String,
    pub cwd: String,
    #[serde(default)]
    pub transcript_path: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PreCompactInput {
    pub session_id: String,
    pub cwd: String,
    #[serde(default)]
    pub trigger: Option<String>,
    #[serde(default)]
    pub transcript_path: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PostToolUseInput {
    pub session_id: String,
    pub cwd: String,
    pub tool_name: String,
    pub tool_input: serde_json::Value,
    #[serde(default)]
    pub tool_response: serde_json::Value,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SessionEndInput {
    pub session_id: String,
    pub cwd: String,
    #[serde(default)]
    pub reason: Option<String>,
}

/// Sum type over every hook event, used where a consumer genuinely needs to
/// branch on "which event was this" after the fact (e.g. audit logging).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum HookInput {
    UserPromptSubmit(UserPromptSubmitInput),
    SessionStart(SessionStartInput),
    Stop(StopInput),
    PreCompact(PreCompactInput),
    PostToolUse(PostToolUseInput),
    SessionEnd(SessionEndInput),
}

/// The two recognized hook output shapes (§6): either inject nothing, or
/// inject markdown under `additionalContext`.
#[derive(Debug, Clone, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct HookOutput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hook_specific_output: Option<HookSpecificOutput>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HookSpecificOutput {
    pub hook_event_name: String,
    pub additional_context: String,
}

impl HookOutput {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_context(hook_event_name: impl Into<String>, additional_context: impl Into<String>) -> Self {
        Self {
            hook_specific_output: Some(HookSpecificOutput {
                hook_event_name: hook_event_name.into(),
                additional_context: additional_context.into(),
            }),
        }
    }
}
