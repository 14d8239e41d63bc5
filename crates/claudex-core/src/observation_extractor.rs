// crates/claudex-core/src/observation_extractor.rs
//! Per-tool normalization of `(tool, input, response)` into an `Observation`,
//! or a drop decision (§4.2, component C2).
//!
//! Every handler returns `Ok(None)` to signal "filtered" — not an error.
//! Titles/content are redacted and file paths sanitized before return, so
//! nothing downstream needs to redact an `Observation` again.

use crate::error::ExtractError;
use crate::redactor::{redact_sensitive, sanitize_path};
use claudex_types::{NewObservation, ObservationCategory};
use regex_lite::Regex;
use serde_json::Value;
use std::sync::OnceLock;

const BASH_NOISE_COMMANDS: &[&str] = &[
    "ls", "cd", "pwd", "cat", "head", "tail", "echo", "type", "dir", "cls", "clear", "which",
    "where", "whoami",
];

const CONTENT_WORTHY_EXTENSIONS: &[&str] = &["json", "yaml", "toml", "env", "md"];

/// Context an individual handler needs beyond the raw tool payload.
pub struct ExtractContext<'a> {
    pub session_id: &'a str,
    pub project: Option<&'a str>,
    pub project_root: Option<(&'a str, &'a str)>,
    pub timestamp_epoch_ms: i64,
}

fn new_observation(
    ctx: &ExtractContext<'_>,
    tool_name: &str,
    category: ObservationCategory,
    title: String,
    content: String,
    files_read: Vec<String>,
    files_modified: Vec<String>,
    importance: u8,
) -> NewObservation {
    NewObservation {
        session_id: ctx.session_id.to_string(),
        project: ctx.project.map(str::to_string),
        timestamp_epoch_ms: ctx.timestamp_epoch_ms,
        tool_name: tool_name.to_string(),
        category,
        title: redact_sensitive(&title),
        content: redact_sensitive(&content),
        files_read: files_read
            .into_iter()
            .map(|p| sanitize_path(&p, ctx.project_root))
            .collect(),
        files_modified: files_modified
            .into_iter()
            .map(|p| sanitize_path(&p, ctx.project_root))
            .collect(),
        importance,
    }
}

fn str_field<'a>(input: &'a Value, field: &str) -> Option<&'a str> {
    input.get(field).and_then(Value::as_str)
}

fn extension_of(path: &str) -> Option<&str> {
    path.rsplit_once('.').map(|(_, ext)| ext)
}

fn test_spec_segment_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\.(test|spec)\.[A-Za-z0-9]+$").expect("valid regex"))
}

fn is_content_worthy_extension(path: &str) -> bool {
    match extension_of(path) {
        Some(ext) => {
            CONTENT_WORTHY_EXTENSIONS.contains(&ext) || test_spec_segment_pattern().is_match(path)
        }
        None => false,
    }
}

fn first_n_lines(text: &str, n: usize) -> String {
    text.lines().take(n).collect::<Vec<_>>().join("\n")
}

/// `Read` → discovery, importance 2 (3 for config/test-ish extensions).
pub fn extract_read(ctx: &ExtractContext<'_>, input: &Value, response: &Value) -> Result<Option<NewObservation>, ExtractError> {
    let path = str_field(input, "file_path").ok_or_else(|| ExtractError::MalformedInput {
        tool: "Read".to_string(),
        message: "missing file_path".to_string(),
    })?;
    let importance = if is_content_worthy_extension(path) { 3 } else { 2 };
    let body = response
        .get("content")
        .and_then(Value::as_str)
        .or_else(|| response.as_str())
        .unwrap_or("");
    let content = first_n_lines(body, 8);
    Ok(Some(new_observation(
        ctx,
        "Read",
        ObservationCategory::Discovery,
        format!("Read {path}"),
        content,
        vec![path.to_string()],
        vec![],
        importance,
    )))
}

/// `Edit` → change, importance 3; old/new truncated to 5 lines each.
pub fn extract_edit(ctx: &ExtractContext<'_>, input: &Value) -> Result<Option<NewObservation>, ExtractError> {
    let path = str_field(input, "file_path").ok_or_else(|| ExtractError::MalformedInput {
        tool: "Edit".to_string(),
        message: "missing file_path".to_string(),
    })?;
    let old = str_field(input, "old_string").unwrap_or("");
    let new = str_field(input, "new_string").unwrap_or("");
    let content = format!("- {}\n+ {}", first_n_lines(old, 5), first_n_lines(new, 5));
    Ok(Some(new_observation(
        ctx,
        "Edit",
        ObservationCategory::Change,
        format!("Edit {path}"),
        content,
        vec![],
        vec![path.to_string()],
        3,
    )))
}

/// `Write` → feature, importance 3.
pub fn extract_write(ctx: &ExtractContext<'_>, input: &Value) -> Result<Option<NewObservation>, ExtractError> {
    let path = str_field(input, "file_path").ok_or_else(|| ExtractError::MalformedInput {
        tool: "Write".to_string(),
        message: "missing file_path".to_string(),
    })?;
    let body = str_field(input, "content").unwrap_or("");
    let content = first_n_lines(body, 8);
    Ok(Some(new_observation(
        ctx,
        "Write",
        ObservationCategory::Feature,
        format!("Write {path}"),
        content,
        vec![],
        vec![path.to_string()],
        3,
    )))
}

fn base_command(command: &str) -> &str {
    command
        .split_whitespace()
        .next()
        .map(|token| token.rsplit('/').next().unwrap_or(token))
        .unwrap_or("")
}

/// `Bash` → dropped for pure navigation/inspection noise; otherwise change
/// (or error on non-zero exit).
pub fn extract_bash(ctx: &ExtractContext<'_>, input: &Value, response: &Value) -> Result<Option<NewObservation>, ExtractError> {
    let command = str_field(input, "command").ok_or_else(|| ExtractError::MalformedInput {
        tool: "Bash".to_string(),
        message: "missing command".to_string(),
    })?;
    if BASH_NOISE_COMMANDS.contains(&base_command(command)) {
        return Ok(None);
    }

    let exit_code = response.get("exit_code").and_then(Value::as_i64).unwrap_or(0);
    let stdout = response.get("stdout").and_then(Value::as_str).unwrap_or("");
    let stderr = response.get("stderr").and_then(Value::as_str).unwrap_or("");
    let description = str_field(input, "description");

    let (category, importance) = if exit_code != 0 {
        (ObservationCategory::Error, 4)
    } else {
        (ObservationCategory::Change, 3)
    };

    let mut content = String::new();
    if let Some(desc) = description {
        content.push_str(&format!("[{desc}]\n"));
    }
    content.push_str(&first_n_lines(stdout, 10));
    if exit_code != 0 {
        content.push('\n');
        content.push_str(&first_n_lines(stderr, 3));
    }

    Ok(Some(new_observation(
        ctx,
        "Bash",
        category,
        format!("Bash: {command}"),
        content,
        vec![],
        vec![],
        importance,
    )))
}

/// `Grep` → discovery, importance 2.
pub fn extract_grep(ctx: &ExtractContext<'_>, input: &Value, response: &Value) -> Result<Option<NewObservation>, ExtractError> {
    let pattern = str_field(input, "pattern").ok_or_else(|| ExtractError::MalformedInput {
        tool: "Grep".to_string(),
        message: "missing pattern".to_string(),
    })?;
    let matches: Vec<String> = response
        .get("matches")
        .and_then(Value::as_array)
        .map(|arr| {
            arr.iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default();
    let match_count = matches.len();
    let top_files: Vec<String> = matches.into_iter().take(5).collect();
    let content = format!(
        "pattern: {pattern}\nmatches: {match_count}\nfiles: {}",
        top_files.join(", ")
    );
    Ok(Some(new_observation(
        ctx,
        "Grep",
        ObservationCategory::Discovery,
        format!("Grep: {pattern}"),
        content,
        top_files,
        vec![],
        2,
    )))
}

/// `Glob` → dropped under 3 results; else discovery, importance 2.
pub fn extract_glob(ctx: &ExtractContext<'_>, input: &Value, response: &Value) -> Result<Option<NewObservation>, ExtractError> {
    let pattern = str_field(input, "pattern").unwrap_or("*");
    let results: Vec<String> = response
        .as_array()
        .map(|arr| arr.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
        .unwrap_or_default();
    if results.len() < 3 {
        return Ok(None);
    }
    let content = format!("{} matches for {pattern}", results.len());
    Ok(Some(new_observation(
        ctx,
        "Glob",
        ObservationCategory::Discovery,
        format!("Glob: {pattern}"),
        content,
        results,
        vec![],
        2,
    )))
}

/// `WebFetch`/`WebSearch` → discovery, importance 3.
pub fn extract_web(ctx: &ExtractContext<'_>, tool_name: &str, input: &Value) -> Result<Option<NewObservation>, ExtractError> {
    let subject = str_field(input, "url").or_else(|| str_field(input, "query")).unwrap_or("");
    Ok(Some(new_observation(
        ctx,
        tool_name,
        ObservationCategory::Discovery,
        format!("{tool_name}: {subject}"),
        subject.to_string(),
        vec![],
        vec![],
        3,
    )))
}

/// `Task`/`NotebookEdit` → typed handlers, importance 3.
pub fn extract_task(ctx: &ExtractContext<'_>, input: &Value) -> Result<Option<NewObservation>, ExtractError> {
    let description = str_field(input, "description").unwrap_or("subagent task");
    Ok(Some(new_observation(
        ctx,
        "Task",
        ObservationCategory::Feature,
        format!("Task: {description}"),
        description.to_string(),
        vec![],
        vec![],
        3,
    )))
}

pub fn extract_notebook_edit(ctx: &ExtractContext<'_>, input: &Value) -> Result<Option<NewObservation>, ExtractError> {
    let path = str_field(input, "notebook_path").ok_or_else(|| ExtractError::MalformedInput {
        tool: "NotebookEdit".to_string(),
        message: "missing notebook_path".to_string(),
    })?;
    Ok(Some(new_observation(
        ctx,
        "NotebookEdit",
        ObservationCategory::Feature,
        format!("NotebookEdit {path}"),
        String::new(),
        vec![],
        vec![path.to_string()],
        3,
    )))
}

/// Dispatch by tool name. Unknown tools are filtered, not errors.
pub fn extract(
    ctx: &ExtractContext<'_>,
    tool_name: &str,
    input: &Value,
    response: &Value,
) -> Result<Option<NewObservation>, ExtractError> {
    match tool_name {
        "Read" => extract_read(ctx, input, response),
        "Edit" => extract_edit(ctx, input),
        "Write" => extract_write(ctx, input),
        "Bash" => extract_bash(ctx, input, response),
        "Grep" => extract_grep(ctx, input, response),
        "Glob" => extract_glob(ctx, input, response),
        "WebFetch" | "WebSearch" => extract_web(ctx, tool_name, input),
        "Task" => extract_task(ctx, input),
        "NotebookEdit" => extract_notebook_edit(ctx, input),
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ctx() -> ExtractContext<'static> {
        ExtractContext {
            session_id: "sess-1",
            project: Some("crate-x"),
            project_root: None,
            timestamp_epoch_ms: 1_000,
        }
    }

    #[test]
    fn read_config_extension_gets_importance_three() {
        let input = json!({"file_path": "config.json"});
        let response = json!({"content": "{}"});
        let obs = extract_read(&ctx(), &input, &response).unwrap().unwrap();
        assert_eq!(obs.importance, 3);
        assert_eq!(obs.category, ObservationCategory::Discovery);
    }

    #[test]
    fn read_plain_source_gets_importance_two() {
        let input = json!({"file_path": "main.rs"});
        let response = json!({"content": "fn main() {}"});
        let obs = extract_read(&ctx(), &input, &response).unwrap().unwrap();
        assert_eq!(obs.importance, 2);
    }

    #[test]
    fn bash_noise_command_is_filtered() {
        let input = json!({"command": "ls -la"});
        let response = json!({"exit_code": 0, "stdout": ""});
        let obs = extract_bash(&ctx(), &input, &response).unwrap();
        assert!(obs.is_none());
    }

    #[test]
    fn bash_failure_becomes_error_category() {
        let input = json!({"command": "cargo build"});
        let response = json!({"exit_code": 1, "stdout": "", "stderr": "error[E0000]"});
        let obs = extract_bash(&ctx(), &input, &response).unwrap().unwrap();
        assert_eq!(obs.category, ObservationCategory::Error);
        assert_eq!(obs.importance, 4);
    }

    #[test]
    fn glob_under_three_results_is_filtered() {
        let input = json!({"pattern": "*.rs"});
        let response = json!(["a.rs", "b.rs"]);
        let obs = extract_glob(&ctx(), &input, &response).unwrap();
        assert!(obs.is_none());
    }

    #[test]
    fn glob_three_or_more_results_is_kept() {
        let input = json!({"pattern": "*.rs"});
        let response = json!(["a.rs", "b.rs", "c.rs"]);
        let obs = extract_glob(&ctx(), &input, &response).unwrap().unwrap();
        assert_eq!(obs.category, ObservationCategory::Discovery);
    }

    #[test]
    fn unknown_tool_is_filtered() {
        let obs = extract(&ctx(), "SomeFutureTool", &json!({}), &json!({})).unwrap();
        assert!(obs.is_none());
    }
}
