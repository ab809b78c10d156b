//! Launching the external comparison tool.
//!
//! The tool is configured as a single command template in which `{left}`
//! and `{right}` expand to the two staging directories. Rendering is
//! fail-safe: an unknown or unterminated placeholder is an error rather
//! than a silent empty substitution. The rendered line is split with
//! shell-words and executed directly (no shell).

use crate::error::{DirdiffError, Result};
use std::path::Path;
use std::process::Command;
use tracing::{debug, info};

/// Render the tool command and run it on the two staging trees.
///
/// Launch failures are errors; the tool's own exit status is only logged,
/// since comparison tools conventionally use it to signal "differences
/// found".
pub fn launch_tool(template: &str, left: &Path, right: &Path) -> Result<()> {
    let command_line = render_placeholders(template, left, right)?;
    let args = shell_words::split(&command_line).map_err(|e| {
        DirdiffError::ToolError(format!(
            "failed to parse tool command '{command_line}': {e}\n\
             Fix: check for unmatched quotes in the configured tool command."
        ))
    })?;

    let Some((program, rest)) = args.split_first() else {
        return Err(DirdiffError::ToolError(
            "tool command is empty after parsing".to_string(),
        ));
    };

    debug!(command = %command_line, "launching comparison tool");
    let status = Command::new(program).args(rest).status().map_err(|e| {
        DirdiffError::ToolError(format!(
            "failed to launch '{program}': {e}\n\
             Fix: ensure the tool is installed and in PATH."
        ))
    })?;

    if !status.success() {
        info!(%status, "comparison tool exited non-zero");
    }
    Ok(())
}

/// Substitute `{left}`/`{right}` placeholders, shell-quoting the paths.
///
/// `{{` and `}}` render as literal braces.
fn render_placeholders(template: &str, left: &Path, right: &Path) -> Result<String> {
    let mut out = String::with_capacity(template.len() + 64);
    let mut chars = template.char_indices().peekable();

    while let Some((position, ch)) = chars.next() {
        match ch {
            '{' => {
                if matches!(chars.peek(), Some((_, '{'))) {
                    chars.next();
                    out.push('{');
                    continue;
                }
                let mut name = String::new();
                loop {
                    match chars.next() {
                        Some((_, '}')) => break,
                        Some((_, c)) => name.push(c),
                        None => {
                            return Err(DirdiffError::ToolError(format!(
                                "unmatched '{{' at position {position} in tool command"
                            )));
                        }
                    }
                }
                let path = match name.as_str() {
                    "left" => left,
                    "right" => right,
                    "" => {
                        return Err(DirdiffError::ToolError(format!(
                            "empty placeholder at position {position} in tool command"
                        )));
                    }
                    other => {
                        return Err(DirdiffError::ToolError(format!(
                            "unknown placeholder '{{{other}}}' in tool command \
                             (expected {{left}} or {{right}})"
                        )));
                    }
                };
                out.push_str(&shell_words::quote(&path.to_string_lossy()));
            }
            '}' => {
                if matches!(chars.peek(), Some((_, '}'))) {
                    chars.next();
                }
                out.push('}');
            }
            c => out.push(c),
        }
    }

    Ok(out)
}
