use std::path::Path;
use tracing::{info, warn};

use crate::errors::ScribeError;

/// Exact model reply meaning "nothing worth summarizing".
pub const NO_UPDATE_SENTINEL: &str = "No important updates";

/// Max length for values interpolated into the prompt (group names etc.)
pub const MAX_FIELD_LEN: usize = 200;

/// Used when no system prompt file is available.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a meeting-minutes assistant for group chats. \
Read the conversation and write concise minutes: decisions, action items with owners, \
open questions and key information shared in images or files. \
Attribute points to participants by name. Output only the minutes. \
If nothing in the conversation is worth recording, reply exactly: No important updates";

/// Remove control characters and hard-truncate for internal use
pub fn sanitize_field(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_control())
        .take(MAX_FIELD_LEN)
        .collect()
}

/// Reads the system prompt from `path`, falling back to
/// [`DEFAULT_SYSTEM_PROMPT`] if the file does not exist.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read, or is empty.
pub fn load_system_prompt(path: &Path) -> Result<String, ScribeError> {
    if !path.exists() {
        warn!(
            "System prompt file {} not found, using built-in prompt",
            path.display()
        );
        return Ok(DEFAULT_SYSTEM_PROMPT.to_string());
    }

    let prompt = std::fs::read_to_string(path)?.trim().to_string();
    if prompt.is_empty() {
        return Err(ScribeError::ConfigError(format!(
            "System prompt file {} is empty",
            path.display()
        )));
    }

    info!("System prompt loaded ({} chars)", prompt.chars().count());
    Ok(prompt)
}

/// Lead-in text placed before the conversation contents.
#[must_use]
pub fn build_user_prompt(group_key: &str, time_range: &str, message_count: usize) -> String {
    format!(
        "Group: {}\nTime range: {}\nMessage count: {}\n\n\
         Write the minutes for the messages below and output only the result. \
         Messages follow:",
        sanitize_field(group_key),
        sanitize_field(time_range),
        message_count
    )
}

/// A blank reply or the sentinel means there is nothing to deliver.
#[must_use]
pub fn is_no_update(reply: &str) -> bool {
    let trimmed = reply.trim();
    trimmed.is_empty() || trimmed == NO_UPDATE_SENTINEL
}
