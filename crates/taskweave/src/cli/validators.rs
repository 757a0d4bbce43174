//! CLI input validation functions.
//!
//! These validators are used by clap's `value_parser` attribute to reject
//! bad input at parse time.

use crate::domain::TenantId;

/// Validate task ID prefix format.
///
/// Delegates to [`crate::config::validate_prefix`] so the rules live in one place.
pub fn validate_prefix(s: &str) -> Result<String, String> {
    let trimmed = s.trim();
    crate::config::validate_prefix(trimmed).map_err(|e| e.to_string())?;
    Ok(trimmed.to_string())
}

/// Validate a task ID argument: non-empty, no embedded whitespace.
pub fn validate_task_id(s: &str) -> Result<String, String> {
    let s = s.trim();

    if s.is_empty() {
        return Err("Task ID cannot be empty".to_string());
    }

    if s.chars().any(char::is_whitespace) {
        return Err(format!("Invalid task ID '{s}': must not contain whitespace"));
    }

    Ok(s.to_string())
}

/// Validate a tenant argument.
pub fn validate_tenant(s: &str) -> Result<String, String> {
    TenantId::new(s)
        .map(|t| t.as_str().to_string())
        .map_err(|e| e.to_string())
}
