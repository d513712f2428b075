use crate::error::{DomainError, Result};

const MAX_NAME_LEN: usize = 64;

/// Validate a topology / pipeline / adapter name
///
/// Rules:
/// - Must be non-empty
/// - Must contain only alphanumeric, underscore, hyphen and dot
/// - Must start with an alphanumeric character
/// - Max length 64 characters
pub fn validate_resource_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(DomainError::InvalidResource(
            "Name cannot be empty".to_string(),
        ));
    }

    if name.len() > MAX_NAME_LEN {
        return Err(DomainError::InvalidResource(format!(
            "Name too long: {} chars (max {})",
            name.len(),
            MAX_NAME_LEN
        )));
    }

    if !name.starts_with(|c: char| c.is_ascii_alphanumeric()) {
        return Err(DomainError::InvalidResource(format!(
            "Name {name} must start with a letter or digit"
        )));
    }

    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.')
    {
        return Err(DomainError::InvalidResource(format!(
            "Name {name} must contain only alphanumeric, underscore, hyphen, and dot"
        )));
    }

    Ok(())
}
