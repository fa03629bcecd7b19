// Configuration validation

use crate::{ConfigError, Result};

/// Implemented by configuration records that can check themselves after loading
pub trait Validate {
    fn validate(&self) -> Result<()>;
}

/// Reusable validation rules
pub struct ConfigValidator;

impl ConfigValidator {
    /// Reject empty (or whitespace-only) strings
    pub fn not_empty(value: &str, field: &str) -> Result<()> {
        if value.trim().is_empty() {
            return Err(ConfigError::ValidationError(format!(
                "{} cannot be empty",
                field
            )));
        }
        Ok(())
    }

    /// Reject file extensions written with a leading dot or a path separator
    pub fn is_bare_extension(value: &str, field: &str) -> Result<()> {
        Self::not_empty(value, field)?;
        if value.starts_with('.') || value.contains(['/', '\\']) {
            return Err(ConfigError::ValidationError(format!(
                "{} must be a bare file extension such as \"html\", got \"{}\"",
                field, value
            )));
        }
        Ok(())
    }

    /// Reject duplicates in a list of keys, comparing case-insensitively
    pub fn unique_keys<'a>(keys: impl IntoIterator<Item = &'a str>, field: &str) -> Result<()> {
        let mut seen = std::collections::HashSet::new();
        for key in keys {
            if !seen.insert(key.to_lowercase()) {
                return Err(ConfigError::ValidationError(format!(
                    "{} contains \"{}\" more than once",
                    field, key
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_empty() {
        assert!(ConfigValidator::not_empty("txt", "key").is_ok());
        assert!(ConfigValidator::not_empty("  ", "key").is_err());
    }

    #[test]
    fn test_bare_extension() {
        assert!(ConfigValidator::is_bare_extension("css", "ext").is_ok());
        assert!(ConfigValidator::is_bare_extension(".css", "ext").is_err());
        assert!(ConfigValidator::is_bare_extension("a/b", "ext").is_err());
    }

    #[test]
    fn test_unique_keys() {
        assert!(ConfigValidator::unique_keys(["a", "b"], "keys").is_ok());

        let err = ConfigValidator::unique_keys(["Txt", "txt"], "extensions").unwrap_err();
        assert!(err.to_string().contains("more than once"));
    }
}
