use anyhow::{Result, bail};

/// Validate an entity name.
/// Rules: lowercase `[a-z0-9-]`, max 63 chars, no leading/trailing hyphens.
pub fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() {
        bail!("name must not be empty");
    }
    if name.len() > 63 {
        bail!("name '{}' exceeds 63 characters (got {})", name, name.len());
    }
    if name.starts_with('-') || name.ends_with('-') {
        bail!("name '{}' must not start or end with a hyphen", name);
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        bail!(
            "name '{}' must contain only lowercase letters, digits, and hyphens [a-z0-9-]",
            name
        );
    }
    Ok(())
}

/// Validate instance user data: must be empty or well-formed YAML.
pub fn validate_user_data(user_data: &str) -> Result<()> {
    if user_data.is_empty() {
        return Ok(());
    }
    if let Err(e) = serde_yaml::from_str::<serde_yaml::Value>(user_data) {
        bail!("user data is not valid YAML: {}", e);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_names() {
        assert!(validate_name("acme").is_ok());
        assert!(validate_name("web-frontend").is_ok());
        assert!(validate_name("vm-42").is_ok());
        assert!(validate_name("a").is_ok());
    }

    #[test]
    fn invalid_names() {
        assert!(validate_name("").is_err());
        assert!(validate_name("Acme").is_err());
        assert!(validate_name("web_frontend").is_err());
        assert!(validate_name("-leading").is_err());
        assert!(validate_name("trailing-").is_err());
        assert!(validate_name(&"a".repeat(64)).is_err());
    }

    #[test]
    fn user_data_must_be_yaml() {
        assert!(validate_user_data("").is_ok());
        assert!(validate_user_data("packages:\n  - nginx\n").is_ok());
        assert!(validate_user_data("{unclosed").is_err());
    }
}
