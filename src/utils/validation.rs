use crate::utils::error::{DeployError, Result};
use url::Url;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

pub fn validate_url(field_name: &str, url_str: &str) -> Result<()> {
    if url_str.is_empty() {
        return Err(DeployError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: url_str.to_string(),
            reason: "URL cannot be empty".to_string(),
        });
    }

    match Url::parse(url_str) {
        Ok(url) => match url.scheme() {
            "http" | "https" => Ok(()),
            scheme => Err(DeployError::InvalidConfigValueError {
                field: field_name.to_string(),
                value: url_str.to_string(),
                reason: format!("Unsupported URL scheme: {}", scheme),
            }),
        },
        Err(e) => Err(DeployError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: url_str.to_string(),
            reason: format!("Invalid URL format: {}", e),
        }),
    }
}

pub fn validate_path(field_name: &str, path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(DeployError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path cannot be empty".to_string(),
        });
    }

    if path.contains('\0') {
        return Err(DeployError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path contains null bytes".to_string(),
        });
    }

    Ok(())
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(DeployError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Value cannot be empty or whitespace-only".to_string(),
        });
    }
    Ok(())
}

pub fn validate_positive_number(field_name: &str, value: u64, min_value: u64) -> Result<()> {
    if value < min_value {
        return Err(DeployError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be at least {}", min_value),
        });
    }
    Ok(())
}

/// Compose service names: the charset docker accepts for project/service
/// identifiers.
pub fn validate_service_name(field_name: &str, name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
        && name
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphanumeric());

    if !valid {
        return Err(DeployError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: name.to_string(),
            reason: "Service names must be alphanumeric plus '-', '_', '.'".to_string(),
        });
    }
    Ok(())
}

pub fn validate_required_field<'a, T>(field_name: &str, value: &'a Option<T>) -> Result<&'a T> {
    value
        .as_ref()
        .ok_or_else(|| DeployError::MissingConfigError {
            field: field_name.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_url() {
        assert!(validate_url("health.url", "https://example.com/health").is_ok());
        assert!(validate_url("health.url", "http://example.com/health").is_ok());
        assert!(validate_url("health.url", "").is_err());
        assert!(validate_url("health.url", "invalid-url").is_err());
        assert!(validate_url("health.url", "ftp://example.com").is_err());
    }

    #[test]
    fn test_validate_service_name() {
        assert!(validate_service_name("activate.services", "app").is_ok());
        assert!(validate_service_name("activate.services", "mysql-8.0").is_ok());
        assert!(validate_service_name("activate.services", "queue_worker").is_ok());
        assert!(validate_service_name("activate.services", "").is_err());
        assert!(validate_service_name("activate.services", "-app").is_err());
        assert!(validate_service_name("activate.services", "app web").is_err());
    }

    #[test]
    fn test_validate_positive_number() {
        assert!(validate_positive_number("health.timeout_seconds", 60, 1).is_ok());
        assert!(validate_positive_number("health.timeout_seconds", 0, 1).is_err());
    }

    #[test]
    fn test_validate_required_field() {
        let present = Some("value".to_string());
        assert!(validate_required_field("field", &present).is_ok());

        let absent: Option<String> = None;
        assert!(validate_required_field("field", &absent).is_err());
    }
}
