use crate::utils::error::{Result, SawtoothError};
use url::Url;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

pub fn validate_url(field_name: &str, url_str: &str) -> Result<()> {
    if url_str.is_empty() {
        return Err(SawtoothError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: url_str.to_string(),
            reason: "URL cannot be empty".to_string(),
        });
    }

    match Url::parse(url_str) {
        Ok(url) => match url.scheme() {
            "http" | "https" => Ok(()),
            scheme => Err(SawtoothError::InvalidConfigValueError {
                field: field_name.to_string(),
                value: url_str.to_string(),
                reason: format!("Unsupported URL scheme: {}", scheme),
            }),
        },
        Err(e) => Err(SawtoothError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: url_str.to_string(),
            reason: format!("Invalid URL format: {}", e),
        }),
    }
}

pub fn validate_required_field<'a, T>(field_name: &str, value: &'a Option<T>) -> Result<&'a T> {
    value.as_ref().ok_or_else(|| SawtoothError::MissingConfigError {
        field: field_name.to_string(),
    })
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(SawtoothError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Value cannot be empty or whitespace-only".to_string(),
        });
    }
    Ok(())
}

pub fn validate_range<T: PartialOrd + std::fmt::Display + Copy>(
    field_name: &str,
    value: T,
    min: T,
    max: T,
) -> Result<()> {
    if value < min || value > max {
        return Err(SawtoothError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be between {} and {}", min, max),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_url() {
        assert!(validate_url("telemetry.push_endpoint", "https://example.com").is_ok());
        assert!(validate_url("telemetry.push_endpoint", "http://localhost:9091").is_ok());
        assert!(validate_url("telemetry.push_endpoint", "").is_err());
        assert!(validate_url("telemetry.push_endpoint", "invalid-url").is_err());
        assert!(validate_url("telemetry.push_endpoint", "ftp://example.com").is_err());
    }

    #[test]
    fn test_validate_range() {
        assert!(validate_range("generator.period_millis", 500u64, 1, 3_600_000).is_ok());
        assert!(validate_range("generator.period_millis", 0u64, 1, 3_600_000).is_err());
        assert!(validate_range("generator.batch_size", 0usize, 0, 10).is_ok());
    }

    #[test]
    fn test_validate_required_field() {
        let missing: Option<String> = None;
        let err = validate_required_field("telemetry.push_endpoint", &missing).unwrap_err();
        assert!(matches!(err, SawtoothError::MissingConfigError { .. }));

        let present = Some("http://localhost:9091".to_string());
        assert_eq!(
            validate_required_field("telemetry.push_endpoint", &present).unwrap(),
            "http://localhost:9091"
        );
    }

    #[test]
    fn test_validate_non_empty_string() {
        assert!(validate_non_empty_string("telemetry.service_name", "sawtooth").is_ok());
        assert!(validate_non_empty_string("telemetry.service_name", "   ").is_err());
    }
}
