use super::ApiError;
use crate::models::validate_script_id;

pub fn validate_resource_id(id: &str) -> Result<&str, ApiError> {
    validate_script_id(id).map_err(ApiError::validation)?;
    Ok(id)
}

/// Page numbers are positive integers; absent means `default`.
pub fn validate_page(raw: Option<&str>, default: usize) -> Result<usize, ApiError> {
    let Some(raw) = raw else {
        return Ok(default);
    };

    match raw.trim().parse::<usize>() {
        Ok(page) if page >= 1 => Ok(page),
        _ => Err(ApiError::validation(format!(
            "Invalid page: {}. Page must be a positive integer",
            raw
        ))),
    }
}

pub fn validate_limit(raw: Option<&str>, default: usize, max: usize) -> Result<usize, ApiError> {
    let Some(raw) = raw else {
        return Ok(default);
    };

    match raw.trim().parse::<usize>() {
        Ok(limit) if (1..=max).contains(&limit) => Ok(limit),
        _ => Err(ApiError::validation(format!(
            "Invalid limit: {}. Limit must be between 1 and {}",
            raw, max
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_resource_id() {
        assert!(validate_resource_id("script-001").is_ok());
        assert!(validate_resource_id("a.b_c").is_ok());
        assert!(validate_resource_id("").is_err());
        assert!(validate_resource_id("../etc/passwd").is_err());
        assert!(validate_resource_id(&"a".repeat(129)).is_err());
    }

    #[test]
    fn test_validate_page() {
        assert_eq!(validate_page(None, 1).unwrap(), 1);
        assert_eq!(validate_page(Some("3"), 1).unwrap(), 3);
        assert!(validate_page(Some("0"), 1).is_err());
        assert!(validate_page(Some("-1"), 1).is_err());
        assert!(validate_page(Some("abc"), 1).is_err());
    }

    #[test]
    fn test_validate_limit() {
        assert_eq!(validate_limit(None, 50, 500).unwrap(), 50);
        assert_eq!(validate_limit(Some("10"), 50, 500).unwrap(), 10);
        assert_eq!(validate_limit(Some("500"), 50, 500).unwrap(), 500);
        assert!(validate_limit(Some("501"), 50, 500).is_err());
        assert!(validate_limit(Some("0"), 50, 500).is_err());
    }
}
