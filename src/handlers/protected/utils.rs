use uuid::Uuid;

use crate::error::ApiError;

/// Parse a path id, answering 400 on garbage
pub fn parse_id(raw: &str, what: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw.trim()).map_err(|_| ApiError::bad_request(format!("Invalid {} id '{}'", what, raw)))
}

/// Syntactic address check: one `@`, a non-empty local part and a dotted domain
pub fn is_valid_email(raw: &str) -> bool {
    let email = raw.trim();
    if email.len() > 254 || email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    let labels: Vec<&str> = domain.split('.').collect();
    labels.len() >= 2 && labels.iter().all(|l| !l.is_empty() && !l.starts_with('-') && !l.ends_with('-'))
}

/// Trimmed value of a required text field
pub fn required_text(field: &str, value: Option<&str>) -> Result<String, ApiError> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(ApiError::invalid_field(field, format!("{} is required", field))),
    }
}

/// Trimmed value of an optional text field; blank becomes `None`
pub fn optional_text(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Lower-cased, validated email
pub fn normalize_email(field: &str, value: &str) -> Result<String, ApiError> {
    let email = value.trim().to_lowercase();
    if is_valid_email(&email) {
        Ok(email)
    } else {
        Err(ApiError::invalid_field(field, format!("'{}' is not a valid email address", value.trim())))
    }
}

/// `limit`/`offset` query values; limit defaults to 100 and is capped at 500
pub fn page(limit: Option<&str>, offset: Option<&str>) -> Result<(usize, usize), ApiError> {
    let limit = match limit {
        Some(raw) => raw
            .trim()
            .parse::<usize>()
            .map_err(|_| ApiError::invalid_field("limit", "limit must be a non-negative integer"))?,
        None => 100,
    };
    let offset = match offset {
        Some(raw) => raw
            .trim()
            .parse::<usize>()
            .map_err(|_| ApiError::invalid_field("offset", "offset must be a non-negative integer"))?,
        None => 0,
    };
    Ok((limit.min(500), offset))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_validation() {
        assert!(is_valid_email("ada@example.com"));
        assert!(is_valid_email("first.last+tag@sub.example.co"));
        assert!(!is_valid_email("ada@"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("ada@localhost"));
        assert!(!is_valid_email("ada@@example.com"));
        assert!(!is_valid_email("ada lovelace@example.com"));
        assert!(!is_valid_email("ada@example..com"));
    }

    #[test]
    fn required_text_rejects_blank() {
        assert_eq!(required_text("name", Some("  Ada ")).unwrap(), "Ada");
        assert!(required_text("name", Some("   ")).is_err());
        assert!(required_text("name", None).is_err());
    }

    #[test]
    fn parse_id_rejects_garbage() {
        assert!(parse_id("not-a-uuid", "user").is_err());
        let id = Uuid::new_v4();
        assert_eq!(parse_id(&id.to_string(), "user").unwrap(), id);
    }

    #[test]
    fn page_defaults_and_caps() {
        assert_eq!(page(None, None).unwrap(), (100, 0));
        assert_eq!(page(Some("10000"), Some("5")).unwrap(), (500, 5));
        assert!(page(Some("-1"), None).is_err());
    }
}
