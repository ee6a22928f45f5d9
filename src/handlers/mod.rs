pub mod auth;
pub mod projects;
pub mod tasks;
pub mod teams;
pub mod users;

use std::collections::HashMap;

use crate::error::ApiError;

/// Reject a payload when any named required field is blank.
pub(crate) fn require_fields(fields: &[(&str, &str)]) -> Result<(), ApiError> {
    let mut field_errors = HashMap::new();
    for (name, value) in fields {
        if value.trim().is_empty() {
            field_errors.insert((*name).to_string(), "This field is required".to_string());
        }
    }

    if field_errors.is_empty() {
        Ok(())
    } else {
        Err(ApiError::validation_error("Missing required fields", Some(field_errors)))
    }
}

/// Shallow shape check; real validation happens when the address is used.
pub(crate) fn require_email(email: &str) -> Result<(), ApiError> {
    if email.contains('@') && !email.starts_with('@') && !email.ends_with('@') {
        Ok(())
    } else {
        let mut field_errors = HashMap::new();
        field_errors.insert("email".to_string(), "Invalid email address".to_string());
        Err(ApiError::validation_error("Invalid field format", Some(field_errors)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn require_fields_reports_each_blank_field() {
        let err = require_fields(&[("username", ""), ("email", "a@b.c"), ("password", "  ")])
            .unwrap_err();
        let body = err.to_json();
        assert_eq!(body["field_errors"]["username"], "This field is required");
        assert_eq!(body["field_errors"]["password"], "This field is required");
        assert!(body["field_errors"].get("email").is_none());
    }

    #[test]
    fn require_email_accepts_plausible_addresses() {
        assert!(require_email("alice@example.com").is_ok());
        assert!(require_email("nope").is_err());
        assert!(require_email("@example.com").is_err());
    }
}
