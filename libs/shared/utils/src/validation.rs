use std::sync::LazyLock;

use regex::Regex;

const MAX_EMAIL_LENGTH: usize = 254;

static EMAIL_REGEX: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").ok());

static PATIENT_ID_REGEX: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"^[0-9]{13}$").ok());

/// National patient ids are exactly 13 ASCII digits.
pub fn is_valid_patient_id(id: &str) -> bool {
    PATIENT_ID_REGEX.as_ref().is_some_and(|re| re.is_match(id))
}

pub fn is_valid_email(email: &str) -> bool {
    email.len() <= MAX_EMAIL_LENGTH
        && EMAIL_REGEX
            .as_ref()
            .is_some_and(|re| re.is_match(email))
}

/// Optional email fields are valid when absent.
pub fn validate_email(field: &str, email: Option<&str>) -> Result<(), String> {
    match email {
        Some(value) if !is_valid_email(value) => Err(format!("{} '{}' is not a valid email address", field, value)),
        _ => Ok(()),
    }
}

pub fn validate_required(field: &str, value: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("{} must not be empty", field));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn patient_ids_are_thirteen_digits() {
        assert!(is_valid_patient_id("1234567890123"));
        assert!(!is_valid_patient_id("123456789012"));
        assert!(!is_valid_patient_id("12345678901234"));
        assert!(!is_valid_patient_id("12345678901a3"));
        assert!(!is_valid_patient_id("１２３４５６７８９０１２３"));
    }

    #[test]
    fn accepts_ordinary_emails() {
        assert!(is_valid_email("house@princeton-plainsboro.org"));
        assert!(is_valid_email("j.watson+clinic@example.co.uk"));
    }

    #[test]
    fn rejects_malformed_emails() {
        assert!(!is_valid_email("no-at-sign.example.com"));
        assert!(!is_valid_email("trailing@dot."));
        assert!(!is_valid_email(""));
        assert!(!is_valid_email(&format!("{}@example.com", "a".repeat(250))));
    }

    #[test]
    fn optional_email_absent_is_ok() {
        assert!(validate_email("email", None).is_ok());
        assert!(validate_email("email", Some("bad")).is_err());
    }

    #[test]
    fn blank_required_field_is_rejected() {
        assert!(validate_required("name", "   ").is_err());
        assert!(validate_required("name", "Gregory House").is_ok());
    }
}
