//! Field normalisation shared by both stores.
//!
//! Every text field is trimmed before storage. A required field that is
//! absent, or blank after trimming, is reported by its wire name.

use crate::error::{HrError, HrResult};

/// Collects per-field problems so one write reports all of them.
#[derive(Debug, Default)]
pub(crate) struct FieldErrors(Vec<String>);

impl FieldErrors {
    pub fn push(&mut self, message: impl Into<String>) {
        self.0.push(message.into());
    }

    pub fn required(&mut self, field: &str) {
        self.push(format!("{field} is required"));
    }

    /// Trimmed value of a required text field, or `None` after recording the
    /// problem.
    pub fn required_text(&mut self, field: &str, value: Option<&str>) -> Option<String> {
        match value.map(str::trim) {
            Some(trimmed) if !trimmed.is_empty() => Some(trimmed.to_string()),
            _ => {
                self.required(field);
                None
            }
        }
    }

    /// For partial updates: absent stays absent, present must be non-blank.
    pub fn changed_text(&mut self, field: &str, value: Option<&str>) -> Option<String> {
        value.and_then(|v| self.required_text(field, Some(v)))
    }

    pub fn email(&mut self, field: &str, value: Option<&str>) -> Option<String> {
        let email = self.required_text(field, value)?.to_lowercase();
        if !email.contains('@') {
            self.push(format!("{field} must be a valid email address"));
            return None;
        }
        Some(email)
    }

    pub fn salary(&mut self, field: &str, value: Option<f64>) -> Option<f64> {
        match value {
            Some(amount) if amount.is_finite() => Some(amount),
            Some(_) => {
                self.push(format!("{field} must be a finite number"));
                None
            }
            None => {
                self.required(field);
                None
            }
        }
    }

    pub fn finish(self) -> HrResult<()> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(HrError::validation(self.0.join("; ")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_and_reports_blank_fields() {
        let mut errors = FieldErrors::default();
        assert_eq!(
            errors.required_text("firstName", Some("  Ana ")),
            Some("Ana".to_string())
        );
        assert_eq!(errors.required_text("lastName", Some("   ")), None);
        assert_eq!(errors.required_text("phone", None), None);
        let err = errors.finish().unwrap_err();
        assert_eq!(err.to_string(), "lastName is required; phone is required");
    }

    #[test]
    fn lower_cases_email() {
        let mut errors = FieldErrors::default();
        assert_eq!(
            errors.email("email", Some(" ANA@X.COM ")),
            Some("ana@x.com".to_string())
        );
        assert_eq!(errors.email("email", Some("not-an-address")), None);
        assert!(errors.finish().is_err());
    }

    #[test]
    fn changed_text_ignores_absent_fields() {
        let mut errors = FieldErrors::default();
        assert_eq!(errors.changed_text("position", None), None);
        assert!(errors.finish().is_ok());
    }

    #[test]
    fn salary_must_be_present_and_finite() {
        let mut errors = FieldErrors::default();
        assert_eq!(errors.salary("salary", Some(50_000.0)), Some(50_000.0));
        assert_eq!(errors.salary("salary", Some(f64::NAN)), None);
        assert_eq!(errors.salary("salary", None), None);
        let err = errors.finish().unwrap_err();
        assert_eq!(
            err.to_string(),
            "salary must be a finite number; salary is required"
        );
    }
}
