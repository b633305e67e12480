//! Response classification for negotiated calls.

use reqwest::StatusCode;

/// What a single upstream response means for the negotiation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// 2xx, including 204.
    Success,
    /// The upstream complained about the shape of a guessed field.
    Advance,
    /// Any other rejection; changing field names will not fix it.
    Terminal,
}

/// Negotiation progress for one logical operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Trying,
    Success,
    TerminalFailure,
}

impl State {
    /// Transition after classifying a response. `Advance` on the last
    /// candidate degrades to `TerminalFailure`.
    #[must_use]
    pub const fn next(self, classification: Classification, has_more: bool) -> Self {
        match (self, classification) {
            (Self::Trying, Classification::Success) => Self::Success,
            (Self::Trying, Classification::Advance) if has_more => Self::Trying,
            (Self::Trying, _) => Self::TerminalFailure,
            (terminal, _) => terminal,
        }
    }
}

/// Keywords identifying a schema-mismatch rejection. A client-error body must
/// mention at least one subject and one requirement keyword.
///
/// A field-shaped rule is stricter: the subject has to appear as a quoted key
/// directly followed by the requirement, as in `"otp" is required`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MismatchRule {
    subjects: Vec<String>,
    requirements: Vec<String>,
    field_shaped: bool,
}

impl Default for MismatchRule {
    fn default() -> Self {
        Self {
            subjects: vec!["sort".to_string()],
            requirements: vec!["must".to_string()],
            field_shaped: false,
        }
    }
}

impl MismatchRule {
    #[must_use]
    pub fn new(subjects: &[&str], requirements: &[&str]) -> Self {
        Self {
            subjects: lowercase(subjects),
            requirements: lowercase(requirements),
            field_shaped: false,
        }
    }

    /// Only match quoted field keys immediately followed by a requirement.
    #[must_use]
    pub const fn field_shaped(mut self) -> Self {
        self.field_shaped = true;
        self
    }

    #[must_use]
    pub fn with_subjects(mut self, subjects: &[&str]) -> Self {
        self.subjects.extend(lowercase(subjects));
        self
    }

    #[must_use]
    pub fn with_requirements(mut self, requirements: &[&str]) -> Self {
        self.requirements.extend(lowercase(requirements));
        self
    }

    /// Rule used for OTP verification, where the guessed fields are the code
    /// and the session key. A wrong or expired code must stay terminal, so
    /// only complaints about a named key advance.
    #[must_use]
    pub fn verify_otp() -> Self {
        Self::new(
            &[
                "otp",
                "code",
                "otp_code",
                "otpcode",
                "token",
                "session_id",
                "sessionid",
            ],
            &["is required", "is not allowed", "must be"],
        )
        .field_shaped()
    }

    #[must_use]
    pub fn matches(&self, body: &str) -> bool {
        let text = body.to_lowercase();
        if self.field_shaped {
            return self.matches_field(&text.replace('\\', ""));
        }
        self.subjects.iter().any(|subject| text.contains(subject.as_str()))
            && self
                .requirements
                .iter()
                .any(|requirement| text.contains(requirement.as_str()))
    }

    fn matches_field(&self, text: &str) -> bool {
        self.subjects.iter().any(|subject| {
            ['"', '\'', '`'].iter().any(|quote| {
                let key = format!("{quote}{subject}{quote} ");
                text.match_indices(key.as_str()).any(|(at, _)| {
                    let rest = &text[at + key.len()..];
                    self.requirements
                        .iter()
                        .any(|requirement| rest.starts_with(requirement.as_str()))
                })
            })
        })
    }
}

fn lowercase(words: &[&str]) -> Vec<String> {
    words.iter().map(|word| word.to_lowercase()).collect()
}

/// Classify one upstream response from its status and raw body text.
#[must_use]
pub fn classify(status: StatusCode, body: &str, rule: &MismatchRule) -> Classification {
    if status.is_success() {
        return Classification::Success;
    }
    // A wrong encoding guess; the next variant may use another one.
    if status == StatusCode::UNSUPPORTED_MEDIA_TYPE {
        return Classification::Advance;
    }
    if status.is_client_error() && rule.matches(body) {
        return Classification::Advance;
    }
    Classification::Terminal
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_range_and_no_content() {
        let rule = MismatchRule::default();
        assert_eq!(classify(StatusCode::OK, "", &rule), Classification::Success);
        assert_eq!(classify(StatusCode::CREATED, "{}", &rule), Classification::Success);
        assert_eq!(
            classify(StatusCode::NO_CONTENT, "", &rule),
            Classification::Success
        );
    }

    #[test]
    fn sort_complaint_advances() {
        let rule = MismatchRule::default();
        let body = r#"{"message":"\"sort\" must be an array"}"#;
        assert_eq!(
            classify(StatusCode::BAD_REQUEST, body, &rule),
            Classification::Advance
        );
        assert_eq!(
            classify(StatusCode::UNPROCESSABLE_ENTITY, "SORT MUST be valid", &rule),
            Classification::Advance
        );
    }

    #[test]
    fn both_keywords_are_required() {
        let rule = MismatchRule::default();
        assert_eq!(
            classify(StatusCode::BAD_REQUEST, "sort is wrong", &rule),
            Classification::Terminal
        );
        assert_eq!(
            classify(StatusCode::BAD_REQUEST, "limit must be a number", &rule),
            Classification::Terminal
        );
    }

    #[test]
    fn non_client_errors_are_terminal() {
        let rule = MismatchRule::default();
        assert_eq!(
            classify(StatusCode::UNAUTHORIZED, "unauthorized", &rule),
            Classification::Terminal
        );
        assert_eq!(
            classify(StatusCode::INTERNAL_SERVER_ERROR, "sort must be an array", &rule),
            Classification::Terminal
        );
        assert_eq!(
            classify(StatusCode::NOT_FOUND, "", &rule),
            Classification::Terminal
        );
    }

    #[test]
    fn unsupported_media_type_advances() {
        assert_eq!(
            classify(
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
                "",
                &MismatchRule::default()
            ),
            Classification::Advance
        );
    }

    #[test]
    fn verify_rule_recognises_field_complaints() {
        let rule = MismatchRule::verify_otp();
        assert!(rule.matches(r#"{"message":"\"otp\" is required"}"#));
        assert!(rule.matches(r#"{"error":"\"code\" is not allowed"}"#));
        assert!(rule.matches(r#"{"error":"'session_id' must be a string"}"#));
        assert!(!rule.matches(r#"{"error":"invalid otp"}"#));
    }

    #[test]
    fn verify_rule_keeps_wrong_codes_terminal() {
        let rule = MismatchRule::verify_otp();
        for body in [
            r#"{"message":"Invalid OTP: 6 digit code expected"}"#,
            r#"{"message":"OTP is required to be fresh, session expired"}"#,
            r#"{"message":"token must be refreshed"}"#,
            r#"{"message":"\"otp\" has expired"}"#,
        ] {
            assert_eq!(
                classify(StatusCode::BAD_REQUEST, body, &rule),
                Classification::Terminal,
                "{body}"
            );
        }
    }

    #[test]
    fn state_transitions() {
        assert_eq!(
            State::Trying.next(Classification::Success, true),
            State::Success
        );
        assert_eq!(
            State::Trying.next(Classification::Advance, true),
            State::Trying
        );
        assert_eq!(
            State::Trying.next(Classification::Advance, false),
            State::TerminalFailure
        );
        assert_eq!(
            State::Trying.next(Classification::Terminal, true),
            State::TerminalFailure
        );
        assert_eq!(
            State::Success.next(Classification::Terminal, true),
            State::Success
        );
    }
}
