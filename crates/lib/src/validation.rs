//! Sign-in / sign-up form rules and the password strength meter.

use once_cell::sync::Lazy;
use regex::Regex;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\S+@\S+\.\S+").expect("email pattern compiles"));

const MIN_PASSWORD_LEN: usize = 8;
const SPECIAL_CHARS: &str = "@$!%*?&";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PasswordCheck {
    MinLength,
    Lowercase,
    Uppercase,
    Digit,
    Special,
}

impl PasswordCheck {
    pub const ALL: [PasswordCheck; 5] = [
        PasswordCheck::MinLength,
        PasswordCheck::Lowercase,
        PasswordCheck::Uppercase,
        PasswordCheck::Digit,
        PasswordCheck::Special,
    ];

    pub fn passes(&self, password: &str) -> bool {
        match self {
            PasswordCheck::MinLength => password.chars().count() >= MIN_PASSWORD_LEN,
            PasswordCheck::Lowercase => password.chars().any(|c| c.is_ascii_lowercase()),
            PasswordCheck::Uppercase => password.chars().any(|c| c.is_ascii_uppercase()),
            PasswordCheck::Digit => password.chars().any(|c| c.is_ascii_digit()),
            PasswordCheck::Special => password.chars().any(|c| SPECIAL_CHARS.contains(c)),
        }
    }

    /// Field message shown when this check fails.
    pub fn message(&self) -> &'static str {
        match self {
            PasswordCheck::MinLength => "Password must be at least 8 characters long",
            PasswordCheck::Lowercase => "Password must contain at least one lowercase letter",
            PasswordCheck::Uppercase => "Password must contain at least one uppercase letter",
            PasswordCheck::Digit => "Password must contain at least one number",
            PasswordCheck::Special => "Password must contain at least one special character",
        }
    }
}

/// Result of every strength check for one password.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordStrength {
    checks: Vec<(PasswordCheck, bool)>,
}

impl PasswordStrength {
    pub fn evaluate(password: &str) -> Self {
        Self {
            checks: PasswordCheck::ALL
                .iter()
                .map(|c| (*c, c.passes(password)))
                .collect(),
        }
    }

    /// Number of passed checks, 0 to 5.
    pub fn score(&self) -> usize {
        self.checks.iter().filter(|(_, ok)| *ok).count()
    }

    pub fn is_strong(&self) -> bool {
        self.score() == PasswordCheck::ALL.len()
    }

    /// Every check with its outcome, in display order.
    pub fn checks(&self) -> &[(PasswordCheck, bool)] {
        &self.checks
    }

    pub fn unmet(&self) -> Vec<PasswordCheck> {
        self.checks
            .iter()
            .filter(|(_, ok)| !*ok)
            .map(|(c, _)| *c)
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignInForm {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignUpForm {
    pub email: String,
    pub username: String,
    pub password: String,
    pub confirm_password: String,
}

/// Per-field messages; None means the field is valid.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormErrors {
    pub email: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub confirm_password: Option<String>,
}

impl FormErrors {
    pub fn is_empty(&self) -> bool {
        self.email.is_none()
            && self.username.is_none()
            && self.password.is_none()
            && self.confirm_password.is_none()
    }

    /// First message in field order, for single-line display.
    pub fn first(&self) -> Option<&str> {
        [
            &self.email,
            &self.username,
            &self.password,
            &self.confirm_password,
        ]
        .into_iter()
        .find_map(|f| f.as_deref())
    }
}

impl std::fmt::Display for FormErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.first().unwrap_or("invalid form"))
    }
}

fn email_error(email: &str) -> Option<String> {
    if email.is_empty() {
        Some("Email is required".to_string())
    } else if !EMAIL_RE.is_match(email) {
        Some("Please enter a valid email address".to_string())
    } else {
        None
    }
}

pub fn validate_password(password: &str) -> Option<String> {
    if password.is_empty() {
        return Some("Password is required".to_string());
    }
    PasswordStrength::evaluate(password)
        .unmet()
        .first()
        .map(|c| c.message().to_string())
}

pub fn validate_sign_in(form: &SignInForm) -> FormErrors {
    FormErrors {
        email: email_error(&form.email),
        password: validate_password(&form.password),
        ..FormErrors::default()
    }
}

pub fn validate_sign_up(form: &SignUpForm) -> FormErrors {
    let username = if form.username.trim().is_empty() {
        Some("Username is required".to_string())
    } else {
        None
    };
    let confirm_password = if form.password != form.confirm_password {
        Some("Passwords do not match".to_string())
    } else {
        None
    };
    FormErrors {
        email: email_error(&form.email),
        username,
        password: validate_password(&form.password),
        confirm_password,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weak_password_reports_every_check() {
        let s = PasswordStrength::evaluate("abc");
        assert_eq!(s.checks().len(), 5);
        assert_eq!(s.score(), 1);
        assert!(!s.is_strong());
        assert_eq!(
            s.unmet(),
            vec![
                PasswordCheck::MinLength,
                PasswordCheck::Uppercase,
                PasswordCheck::Digit,
                PasswordCheck::Special,
            ]
        );

        let s = PasswordStrength::evaluate("Abcd123!");
        assert!(s.checks().iter().all(|(_, ok)| *ok));
        assert_eq!(s.score(), 5);
        assert!(s.is_strong());
    }

    #[test]
    fn length_counts_characters() {
        assert!(PasswordCheck::MinLength.passes("ééééééé1"));
        assert!(!PasswordCheck::MinLength.passes("ééééééé"));
    }

    #[test]
    fn sign_in_messages_follow_rule_order() {
        let errs = validate_sign_in(&SignInForm {
            email: String::new(),
            password: "abc".into(),
        });
        assert_eq!(errs.email.as_deref(), Some("Email is required"));
        assert_eq!(
            errs.password.as_deref(),
            Some("Password must be at least 8 characters long")
        );

        let errs = validate_sign_in(&SignInForm {
            email: "not-an-email".into(),
            password: "abcdefgh".into(),
        });
        assert_eq!(errs.email.as_deref(), Some("Please enter a valid email address"));
        assert_eq!(
            errs.password.as_deref(),
            Some("Password must contain at least one uppercase letter")
        );

        let ok = validate_sign_in(&SignInForm {
            email: "a@b.com".into(),
            password: "Abcd1234!".into(),
        });
        assert!(ok.is_empty());
    }

    #[test]
    fn sign_up_checks_username_and_confirmation() {
        let errs = validate_sign_up(&SignUpForm {
            email: "a@b.com".into(),
            username: "  ".into(),
            password: "Abcd1234!".into(),
            confirm_password: "Abcd1234?".into(),
        });
        assert_eq!(errs.username.as_deref(), Some("Username is required"));
        assert_eq!(errs.confirm_password.as_deref(), Some("Passwords do not match"));
        assert_eq!(errs.first(), Some("Username is required"));
        assert!(errs.email.is_none() && errs.password.is_none());
    }
}
