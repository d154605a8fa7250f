/// Field validators for the enrollment form
///
/// Stateless checks over raw input strings:
/// 1. CPF checksum validation
/// 2. Email shape
/// 3. Phone digit count
/// 4. CEP (postal code) digit count and display formatting
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// Minimum accepted phone digit count (area code + 8-digit landline).
pub const PHONE_DIGITS_MIN: usize = 10;
/// Maximum accepted phone digit count (area code + 9-digit mobile).
pub const PHONE_DIGITS_MAX: usize = 11;

/// Number of digits in a CPF.
pub const CPF_LEN: usize = 11;
/// Number of digits in a CEP.
pub const CEP_LEN: usize = 8;

/// Closed set of value checks a field can be bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidatorKind {
    Cpf,
    Email,
    Phone,
    PostalCode,
}

impl ValidatorKind {
    /// Runs the check this kind stands for.
    pub fn validate(self, value: &str) -> bool {
        match self {
            ValidatorKind::Cpf => validate_cpf(value),
            ValidatorKind::Email => validate_email(value),
            ValidatorKind::Phone => validate_phone(value),
            ValidatorKind::PostalCode => validate_postal_code(value),
        }
    }
}

/// Keeps only ASCII digits: `123.456.789-09` -> `12345678909`.
pub fn digits_only(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Validate a CPF
///
/// Formatting characters are ignored. The number must have 11 digits, must not
/// be a single repeated digit, and both trailing check digits must match the
/// mod-11 weighted sums of the digits before them.
pub fn validate_cpf(raw: &str) -> bool {
    let digits: Vec<u32> = raw.chars().filter_map(|c| c.to_digit(10)).collect();

    if digits.len() != CPF_LEN {
        return false;
    }

    // 000.000.000-00, 111.111.111-11, ... pass the arithmetic but are never issued
    if digits.iter().all(|d| *d == digits[0]) {
        tracing::debug!("Rejected CPF with repeated digits");
        return false;
    }

    if check_digit(&digits[..9]) != digits[9] {
        return false;
    }

    check_digit(&digits[..10]) == digits[10]
}

/// Computes the check digit following `prefix`.
///
/// Weights run from `prefix.len() + 1` down to 2; a remainder of 10 maps to 0.
fn check_digit(prefix: &[u32]) -> u32 {
    let top = prefix.len() as u32 + 1;
    let sum: u32 = prefix
        .iter()
        .enumerate()
        .map(|(i, d)| d * (top - i as u32))
        .sum();

    let remainder = (sum * 10) % 11;
    if remainder >= 10 {
        0
    } else {
        remainder
    }
}

fn email_regex() -> &'static Regex {
    static EMAIL_RE: OnceLock<Regex> = OnceLock::new();
    EMAIL_RE.get_or_init(|| {
        Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is a valid regex")
    })
}

/// Validate email address
///
/// Accepts `local@domain.tld` where no part contains whitespace and neither the
/// local part nor the domain contains another `@`.
pub fn validate_email(raw: &str) -> bool {
    if raw.is_empty() {
        return false;
    }

    email_regex().is_match(&raw.to_lowercase())
}

/// Validate a Brazilian phone number by digit count
///
/// Formatting is ignored; `(11) 98765-4321` and `1133334444` are both accepted.
pub fn validate_phone(raw: &str) -> bool {
    let count = digits_only(raw).len();
    (PHONE_DIGITS_MIN..=PHONE_DIGITS_MAX).contains(&count)
}

/// A CEP is valid when it carries exactly eight digits (`01310-930`).
pub fn validate_postal_code(raw: &str) -> bool {
    digits_only(raw).len() == CEP_LEN
}

/// Formats raw CEP input for display.
///
/// Non-digits are dropped, input is capped at eight digits, and a `-` is
/// inserted after the fifth digit once there are more than five.
pub fn format_postal_code(raw: &str) -> String {
    let digits: String = digits_only(raw).chars().take(CEP_LEN).collect();

    if digits.len() > 5 {
        format!("{}-{}", &digits[..5], &digits[5..])
    } else {
        digits
    }
}
