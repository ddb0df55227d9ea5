//! Field-level validation rules

use super::field::FieldValue;
use once_cell::sync::Lazy;
use regex::Regex;

static BUSINESS_NAME: Lazy<Regex> = Lazy::new(|| compiled(r"^[a-zA-Z0-9\s.\-]+$"));
static PIN_CODE: Lazy<Regex> = Lazy::new(|| compiled(r"^[1-9][0-9]{5}$"));
static INDIAN_MOBILE: Lazy<Regex> = Lazy::new(|| compiled(r"^[6-9][0-9]{9}$"));
static EMAIL: Lazy<Regex> = Lazy::new(|| compiled(r"^[^\s@]+@[^\s@]+\.[^\s@]+$"));
static GSTIN: Lazy<Regex> =
    Lazy::new(|| compiled(r"^[0-9]{2}[A-Z]{5}[0-9]{4}[A-Z][1-9A-Z]Z[0-9A-Z]$"));
static ACCOUNT_NUMBER: Lazy<Regex> = Lazy::new(|| compiled(r"^[0-9]{9,18}$"));
static IFSC: Lazy<Regex> = Lazy::new(|| compiled(r"^[A-Z]{4}0[A-Z0-9]{6}$"));
static OTP_CODE: Lazy<Regex> = Lazy::new(|| compiled(r"^[0-9]{4}$"));

// Patterns are literals checked by the tests below.
fn compiled(pattern: &str) -> Regex {
    Regex::new(pattern).expect("static validation pattern compiles")
}

/// Named input formats used by the onboarding form
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pattern {
    BusinessName,
    PinCode,
    IndianMobile,
    Email,
    Gstin,
    AccountNumber,
    Ifsc,
    OtpCode,
}

impl Pattern {
    fn regex(self) -> &'static Regex {
        match self {
            Pattern::BusinessName => Lazy::force(&BUSINESS_NAME),
            Pattern::PinCode => Lazy::force(&PIN_CODE),
            Pattern::IndianMobile => Lazy::force(&INDIAN_MOBILE),
            Pattern::Email => Lazy::force(&EMAIL),
            Pattern::Gstin => Lazy::force(&GSTIN),
            Pattern::AccountNumber => Lazy::force(&ACCOUNT_NUMBER),
            Pattern::Ifsc => Lazy::force(&IFSC),
            Pattern::OtpCode => Lazy::force(&OTP_CODE),
        }
    }

    pub fn is_match(self, input: &str) -> bool {
        self.regex().is_match(input)
    }
}

/// Character count a text value must have, with its message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Length {
    Exactly(usize, &'static str),
    AtLeast(usize, &'static str),
}

impl Length {
    fn check(self, text: &str) -> Result<(), &'static str> {
        let count = text.chars().count();
        match self {
            Length::Exactly(expected, message) if count != expected => Err(message),
            Length::AtLeast(min, message) if count < min => Err(message),
            _ => Ok(()),
        }
    }
}

/// Validator attached to a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Rule {
    /// Type checks only
    #[default]
    Any,
    /// Text must contain something other than whitespace
    NonEmpty(&'static str),
    /// Trimmed text must match a pattern
    Matches {
        pattern: Pattern,
        /// Message when the field is blank
        required: &'static str,
        /// Checked before the pattern
        length: Option<Length>,
        /// Message when the pattern does not match
        invalid: &'static str,
    },
    /// At least one option selected
    AtLeastOne(&'static str),
    /// Checkbox must be checked; unchecked is invalid, not a default
    MustBeTrue(&'static str),
}

impl Rule {
    /// Check a value, returning the field's error message on failure
    pub fn check(&self, value: &FieldValue) -> Result<(), &'static str> {
        match *self {
            Rule::Any => Ok(()),
            Rule::NonEmpty(message) => {
                if value.is_blank() {
                    Err(message)
                } else {
                    Ok(())
                }
            }
            Rule::Matches {
                pattern,
                required,
                length,
                invalid,
            } => {
                if value.is_blank() {
                    return Err(required);
                }
                let text = value.as_text().trim();
                if let Some(length) = length {
                    length.check(text)?;
                }
                if pattern.is_match(text) {
                    Ok(())
                } else {
                    Err(invalid)
                }
            }
            Rule::AtLeastOne(message) => {
                if value.as_list().is_empty() {
                    Err(message)
                } else {
                    Ok(())
                }
            }
            Rule::MustBeTrue(message) => {
                if value.as_bool() {
                    Ok(())
                } else {
                    Err(message)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gstin_rule() -> Rule {
        Rule::Matches {
            pattern: Pattern::Gstin,
            required: "GSTIN is required",
            length: Some(Length::Exactly(15, "GSTIN must be 15 characters")),
            invalid: "Enter a valid GSTIN",
        }
    }

    mod patterns {
        use super::*;

        #[test]
        fn test_business_name() {
            assert!(Pattern::BusinessName.is_match("Acme Traders"));
            assert!(Pattern::BusinessName.is_match("A.B-C 2"));
            assert!(!Pattern::BusinessName.is_match("Acme & Sons"));
        }

        #[test]
        fn test_pin_code() {
            assert!(Pattern::PinCode.is_match("411001"));
            assert!(!Pattern::PinCode.is_match("011001"));
            assert!(!Pattern::PinCode.is_match("41100"));
        }

        #[test]
        fn test_indian_mobile() {
            assert!(Pattern::IndianMobile.is_match("9876543210"));
            assert!(Pattern::IndianMobile.is_match("6000000000"));
            assert!(!Pattern::IndianMobile.is_match("5876543210"));
            assert!(!Pattern::IndianMobile.is_match("98765432101"));
        }

        #[test]
        fn test_digits_are_ascii_only() {
            assert!(!Pattern::IndianMobile.is_match("9८७६५४३२१०"));
            assert!(!Pattern::AccountNumber.is_match("१२३४५६७८९०"));
            assert!(!Pattern::OtpCode.is_match("१२३४"));
            assert!(!Pattern::OtpCode.is_match("١٢٣٤"));
        }

        #[test]
        fn test_email() {
            assert!(Pattern::Email.is_match("asha@acme.test"));
            assert!(!Pattern::Email.is_match("asha@acme"));
            assert!(!Pattern::Email.is_match("asha rao@acme.test"));
        }

        #[test]
        fn test_gstin() {
            assert!(Pattern::Gstin.is_match("27AAAAA0000A1Z5"));
            assert!(Pattern::Gstin.is_match("29ABCDE1234F2ZX"));
            assert!(!Pattern::Gstin.is_match("27AAAAA0000A1Y5"));
            assert!(!Pattern::Gstin.is_match("27aaaaa0000a1z5"));
        }

        #[test]
        fn test_account_number() {
            assert!(Pattern::AccountNumber.is_match("123456789"));
            assert!(Pattern::AccountNumber.is_match("123456789012345678"));
            assert!(!Pattern::AccountNumber.is_match("12345678"));
            assert!(!Pattern::AccountNumber.is_match("1234567890123456789"));
        }

        #[test]
        fn test_ifsc() {
            assert!(Pattern::Ifsc.is_match("HDFC0001234"));
            assert!(Pattern::Ifsc.is_match("SBIN0ABC123"));
            assert!(!Pattern::Ifsc.is_match("HDFC1001234"));
        }

        #[test]
        fn test_otp_code() {
            assert!(Pattern::OtpCode.is_match("1234"));
            assert!(!Pattern::OtpCode.is_match("123"));
            assert!(!Pattern::OtpCode.is_match("12a4"));
        }
    }

    mod rules {
        use super::*;

        #[test]
        fn test_matches_reports_blank_first() {
            assert_eq!(gstin_rule().check(&FieldValue::Empty), Err("GSTIN is required"));
        }

        #[test]
        fn test_matches_reports_length_before_pattern() {
            assert_eq!(
                gstin_rule().check(&FieldValue::text("27AAAAA")),
                Err("GSTIN must be 15 characters")
            );
            assert_eq!(
                gstin_rule().check(&FieldValue::text("27AAAAA0000A1Y5")),
                Err("Enter a valid GSTIN")
            );
            assert_eq!(gstin_rule().check(&FieldValue::text("27AAAAA0000A1Z5")), Ok(()));
        }

        #[test]
        fn test_matches_ignores_surrounding_whitespace() {
            assert_eq!(gstin_rule().check(&FieldValue::text(" 27AAAAA0000A1Z5 ")), Ok(()));
            assert_eq!(
                gstin_rule().check(&FieldValue::text("   ")),
                Err("GSTIN is required")
            );
        }

        #[test]
        fn test_at_least_length_lets_pattern_judge_longer_input() {
            let rule = Rule::Matches {
                pattern: Pattern::IndianMobile,
                required: "Phone number is required",
                length: Some(Length::AtLeast(10, "Phone number must be at least 10 digits")),
                invalid: "Enter a valid Indian mobile number",
            };
            assert_eq!(
                rule.check(&FieldValue::text("98765")),
                Err("Phone number must be at least 10 digits")
            );
            assert_eq!(
                rule.check(&FieldValue::text("98765432101")),
                Err("Enter a valid Indian mobile number")
            );
            assert_eq!(rule.check(&FieldValue::text("9876543210")), Ok(()));
        }

        #[test]
        fn test_must_be_true_rejects_unchecked() {
            let rule = Rule::MustBeTrue("You must agree to the payment terms");
            assert!(rule.check(&FieldValue::Bool(false)).is_err());
            assert!(rule.check(&FieldValue::Empty).is_err());
            assert!(rule.check(&FieldValue::Bool(true)).is_ok());
        }

        #[test]
        fn test_at_least_one() {
            let rule = Rule::AtLeastOne("Please select at least one business type");
            assert!(rule.check(&FieldValue::List(vec![])).is_err());
            assert!(rule.check(&FieldValue::list(["Reseller"])).is_ok());
        }

        #[test]
        fn test_non_empty_trims() {
            let rule = Rule::NonEmpty("City is required");
            assert_eq!(rule.check(&FieldValue::text("  ")), Err("City is required"));
            assert_eq!(rule.check(&FieldValue::text("Pune")), Ok(()));
        }
    }
}
