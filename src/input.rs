//! Collection of raw text input into [`UserData`].
//!
//! Numbers are parsed leniently: the longest numeric prefix is used and
//! anything unparsable becomes zero. The calculation itself never guards
//! against the resulting degenerate values.

use serde::{Deserialize, Serialize};

use crate::domain::{ActivityLevel, Gender, Goal, UserData};
use crate::error::InputError;

/// Raw form fields as typed by the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FormFields {
    pub age: String,
    pub weight: String,
    pub height: String,
    pub gender: String,
    pub activity_level: String,
    pub goal: String,
}

impl Default for FormFields {
    fn default() -> Self {
        let defaults = UserData::default();
        Self {
            age: defaults.age.to_string(),
            weight: defaults.weight_kg.to_string(),
            height: defaults.height_cm.to_string(),
            gender: defaults.gender.id().to_string(),
            activity_level: defaults.activity_level.id().to_string(),
            goal: defaults.goal.id().to_string(),
        }
    }
}

/// Builds [`UserData`] from raw form fields.
///
/// Numeric fields fall back to zero; unknown choices are rejected.
pub fn collect(fields: &FormFields) -> Result<UserData, InputError> {
    Ok(UserData {
        age: parse_int_or_zero(&fields.age),
        weight_kg: parse_float_or_zero(&fields.weight),
        height_cm: parse_float_or_zero(&fields.height),
        gender: fields.gender.parse::<Gender>()?,
        activity_level: fields.activity_level.parse::<ActivityLevel>()?,
        goal: fields.goal.parse::<Goal>()?,
    })
}

/// Parses a leading integer, returning 0 when there is none.
///
/// Negative and out-of-range values also yield 0, since age cannot be negative.
pub fn parse_int_or_zero(text: &str) -> u32 {
    let text = text.trim_start();
    let digits_start = usize::from(text.starts_with(['+', '-']));
    let digits_end = digits_start + count_digits(&text[digits_start..]);

    if digits_end == digits_start {
        return 0;
    }

    text[..digits_end].parse::<u32>().unwrap_or(0)
}

/// Parses a leading decimal number, returning 0.0 when there is none.
///
/// Accepts an optional sign, fraction and exponent; trailing text such as a
/// unit suffix is ignored. Non-finite results become 0.0.
pub fn parse_float_or_zero(text: &str) -> f64 {
    let text = text.trim_start();
    let mut end = usize::from(text.starts_with(['+', '-']));

    let int_digits = count_digits(&text[end..]);
    end += int_digits;

    let mut frac_digits = 0;
    if text[end..].starts_with('.') {
        frac_digits = count_digits(&text[end + 1..]);
        if int_digits > 0 || frac_digits > 0 {
            end += 1 + frac_digits;
        }
    }

    if int_digits == 0 && frac_digits == 0 {
        return 0.0;
    }

    // Exponent only counts when it has digits ("1e" parses as 1)
    let rest = &text[end..];
    if rest.starts_with(['e', 'E']) {
        let sign_len = usize::from(rest[1..].starts_with(['+', '-']));
        let exp_digits = count_digits(&rest[1 + sign_len..]);
        if exp_digits > 0 {
            end += 1 + sign_len + exp_digits;
        }
    }

    match text[..end].parse::<f64>() {
        Ok(value) if value.is_finite() => value,
        _ => 0.0,
    }
}

fn count_digits(text: &str) -> usize {
    text.bytes().take_while(u8::is_ascii_digit).count()
}
