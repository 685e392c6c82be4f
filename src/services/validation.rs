//! Input checks shared by the gig and bid operations.

use serde_json::Value;

use crate::error::AppError;

pub const BID_MESSAGE_MIN: usize = 10;
pub const BID_MESSAGE_MAX: usize = 1000;
pub const GIG_TITLE_MIN: usize = 5;
pub const GIG_TITLE_MAX: usize = 100;
pub const GIG_DESCRIPTION_MIN: usize = 20;
pub const GIG_DESCRIPTION_MAX: usize = 2000;

/// Parse a money amount from JSON. Numbers and numeric strings are accepted;
/// the result must be finite and strictly positive.
pub fn parse_amount(raw: &Value, label: &str) -> Result<f64, AppError> {
    let amount = match raw {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };

    match amount {
        Some(v) if v.is_finite() && v > 0.0 => Ok(v),
        _ => Err(AppError::validation(format!(
            "{label} must be a positive number"
        ))),
    }
}

pub fn bid_message(raw: &str) -> Result<String, AppError> {
    bounded_text(raw, "Message", BID_MESSAGE_MIN, BID_MESSAGE_MAX)
}

pub fn gig_title(raw: &str) -> Result<String, AppError> {
    bounded_text(raw, "Title", GIG_TITLE_MIN, GIG_TITLE_MAX)
}

pub fn gig_description(raw: &str) -> Result<String, AppError> {
    bounded_text(raw, "Description", GIG_DESCRIPTION_MIN, GIG_DESCRIPTION_MAX)
}

/// Trim and enforce a length window measured in characters.
fn bounded_text(raw: &str, label: &str, min: usize, max: usize) -> Result<String, AppError> {
    let trimmed = raw.trim();
    let len = trimmed.chars().count();

    if len < min {
        return Err(AppError::validation(format!(
            "{label} must be at least {min} characters"
        )));
    }
    if len > max {
        return Err(AppError::validation(format!(
            "{label} cannot exceed {max} characters"
        )));
    }

    Ok(trimmed.to_string())
}
