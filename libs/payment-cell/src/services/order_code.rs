// libs/payment-cell/src/services/order_code.rs
use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;

pub const ORDER_CODE_PREFIX: &str = "APPT";

static ORDER_CODE_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"APPT[A-Z0-9]+").ok());

/// `APPT{appointment_id}{yyMMdd}{suffix as 4 hex digits}`. No separators:
/// banks strip punctuation from transfer descriptions.
pub fn generate_order_code(appointment_id: i32, day: NaiveDate, suffix: u16) -> String {
    format!(
        "{}{}{}{:04X}",
        ORDER_CODE_PREFIX,
        appointment_id,
        day.format("%y%m%d"),
        suffix
    )
}

/// Finds the order code in a transfer description, falling back to the
/// provider's own `code` field.
pub fn extract_order_code(content: Option<&str>, code: Option<&str>) -> Option<String> {
    let pattern = ORDER_CODE_PATTERN.as_ref()?;

    let from_content = content.and_then(|text| {
        pattern
            .find(&text.to_ascii_uppercase())
            .map(|m| m.as_str().to_string())
    });

    from_content.or_else(|| {
        code.map(|c| c.trim().to_ascii_uppercase())
            .filter(|c| c.starts_with(ORDER_CODE_PREFIX) && c.len() > ORDER_CODE_PREFIX.len())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_code_layout() {
        let day = NaiveDate::from_ymd_opt(2025, 8, 12).unwrap();
        assert_eq!(generate_order_code(123, day, 0xAB12), "APPT123250812AB12");
        assert_eq!(generate_order_code(7, day, 0x000f), "APPT7250812000F");
    }

    #[test]
    fn test_generated_code_is_extractable() {
        let day = NaiveDate::from_ymd_opt(2025, 8, 12).unwrap();
        let code = generate_order_code(55, day, 0x1c2d);
        let content = format!("MBVCB.123 {} chuyen tien kham", code.to_lowercase());

        assert_eq!(extract_order_code(Some(&content), None), Some(code));
    }
}
