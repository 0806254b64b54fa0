//! Row validation against the catalog schema
//!
//! # Rules
//! - `name` and `description` must be non-blank text
//! - `price` must be a number strictly greater than zero
//! - `quantity` must be a whole number, zero or more, no larger than
//!   [`MAX_QUANTITY`]
//!
//! All four fields are checked on every row so the reported error names
//! every failing constraint. Nothing is rounded or truncated: `2.5` is not a
//! valid quantity.

use std::fmt;

use crate::models::ProductInput;
use crate::parser::{RawRow, RawValue};

/// Largest quantity stored exactly: 2^53. Anything above it cannot be told
/// apart from its neighbours once parsed as a number.
pub const MAX_QUANTITY: f64 = 9_007_199_254_740_992.0;

/// A single failed constraint
#[derive(Debug, Clone, PartialEq)]
pub enum Violation {
    MissingName,
    MissingDescription,
    PriceNotNumeric(String),
    NonPositivePrice(f64),
    QuantityNotNumeric(String),
    NegativeQuantity(f64),
    FractionalQuantity(f64),
    QuantityTooLarge(f64),
}

impl Violation {
    /// Catalog column the violation refers to
    pub fn field(&self) -> &'static str {
        match self {
            Violation::MissingName => "name",
            Violation::MissingDescription => "description",
            Violation::PriceNotNumeric(_) | Violation::NonPositivePrice(_) => "price",
            Violation::QuantityNotNumeric(_)
            | Violation::NegativeQuantity(_)
            | Violation::FractionalQuantity(_)
            | Violation::QuantityTooLarge(_) => "quantity",
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::MissingName => write!(f, "Name is required"),
            Violation::MissingDescription => write!(f, "Description is required"),
            Violation::PriceNotNumeric(raw) => write!(f, "Price must be a number, got '{}'", raw),
            Violation::NonPositivePrice(price) => write!(f, "Price must be positive, got {}", price),
            Violation::QuantityNotNumeric(raw) => {
                write!(f, "Quantity must be a whole number, got '{}'", raw)
            },
            Violation::NegativeQuantity(quantity) => {
                write!(f, "Quantity must be >= 0, got {}", quantity)
            },
            Violation::FractionalQuantity(quantity) => {
                write!(f, "Quantity must be a whole number, got {}", quantity)
            },
            Violation::QuantityTooLarge(quantity) => {
                write!(f, "Quantity must be at most {}, got {}", MAX_QUANTITY, quantity)
            },
        }
    }
}

/// Why a row was rejected; never empty
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    pub violations: Vec<Violation>,
}

impl ValidationError {
    pub fn fields(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.violations.iter().map(Violation::field)
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let messages: Vec<String> = self.violations.iter().map(ToString::to_string).collect();
        f.write_str(&messages.join("; "))
    }
}

impl std::error::Error for ValidationError {}

/// Validate one normalized row.
pub fn validate_row(row: &RawRow) -> Result<ProductInput, ValidationError> {
    let mut violations = Vec::new();

    let name = required_text(row.get("name"));
    if name.is_none() {
        violations.push(Violation::MissingName);
    }

    let description = required_text(row.get("description"));
    if description.is_none() {
        violations.push(Violation::MissingDescription);
    }

    let price = match number(row.get("price")) {
        Ok(price) if price > 0.0 => Some(price),
        Ok(price) => {
            violations.push(Violation::NonPositivePrice(price));
            None
        },
        Err(raw) => {
            violations.push(Violation::PriceNotNumeric(raw));
            None
        },
    };

    let quantity = match number(row.get("quantity")) {
        Ok(quantity) if quantity < 0.0 => {
            violations.push(Violation::NegativeQuantity(quantity));
            None
        },
        Ok(quantity) if quantity.fract() != 0.0 => {
            violations.push(Violation::FractionalQuantity(quantity));
            None
        },
        Ok(quantity) if quantity > MAX_QUANTITY => {
            violations.push(Violation::QuantityTooLarge(quantity));
            None
        },
        Ok(quantity) => Some(quantity as i64),
        Err(raw) => {
            violations.push(Violation::QuantityNotNumeric(raw));
            None
        },
    };

    match (name, description, price, quantity) {
        (Some(name), Some(description), Some(price), Some(quantity)) if violations.is_empty() => {
            Ok(ProductInput {
                name,
                description,
                price,
                quantity,
            })
        },
        _ => Err(ValidationError { violations }),
    }
}

fn required_text(value: Option<&RawValue>) -> Option<String> {
    match value {
        Some(value) if !value.is_empty() => Some(value.to_text()),
        _ => None,
    }
}

/// Numeric value of a cell; `Err` carries the offending text.
/// Absent and blank cells count as zero, matching the parser defaults.
fn number(value: Option<&RawValue>) -> Result<f64, String> {
    match value {
        Some(RawValue::Number(n)) => Ok(*n),
        Some(RawValue::String(s)) => Err(s.clone()),
        Some(RawValue::Empty) | None => Ok(0.0),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn row(name: &str, description: &str, price: &str, quantity: &str) -> RawRow {
        vec![
            ("name", RawValue::from_text(name)),
            ("description", RawValue::from_text(description)),
            ("price", RawValue::from_text(price)),
            ("quantity", RawValue::from_text(quantity)),
        ]
        .into_iter()
        .collect::<RawRow>()
        .normalized()
    }

    #[test]
    fn test_valid_row() {
        let input = validate_row(&row("Widget", "A widget", "9.99", "5")).unwrap();
        assert_eq!(
            input,
            ProductInput {
                name: "Widget".to_string(),
                description: "A widget".to_string(),
                price: 9.99,
                quantity: 5,
            }
        );
    }

    #[test]
    fn test_zero_quantity_is_valid() {
        assert_eq!(validate_row(&row("A", "a", "1", "0")).unwrap().quantity, 0);
    }

    #[test]
    fn test_non_positive_price_rejected() {
        for price in ["0", "-1", "-0.01", ""] {
            let err = validate_row(&row("A", "a", price, "1")).unwrap_err();
            assert_eq!(err.fields().collect::<Vec<_>>(), vec!["price"], "price {:?}", price);
            assert!(err.to_string().contains("Price must be positive"));
        }
    }

    #[test]
    fn test_non_numeric_price_rejected() {
        let err = validate_row(&row("A", "a", "cheap", "1")).unwrap_err();
        assert_eq!(err.violations, vec![Violation::PriceNotNumeric("cheap".to_string())]);
    }

    #[test]
    fn test_quantity_rules() {
        let err = validate_row(&row("A", "a", "1", "-3")).unwrap_err();
        assert_eq!(err.violations, vec![Violation::NegativeQuantity(-3.0)]);

        let err = validate_row(&row("A", "a", "1", "2.5")).unwrap_err();
        assert_eq!(err.violations, vec![Violation::FractionalQuantity(2.5)]);

        let err = validate_row(&row("A", "a", "1", "x")).unwrap_err();
        assert_eq!(err.violations, vec![Violation::QuantityNotNumeric("x".to_string())]);
        assert!(err.to_string().starts_with("Quantity"));
    }

    #[test]
    fn test_quantity_beyond_exact_range_rejected() {
        let err = validate_row(&row("A", "a", "1", "9223372036854775808")).unwrap_err();
        assert_eq!(err.fields().collect::<Vec<_>>(), vec!["quantity"]);
        assert_eq!(
            err.to_string(),
            "Quantity must be at most 9007199254740992, got 9223372036854775808"
        );

        let err = validate_row(&row("A", "a", "1", "1e300")).unwrap_err();
        assert!(matches!(err.violations[..], [Violation::QuantityTooLarge(_)]));

        let input = validate_row(&row("A", "a", "1", "9007199254740992")).unwrap();
        assert_eq!(input.quantity, 9_007_199_254_740_992);
    }

    #[test]
    fn test_presence_rules() {
        let err = validate_row(&row("", "a", "1", "1")).unwrap_err();
        assert_eq!(err.to_string(), "Name is required");

        let err = validate_row(&row("A", "   ", "1", "1")).unwrap_err();
        assert_eq!(err.to_string(), "Description is required");
    }

    #[test]
    fn test_all_failures_reported_together() {
        let err = validate_row(&row("", "Bad", "-1", "x")).unwrap_err();
        assert_eq!(err.fields().collect::<Vec<_>>(), vec!["name", "price", "quantity"]);
        assert_eq!(
            err.to_string(),
            "Name is required; Price must be positive, got -1; Quantity must be a whole number, got 'x'"
        );
    }

    #[test]
    fn test_row_without_catalog_columns_uses_defaults_and_fails() {
        let raw: RawRow = vec![("sku", RawValue::from_text("A-1"))].into_iter().collect();
        let err = validate_row(&raw.normalized()).unwrap_err();
        assert_eq!(
            err.fields().collect::<Vec<_>>(),
            vec!["name", "description", "price"]
        );
    }
}
