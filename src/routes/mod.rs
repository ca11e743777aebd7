// Route modules, one per resource
pub mod admin;
pub mod businesses;
pub mod community;
pub mod dashboard;
pub mod ledger;
pub mod requests;
pub mod users;

use axum::{extract::FromRequestParts, http::request::Parts};
use rust_decimal::Decimal;
use serde_json::Value;
use std::str::FromStr;

use crate::error::AppError;

/// Header carrying the identity established by the upstream auth proxy.
pub const USER_HEADER: &str = "x-user-id";

/// The authenticated caller. Rejects with 401 when the identity header is absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActingUser(pub String);

impl<S> FromRequestParts<S> for ActingUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(USER_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(|value| ActingUser(value.to_string()))
            .ok_or_else(|| AppError::Unauthorized(format!("missing {} header", USER_HEADER)))
    }
}

/// Accepts a JSON number or a numeric string. Anything else is an invalid amount.
pub fn parse_amount(raw: &Value) -> Result<Decimal, AppError> {
    let text = match raw {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.trim().to_string(),
        Value::Null => return Err(AppError::InvalidAmount("amount is required".to_string())),
        other => return Err(AppError::InvalidAmount(format!("not a number: {}", other))),
    };
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .map_err(|_| AppError::InvalidAmount(format!("not a number: {}", text)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn amounts_parse_from_numbers_and_strings() {
        assert_eq!(parse_amount(&json!(150)).unwrap(), Decimal::from(150));
        assert_eq!(parse_amount(&json!("75.50")).unwrap(), Decimal::new(7550, 2));
        assert_eq!(parse_amount(&json!(12.25)).unwrap(), Decimal::new(1225, 2));
    }

    #[test]
    fn non_numeric_amounts_are_invalid() {
        for raw in [json!("abc"), json!(null), json!(true), json!([1])] {
            assert!(matches!(parse_amount(&raw), Err(AppError::InvalidAmount(_))), "{}", raw);
        }
    }
}
