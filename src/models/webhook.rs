use serde::Deserialize;
use validator::Validate;

use super::common::PlanCode;

/// Inbound PayTabs notification
///
/// Every recognized field is optional on the wire. Defaults:
/// - user id: first non-empty of `userId`, `customer_id`, `uid` (no default, required)
/// - `plan`: `30d`
/// - `amount`: `0`
///
/// Unknown fields are ignored here; the raw body is stored separately.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct WebhookPayload {
    #[serde(rename = "userId")]
    #[validate(length(max = 128))]
    pub user_id: Option<String>,

    #[validate(length(max = 128))]
    pub customer_id: Option<String>,

    #[validate(length(max = 128))]
    pub uid: Option<String>,

    /// Kept as raw JSON: any non-empty value is a plan code, string or not
    pub plan: Option<serde_json::Value>,

    pub amount: Option<AmountField>,

    /// Provider transaction reference, used to spot redelivered notifications
    #[validate(length(max = 128))]
    pub tran_ref: Option<String>,
}

/// PayTabs sends amounts as either JSON numbers or decimal strings
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum AmountField {
    Number(f64),
    Text(String),
}

impl WebhookPayload {
    /// Resolve the target user, `userId` > `customer_id` > `uid`
    pub fn resolve_user_id(&self) -> Option<&str> {
        [&self.user_id, &self.customer_id, &self.uid]
            .into_iter()
            .filter_map(|field| field.as_deref())
            .map(str::trim)
            .find(|id| !id.is_empty())
    }

    /// Plan code taken verbatim; falsy values (`null`, `""`, `false`, `0`)
    /// fall back to `30d`, other non-strings become unrecognized codes
    pub fn resolve_plan(&self) -> PlanCode {
        use serde_json::Value;

        match &self.plan {
            None | Some(Value::Null) | Some(Value::Bool(false)) => PlanCode::default(),
            Some(Value::String(code)) if code.is_empty() => PlanCode::default(),
            Some(Value::String(code)) => PlanCode::parse(code),
            Some(Value::Number(n)) if n.as_f64() == Some(0.0) => PlanCode::default(),
            Some(other) => PlanCode::Other(other.to_string()),
        }
    }

    /// Amount in SAR, zero when absent. Errors describe the rejected value.
    pub fn resolve_amount(&self) -> Result<f64, String> {
        let amount = match &self.amount {
            None => return Ok(0.0),
            Some(AmountField::Number(value)) => *value,
            Some(AmountField::Text(text)) => {
                let text = text.trim();
                if text.is_empty() {
                    return Ok(0.0);
                }
                text.parse::<f64>()
                    .map_err(|_| format!("amount '{}' is not a number", text))?
            }
        };

        if !amount.is_finite() || amount < 0.0 {
            return Err(format!("amount {} must be a non-negative number", amount));
        }

        Ok(amount)
    }

    pub fn resolve_provider_reference(&self) -> Option<&str> {
        self.tran_ref
            .as_deref()
            .map(str::trim)
            .filter(|reference| !reference.is_empty())
    }
}
