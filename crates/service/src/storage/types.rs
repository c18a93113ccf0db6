//! Value types persisted per field.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Parameter key to value, as activated.
pub type ConfigValues = BTreeMap<String, String>;

/// Stored custom signals; values are always strings once merged.
pub type CustomSignals = BTreeMap<String, String>;

/// Incoming custom signal changes; `None` unsets the signal.
pub type CustomSignalUpdate = BTreeMap<String, Option<SignalValue>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FetchStatus {
    NoFetchYet,
    Success,
    Failure,
    Throttle,
}

/// Last successful response of the fetch layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchResponse {
    pub status: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub e_tag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<ConfigValues>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_version: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub minimum_fetch_interval_millis: u64,
    pub fetch_timeout_millis: u64,
}

/// Backoff bookkeeping of the fetch client; stored, never computed here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThrottleMetadata {
    pub backoff_count: u32,
    pub throttle_end_time_millis: i64,
}

/// A custom signal value as supplied by callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SignalValue {
    Text(String),
    Number(serde_json::Number),
}

impl SignalValue {
    /// String form used for storage and transmission. Numbers print the way
    /// JavaScript's `String(n)` does, so `3.0` becomes `"3"` and `1e21`
    /// becomes `"1e+21"`.
    pub fn normalize(&self) -> String {
        match self {
            SignalValue::Text(s) => s.clone(),
            SignalValue::Number(n) => {
                if n.is_i64() || n.is_u64() {
                    return n.to_string();
                }
                match n.as_f64() {
                    Some(f) => number_to_string(f),
                    None => n.to_string(),
                }
            }
        }
    }
}

/// ECMAScript `Number::toString` for a finite or non-finite double.
fn number_to_string(f: f64) -> String {
    if f.is_nan() {
        return "NaN".to_string();
    }
    if f.is_infinite() {
        return if f > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if f == 0.0 {
        return "0".to_string();
    }

    // `{:e}` yields the shortest round-trip digits as `d.ddde<exp>`
    let sci = format!("{:e}", f.abs());
    let (mantissa, exp) = match sci.split_once('e') {
        Some(parts) => parts,
        None => return f.to_string(),
    };
    let digits: String = mantissa.chars().filter(|c| *c != '.').collect();
    let k = digits.len() as i32;
    // decimal point position relative to the digit string
    let n = exp.parse::<i32>().unwrap_or(0) + 1;
    let sign = if f < 0.0 { "-" } else { "" };

    let body = if k <= n && n <= 21 {
        format!("{digits}{}", "0".repeat((n - k) as usize))
    } else if 0 < n && n <= 21 {
        format!("{}.{}", &digits[..n as usize], &digits[n as usize..])
    } else if -6 < n && n <= 0 {
        format!("0.{}{digits}", "0".repeat((-n) as usize))
    } else {
        let exp_sign = if n - 1 >= 0 { "+" } else { "-" };
        let (head, tail) = digits.split_at(1);
        if tail.is_empty() {
            format!("{head}e{exp_sign}{}", (n - 1).abs())
        } else {
            format!("{head}.{tail}e{exp_sign}{}", (n - 1).abs())
        }
    };
    format!("{sign}{body}")
}

impl fmt::Display for SignalValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.normalize())
    }
}

impl From<&str> for SignalValue {
    fn from(s: &str) -> Self { SignalValue::Text(s.to_string()) }
}

impl From<String> for SignalValue {
    fn from(s: String) -> Self { SignalValue::Text(s) }
}

impl From<i64> for SignalValue {
    fn from(n: i64) -> Self { SignalValue::Number(n.into()) }
}

impl From<f64> for SignalValue {
    fn from(n: f64) -> Self {
        match serde_json::Number::from_f64(n) {
            Some(num) => SignalValue::Number(num),
            // NaN and infinities have no JSON number form
            None => SignalValue::Text(number_to_string(n)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetch_status_uses_kebab_case() -> anyhow::Result<()> {
        assert_eq!(serde_json::to_string(&FetchStatus::NoFetchYet)?, "\"no-fetch-yet\"");
        assert_eq!(serde_json::from_str::<FetchStatus>("\"throttle\"")?, FetchStatus::Throttle);
        Ok(())
    }

    #[test]
    fn throttle_metadata_wire_names() -> anyhow::Result<()> {
        let m = ThrottleMetadata { backoff_count: 2, throttle_end_time_millis: 1_700_000_000_000 };
        let v = serde_json::to_value(m)?;
        assert_eq!(v["backoffCount"], 2);
        assert_eq!(v["throttleEndTimeMillis"], 1_700_000_000_000i64);
        Ok(())
    }

    #[test]
    fn fetch_response_omits_missing_parts() -> anyhow::Result<()> {
        let r = FetchResponse { status: 304, e_tag: Some("etag".into()), config: None, template_version: None };
        assert_eq!(serde_json::to_string(&r)?, r#"{"status":304,"eTag":"etag"}"#);
        Ok(())
    }

    #[test]
    fn numbers_normalize_like_strings() {
        assert_eq!(SignalValue::from(3i64).normalize(), "3");
        assert_eq!(SignalValue::from(-7i64).normalize(), "-7");
        assert_eq!(SignalValue::from(3.0).normalize(), "3");
        assert_eq!(SignalValue::from(2.5).normalize(), "2.5");
        assert_eq!(SignalValue::from(f64::NAN).normalize(), "NaN");
        assert_eq!(SignalValue::from(-0.0).normalize(), "0");
        assert_eq!(SignalValue::from(f64::NEG_INFINITY).normalize(), "-Infinity");
        assert_eq!(SignalValue::from("abc").normalize(), "abc");
    }

    #[test]
    fn update_accepts_null_string_and_number() -> anyhow::Result<()> {
        let update: CustomSignalUpdate = serde_json::from_str(r#"{"a":null,"b":"x","c":4.25}"#)?;
        assert_eq!(update["a"], None);
        assert_eq!(update["b"], Some(SignalValue::Text("x".into())));
        assert_eq!(update["c"].as_ref().map(SignalValue::normalize).as_deref(), Some("4.25"));
        Ok(())
    }

    #[test]
    fn large_and_tiny_numbers_use_exponent_form() {
        assert_eq!(SignalValue::from(1e21).normalize(), "1e+21");
        assert_eq!(SignalValue::from(1.5e300).normalize(), "1.5e+300");
        assert_eq!(SignalValue::from(1e20).normalize(), "100000000000000000000");
        assert_eq!(SignalValue::from(1e-7).normalize(), "1e-7");
        assert_eq!(SignalValue::from(-2.5e-8).normalize(), "-2.5e-8");
        assert_eq!(SignalValue::from(0.000001).normalize(), "0.000001");
        assert_eq!(SignalValue::from(123.456).normalize(), "123.456");
        assert_eq!(SignalValue::from(0.1).normalize(), "0.1");
    }
}
