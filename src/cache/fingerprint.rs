//! Fingerprint Module
//!
//! Derives deterministic cache keys from an operation name and its arguments.
//!
//! # Argument requirements
//! Every argument is serialized through `serde_json` before hashing. Struct
//! fields keep declaration order and JSON object keys are emitted sorted, so
//! plain structs, `BTreeMap`s and `HashMap`s with string keys all produce a
//! stable form. Values without a stable serialized form (a `HashSet`, whose
//! iteration order varies between instances, or a float that is `NaN`) make
//! the fingerprint unstable. Callers must sort or otherwise normalize such
//! arguments before passing them; instability is not detected.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{json, Value};
use sha2::{Digest, Sha256};

use crate::error::{CacheError, Result};

/// Length of every fingerprint, in hex characters.
pub const FINGERPRINT_LEN: usize = 64;

// == Call Args ==
/// Positional and keyword arguments of one call, in canonical JSON form.
#[derive(Debug, Default)]
pub struct CallArgs {
    positional: Vec<Value>,
    keyword: BTreeMap<String, Value>,
    error: Option<serde_json::Error>,
}

impl CallArgs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a positional argument. Order is significant.
    pub fn arg<T: Serialize + ?Sized>(mut self, value: &T) -> Self {
        match serde_json::to_value(value) {
            Ok(v) => self.positional.push(v),
            Err(err) => self.record_error(err),
        }
        self
    }

    /// Sets a keyword argument. Keyword order is not significant; setting the
    /// same name twice keeps the last value.
    pub fn kwarg<T: Serialize + ?Sized>(mut self, name: &str, value: &T) -> Self {
        match serde_json::to_value(value) {
            Ok(v) => {
                self.keyword.insert(name.to_string(), v);
            }
            Err(err) => self.record_error(err),
        }
        self
    }

    fn record_error(&mut self, err: serde_json::Error) {
        if self.error.is_none() {
            self.error = Some(err);
        }
    }
}

// == Fingerprint ==
/// Returns the 64-character lowercase hex SHA-256 of
/// `{"op": op, "args": [...], "kwargs": [[name, value], ...]}`.
///
/// Fails only when an argument could not be serialized.
pub fn fingerprint(op: &str, args: &CallArgs) -> Result<String> {
    if let Some(err) = &args.error {
        return Err(CacheError::Internal(format!(
            "argument of '{}' is not serializable: {}",
            op, err
        )));
    }

    let kwargs: Vec<(&String, &Value)> = args.keyword.iter().collect();
    let canonical = json!({
        "op": op,
        "args": args.positional,
        "kwargs": kwargs,
    });
    let encoded = serde_json::to_vec(&canonical)?;

    let digest = Sha256::digest(&encoded);
    Ok(digest.iter().map(|b| format!("{:02x}", b)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_fingerprint_is_fixed_length_hex() {
        let fp = fingerprint("get_price", &CallArgs::new().arg("AAPL")).unwrap();

        assert_eq!(fp.len(), FINGERPRINT_LEN);
        assert!(fp.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_fingerprint_deterministic() {
        let a = fingerprint("history", &CallArgs::new().arg("MSFT").arg(&30)).unwrap();
        let b = fingerprint("history", &CallArgs::new().arg("MSFT").arg(&30)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_fingerprint_kwarg_order_insensitive() {
        let a = fingerprint(
            "report",
            &CallArgs::new().kwarg("period", "1y").kwarg("lang", "en"),
        )
        .unwrap();
        let b = fingerprint(
            "report",
            &CallArgs::new().kwarg("lang", "en").kwarg("period", "1y"),
        )
        .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_fingerprint_positional_order_sensitive() {
        let a = fingerprint("spread", &CallArgs::new().arg("AAPL").arg("MSFT")).unwrap();
        let b = fingerprint("spread", &CallArgs::new().arg("MSFT").arg("AAPL")).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_fingerprint_distinguishes_op_and_arg_kind() {
        let args = CallArgs::new().arg("AAPL");
        let a = fingerprint("quote", &args).unwrap();
        let b = fingerprint("news", &args).unwrap();
        assert_ne!(a, b);

        // Same value, positional vs keyword
        let c = fingerprint("quote", &CallArgs::new().kwarg("ticker", "AAPL")).unwrap();
        assert_ne!(a, c);
    }

    #[test]
    fn test_fingerprint_map_argument_is_stable() {
        let mut first = HashMap::new();
        let mut second = HashMap::new();
        for (k, v) in [("b", 2), ("a", 1), ("c", 3)] {
            first.insert(k.to_string(), v);
        }
        for (k, v) in [("c", 3), ("a", 1), ("b", 2)] {
            second.insert(k.to_string(), v);
        }

        let a = fingerprint("weights", &CallArgs::new().arg(&first)).unwrap();
        let b = fingerprint("weights", &CallArgs::new().arg(&second)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_fingerprint_unserializable_argument() {
        // Maps with non-string keys cannot become JSON objects
        let mut bad = HashMap::new();
        bad.insert(vec![1u8], 1);

        let result = fingerprint("op", &CallArgs::new().arg(&bad));
        assert!(result.is_err());
    }
}
