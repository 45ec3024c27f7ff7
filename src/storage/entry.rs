use bytes::Bytes;
use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// A stored value. The active variant decides which commands may touch it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Integer(i64),
    Text(Bytes),
    List(VecDeque<Bytes>),
}

impl Value {
    /// Builds the value for a SET: text that is the canonical base-10 form
    /// of an integer is stored as `Integer`, anything else as `Text`.
    ///
    /// `007`, `+5` and `-0` stay `Text` so GET returns exactly what was set.
    pub fn from_input(raw: Bytes) -> Self {
        match parse_integer(&raw) {
            Some(n) if n.to_string().as_bytes() == &raw[..] => Value::Integer(n),
            _ => Value::Text(raw),
        }
    }

    /// The value as a bulk string payload, or `None` for lists.
    pub fn to_bytes(&self) -> Option<Bytes> {
        match self {
            Value::Integer(n) => Some(Bytes::from(n.to_string())),
            Value::Text(data) => Some(data.clone()),
            Value::List(_) => None,
        }
    }
}

/// One key's value plus its optional expiry deadline.
#[derive(Debug, Clone)]
pub struct Entry {
    pub value: Value,
    /// When this entry expires (None = never expires)
    pub expires_at: Option<Instant>,
}

impl Entry {
    pub fn new(value: Value) -> Self {
        Self {
            value,
            expires_at: None,
        }
    }

    pub fn with_ttl(value: Value, ttl: Duration) -> Self {
        Self {
            value,
            expires_at: Some(deadline(ttl)),
        }
    }

    #[inline]
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Instant::now())
    }

    #[inline]
    pub fn is_expired_at(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|exp| now >= exp)
    }

    /// Time left before expiry, or `None` if the entry never expires.
    pub fn remaining(&self) -> Option<Duration> {
        self.expires_at
            .map(|exp| exp.saturating_duration_since(Instant::now()))
    }
}

/// The instant `ttl` from now, saturating far in the future instead of
/// overflowing.
pub(crate) fn deadline(ttl: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(ttl)
        .unwrap_or_else(|| now + Duration::from_secs(100 * 365 * 24 * 60 * 60))
}

/// Parses a signed base-10 integer, requiring the whole input to match.
pub fn parse_integer(raw: &[u8]) -> Option<i64> {
    std::str::from_utf8(raw).ok()?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_from_input() {
        assert_eq!(Value::from_input(Bytes::from("10")), Value::Integer(10));
        assert_eq!(Value::from_input(Bytes::from("-7")), Value::Integer(-7));
        assert_eq!(
            Value::from_input(Bytes::from("10a")),
            Value::Text(Bytes::from("10a"))
        );
        assert_eq!(
            Value::from_input(Bytes::from(" 1")),
            Value::Text(Bytes::from(" 1"))
        );
        assert_eq!(Value::from_input(Bytes::new()), Value::Text(Bytes::new()));
    }

    #[test]
    fn test_non_canonical_integers_stay_text() {
        for raw in ["007", "+5", "-0", "00"] {
            assert_eq!(
                Value::from_input(Bytes::from(raw)),
                Value::Text(Bytes::from(raw)),
                "{}",
                raw
            );
        }
        assert_eq!(Value::from_input(Bytes::from("0")), Value::Integer(0));
        assert_eq!(
            Value::from_input(Bytes::from(i64::MIN.to_string())),
            Value::Integer(i64::MIN)
        );
    }

    #[test]
    fn test_value_to_bytes() {
        assert_eq!(Value::Integer(42).to_bytes(), Some(Bytes::from("42")));
        assert_eq!(Value::List(VecDeque::new()).to_bytes(), None);
    }

    #[test]
    fn test_entry_expiry() {
        let entry = Entry::new(Value::Integer(1));
        assert!(!entry.is_expired());
        assert_eq!(entry.remaining(), None);

        let entry = Entry::with_ttl(Value::Integer(1), Duration::from_secs(60));
        assert!(!entry.is_expired());
        assert!(entry.remaining().unwrap() > Duration::from_secs(59));

        let entry = Entry::with_ttl(Value::Integer(1), Duration::ZERO);
        assert!(entry.is_expired());
        assert_eq!(entry.remaining(), Some(Duration::ZERO));
    }

    #[test]
    fn test_deadline_saturates() {
        let entry = Entry::with_ttl(Value::Integer(1), Duration::MAX);
        assert!(!entry.is_expired());
    }
}
