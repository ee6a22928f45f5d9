use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{json, Value};
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum CursorError {
    #[error("malformed pagination cursor")]
    Malformed,
}

/// Opaque pagination cursor handed to clients as a URL-safe token.
///
/// A cursor pins the sort key `(created_at, id)` of a boundary row and the
/// direction the next fetch should walk: `points_next = true` means "rows
/// strictly after this position", `false` means "rows strictly before it".
///
/// Tokens carry no integrity check. A syntactically valid cursor is accepted
/// at face value, so a client can replay a cursor under a different filter
/// set and land on an arbitrary position. That matches the stateless design;
/// the worst outcome is a strange page, never an injection vector, since all
/// decoded fields are strongly typed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    pub created_at: DateTime<Utc>,
    pub id: Uuid,
    pub points_next: bool,
}

impl Cursor {
    /// Cursor that continues forward past the given row.
    pub fn next(created_at: DateTime<Utc>, id: Uuid) -> Self {
        Self { created_at, id, points_next: true }
    }

    /// Cursor that walks backward from the given row.
    pub fn prev(created_at: DateTime<Utc>, id: Uuid) -> Self {
        Self { created_at, id, points_next: false }
    }

    /// Encode as URL-safe base64 over a small JSON record.
    ///
    /// The timestamp keeps nanosecond precision; anything coarser would break
    /// round-tripping for rows created within the same second.
    pub fn encode(&self) -> String {
        let record = json!({
            "created_at": self.created_at.to_rfc3339_opts(SecondsFormat::Nanos, true),
            "id": self.id.to_string(),
            "points_next": self.points_next,
        });
        URL_SAFE_NO_PAD.encode(record.to_string())
    }

    /// Decode a client-supplied token.
    ///
    /// Fails with `CursorError::Malformed` when the token is not base64, not
    /// JSON, or any of the three fields is missing or fails format
    /// validation. Decoding happens before any query executes.
    pub fn decode(token: &str) -> Result<Self, CursorError> {
        let bytes = URL_SAFE_NO_PAD
            .decode(token.as_bytes())
            .map_err(|_| CursorError::Malformed)?;
        let record: Value = serde_json::from_slice(&bytes).map_err(|_| CursorError::Malformed)?;

        let created_at = record
            .get("created_at")
            .and_then(Value::as_str)
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|t| t.with_timezone(&Utc))
            .ok_or(CursorError::Malformed)?;

        let id = record
            .get("id")
            .and_then(Value::as_str)
            .and_then(|s| Uuid::parse_str(s).ok())
            .ok_or(CursorError::Malformed)?;

        let points_next = record
            .get("points_next")
            .and_then(Value::as_bool)
            .ok_or(CursorError::Malformed)?;

        Ok(Self { created_at, id, points_next })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_instant() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 15, 10, 30, 0).unwrap() + chrono::Duration::nanoseconds(123_456_789)
    }

    #[test]
    fn round_trips_next_cursor() {
        let cursor = Cursor::next(sample_instant(), Uuid::new_v4());
        let decoded = Cursor::decode(&cursor.encode()).unwrap();
        assert_eq!(decoded, cursor);
    }

    #[test]
    fn round_trips_prev_cursor() {
        let cursor = Cursor::prev(sample_instant(), Uuid::new_v4());
        let decoded = Cursor::decode(&cursor.encode()).unwrap();
        assert_eq!(decoded, cursor);
        assert!(!decoded.points_next);
    }

    #[test]
    fn token_is_url_safe() {
        let token = Cursor::next(sample_instant(), Uuid::new_v4()).encode();
        assert!(!token.contains('+'));
        assert!(!token.contains('/'));
        assert!(!token.contains('='));
    }

    #[test]
    fn rejects_garbage_token() {
        assert!(matches!(Cursor::decode("not-a-valid-token"), Err(CursorError::Malformed)));
    }

    #[test]
    fn rejects_valid_base64_of_non_json() {
        let token = URL_SAFE_NO_PAD.encode("hello world");
        assert!(Cursor::decode(&token).is_err());
    }

    #[test]
    fn rejects_bad_timestamp() {
        let token = URL_SAFE_NO_PAD.encode(
            json!({"created_at": "yesterday", "id": Uuid::new_v4().to_string(), "points_next": true})
                .to_string(),
        );
        assert!(Cursor::decode(&token).is_err());
    }

    #[test]
    fn rejects_bad_id() {
        let token = URL_SAFE_NO_PAD.encode(
            json!({"created_at": "2024-03-15T10:30:00Z", "id": "42", "points_next": true}).to_string(),
        );
        assert!(Cursor::decode(&token).is_err());
    }

    #[test]
    fn rejects_missing_direction() {
        let token = URL_SAFE_NO_PAD.encode(
            json!({"created_at": "2024-03-15T10:30:00Z", "id": Uuid::new_v4().to_string()}).to_string(),
        );
        assert!(Cursor::decode(&token).is_err());
    }
}
