//! Lenient request parameter parsing
//!
//! Missing or malformed parameters fall back to defaults; no request is ever
//! rejected for its query string or body.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::state::MatchId;

/// Parameters shared by the read routes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchQuery {
    /// Requested match, or the default one
    pub match_id: MatchId,
    /// Version the caller already has (long-poll only), 0 if absent
    pub since: u64,
}

impl MatchQuery {
    /// Extract parameters from a decoded query string
    pub fn from_params(params: &HashMap<String, String>, default_match: &MatchId) -> Self {
        Self {
            match_id: match_id_or(params.get("matchId").map(String::as_str), default_match),
            since: params.get("since").map(|s| parse_since(s)).unwrap_or(0),
        }
    }
}

/// Body of `POST /api/startMatch`
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StartMatchRequest {
    match_id: Option<String>,
}

/// Match named by a start request body, or the default one
pub fn start_match_id(body: &[u8], default_match: &MatchId) -> MatchId {
    let request: StartMatchRequest = serde_json::from_slice(body).unwrap_or_default();
    match_id_or(request.match_id.as_deref(), default_match)
}

/// Acknowledgement body
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Ack {
    /// Always true
    pub ok: bool,
}

impl Ack {
    /// Positive acknowledgement
    pub const OK: Ack = Ack { ok: true };
}

fn match_id_or(raw: Option<&str>, default_match: &MatchId) -> MatchId {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(MatchId::from)
        .unwrap_or_else(|| default_match.clone())
}

/// Parse a `since` value; anything that isn't a non-negative number is 0
///
/// Fractions are floored. Versions are integers, so `version > since` holds
/// for the floored value exactly when it holds for the unfloored one.
fn parse_since(raw: &str) -> u64 {
    let raw = raw.trim();
    raw.parse::<u64>().ok().unwrap_or_else(|| {
        raw.parse::<f64>()
            .ok()
            .filter(|v| v.is_finite() && *v >= 0.0)
            .map(|v| v.floor() as u64)
            .unwrap_or(0)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults_when_missing() {
        let q = MatchQuery::from_params(&HashMap::new(), &MatchId::default());

        assert_eq!(q.match_id.as_str(), "INDvAUS");
        assert_eq!(q.since, 0);
    }

    #[test]
    fn test_explicit_values() {
        let q = MatchQuery::from_params(
            &params(&[("matchId", "ENGvNZ"), ("since", "42")]),
            &MatchId::default(),
        );

        assert_eq!(q.match_id.as_str(), "ENGvNZ");
        assert_eq!(q.since, 42);
    }

    #[test]
    fn test_malformed_since_defaults_to_zero() {
        for raw in ["abc", "-3", "", "NaN", "inf"] {
            let q = MatchQuery::from_params(&params(&[("since", raw)]), &MatchId::default());
            assert_eq!(q.since, 0, "since={:?}", raw);
        }

        let q = MatchQuery::from_params(&params(&[("since", "7.9")]), &MatchId::default());
        assert_eq!(q.since, 7);
    }

    #[test]
    fn test_blank_match_id_uses_default() {
        let q = MatchQuery::from_params(&params(&[("matchId", "  ")]), &MatchId::new("X"));
        assert_eq!(q.match_id.as_str(), "X");
    }

    #[test]
    fn test_start_match_body() {
        let default = MatchId::default();

        assert_eq!(start_match_id(br#"{"matchId":"PAKvSL"}"#, &default).as_str(), "PAKvSL");
        assert_eq!(start_match_id(b"", &default), default);
        assert_eq!(start_match_id(b"{not json", &default), default);
        assert_eq!(start_match_id(br#"{"other":1}"#, &default), default);
    }
}
