// Domain registration lookup via the WhoisJSON API

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value;
use tracing::{debug, warn};

use super::{read_json, CollectorError, RegistrationLookup};
use crate::app_config::IntelConfig;
use crate::models::RegistrationFacts;

const VENDOR: &str = "WhoisJSON";

/// Registrant names that indicate a privacy or proxy service
const PRIVACY_MARKERS: [&str; 6] = [
    "privacy",
    "redacted",
    "proxy",
    "whoisguard",
    "domains by proxy",
    "withheld",
];

pub struct WhoisJsonLookup {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl WhoisJsonLookup {
    pub fn new(client: reqwest::Client, config: &IntelConfig) -> Self {
        Self {
            client,
            base_url: config.whoisjson_api_url.trim_end_matches('/').to_string(),
            api_key: config.whoisjson_api_key.clone(),
        }
    }

    async fn fetch_registration(&self, domain: &str) -> Result<Value, CollectorError> {
        let mut request = self.client.get(format!("{}/{}", self.base_url, domain));
        if let Some(key) = &self.api_key {
            request = request.header("Authorization", format!("Token={}", key));
        }

        let response = request.send().await?;
        read_json(VENDOR, response).await
    }
}

#[async_trait]
impl RegistrationLookup for WhoisJsonLookup {
    async fn lookup(&self, domain: &str) -> RegistrationFacts {
        match self.fetch_registration(domain).await {
            Ok(payload) => {
                let facts = extract_registration(&payload, Utc::now());
                debug!(domain, age_days = ?facts.age_days, "Registration lookup finished");
                facts
            },
            Err(e) => {
                warn!(domain, error = %e, "Registration lookup failed");
                RegistrationFacts::unknown()
            },
        }
    }
}

/// Convert a WhoisJSON record into registration facts.
///
/// A missing or unparsable creation date leaves the age unknown; it is never
/// replaced by "now" (which would read as a zero-day-old domain).
pub fn extract_registration(payload: &Value, now: DateTime<Utc>) -> RegistrationFacts {
    let created_at = first_date(payload, &["created_date", "created", "creation_date"]);
    let age_days = created_at
        .map(|created| (now - created).num_days())
        .filter(|days| *days >= 0);

    RegistrationFacts {
        age_days,
        registrar: extract_registrar(payload),
        privacy_protected: detect_privacy(payload),
        ip_address: None,
        created_at,
        updated_at: first_date(payload, &["updated_date", "changed", "updated"]),
        expires_at: first_date(payload, &["expiry_date", "expires", "expiration_date"]),
        nameservers: extract_nameservers(payload),
    }
}

/// Registry dates arrive as RFC 3339, `YYYY-MM-DD HH:MM:SS` or `YYYY-MM-DD`
pub fn parse_registry_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(parsed.and_utc());
        }
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|datetime| datetime.and_utc())
}

fn first_date(payload: &Value, keys: &[&str]) -> Option<DateTime<Utc>> {
    keys.iter()
        .filter_map(|key| payload.get(*key))
        .find_map(|value| match value {
            Value::String(s) => parse_registry_date(s),
            // Some registries return a list of dates, the first one is authoritative
            Value::Array(items) => items.first()?.as_str().and_then(parse_registry_date),
            _ => None,
        })
}

fn extract_registrar(payload: &Value) -> Option<String> {
    let registrar = payload.get("registrar")?;
    let name = match registrar {
        Value::String(s) => Some(s.as_str()),
        Value::Object(_) => registrar.get("name").and_then(Value::as_str),
        _ => None,
    }?;

    let name = name.trim();
    (!name.is_empty()).then(|| name.to_string())
}

fn detect_privacy(payload: &Value) -> Option<bool> {
    if let Some(flag) = payload.get("privacy").and_then(Value::as_bool) {
        return Some(flag);
    }

    let registrant = payload
        .get("contacts")
        .and_then(|c| c.get("owner").or_else(|| c.get("registrant")))
        .and_then(|owner| match owner {
            Value::Array(items) => items.first(),
            other => Some(other),
        })
        .or_else(|| payload.get("registrant"))?;

    let text = ["name", "organization", "organisation"]
        .iter()
        .filter_map(|key| registrant.get(*key).and_then(Value::as_str))
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();

    if text.is_empty() {
        return None;
    }

    Some(PRIVACY_MARKERS.iter().any(|marker| text.contains(marker)))
}

fn extract_nameservers(payload: &Value) -> Vec<String> {
    let Some(value) = payload.get("nameservers").or_else(|| payload.get("nameserver")) else {
        return Vec::new();
    };

    match value {
        Value::Array(items) => items
            .iter()
            .filter_map(Value::as_str)
            .map(|ns| ns.trim().to_lowercase())
            .filter(|ns| !ns.is_empty())
            .collect(),
        Value::String(s) => s
            .split([',', ' '])
            .map(|ns| ns.trim().to_lowercase())
            .filter(|ns| !ns.is_empty())
            .collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_parses_registry_date_formats() {
        let expected = Utc.with_ymd_and_hms(2020, 3, 15, 0, 0, 0).unwrap();
        assert_eq!(parse_registry_date("2020-03-15T00:00:00Z"), Some(expected));
        assert_eq!(parse_registry_date("2020-03-15 00:00:00"), Some(expected));
        assert_eq!(parse_registry_date("2020-03-15"), Some(expected));
        assert_eq!(parse_registry_date("15/03/2020"), None);
        assert_eq!(parse_registry_date(""), None);
    }

    #[test]
    fn test_extracts_full_record() {
        let payload = json!({
            "created_date": "1995-08-14 04:00:00",
            "updated_date": "2023-08-14T07:01:38Z",
            "expiry_date": "2025-08-13",
            "registrar": { "name": "RESERVED-Internet Assigned Numbers Authority" },
            "privacy": false,
            "nameservers": ["A.IANA-SERVERS.NET", "b.iana-servers.net"]
        });

        let facts = extract_registration(&payload, now());
        assert!(facts.age_days.unwrap() > 10_000);
        assert_eq!(
            facts.registrar.as_deref(),
            Some("RESERVED-Internet Assigned Numbers Authority")
        );
        assert_eq!(facts.privacy_protected, Some(false));
        assert_eq!(facts.nameservers, vec!["a.iana-servers.net", "b.iana-servers.net"]);
        assert!(facts.expires_at.is_some());
        assert!(facts.ip_address.is_none());
    }

    #[test]
    fn test_missing_creation_date_leaves_age_unknown() {
        let payload = json!({ "registrar": "Example Registrar" });
        let facts = extract_registration(&payload, now());
        assert_eq!(facts.age_days, None);
        assert_eq!(facts.registrar.as_deref(), Some("Example Registrar"));
    }

    #[test]
    fn test_future_creation_date_is_unknown() {
        let payload = json!({ "created_date": "2030-01-01" });
        assert_eq!(extract_registration(&payload, now()).age_days, None);
    }

    #[test]
    fn test_privacy_service_registrant() {
        let payload = json!({
            "created_date": "2024-05-29",
            "contacts": { "owner": [{ "name": "REDACTED FOR PRIVACY", "organization": "Privacy service provided by Withheld for Privacy ehf" }] }
        });

        let facts = extract_registration(&payload, now());
        assert_eq!(facts.age_days, Some(3));
        assert_eq!(facts.privacy_protected, Some(true));
        assert!(facts.is_privacy_protected());
    }
}
