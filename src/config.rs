//! Credentials and environment configuration.
//!
//! Credentials are read once (from the process environment, optionally seeded
//! from a `.env` file) and handed to the HTTP client explicitly. They are never
//! printed: `Debug` is redacted and the status report only says whether a value
//! is present.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

pub const ENV_DATA_GOV_API_KEY: &str = "DATA_GOV_API_KEY";
pub const ENV_FLIGHTAWARE_API_KEY: &str = "FLIGHTAWARE_API_KEY";
pub const ENV_OPENSKY_USER: &str = "OPENSKY_USER";
pub const ENV_OPENSKY_PASS: &str = "OPENSKY_PASS";
pub const ENV_NOAA_USER_AGENT: &str = "NOAA_USER_AGENT";

static EMAIL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email regex is valid"));

#[derive(Clone, Default)]
pub struct Credentials {
    pub data_gov_api_key: Option<String>,
    pub flightaware_api_key: Option<String>,
    pub opensky: Option<(String, String)>,
    pub noaa_user_agent: Option<String>,
}

impl Credentials {
    /// Load from the environment, reading `.env` first without overriding
    /// variables that are already set.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let opensky = match (get(ENV_OPENSKY_USER), get(ENV_OPENSKY_PASS)) {
            (Some(user), Some(pass)) => Some((user, pass)),
            _ => None,
        };
        Self {
            data_gov_api_key: get(ENV_DATA_GOV_API_KEY),
            flightaware_api_key: get(ENV_FLIGHTAWARE_API_KEY),
            opensky,
            noaa_user_agent: get(ENV_NOAA_USER_AGENT),
        }
    }

    /// Summarize which credentials are configured, one entry per source.
    pub fn status_report(&self) -> Vec<CredentialStatus> {
        let mut out = Vec::new();

        out.push(match &self.data_gov_api_key {
            Some(_) => CredentialStatus::new(
                "Data.gov",
                "Present",
                Severity::Success,
                "API key configured for higher request limits.",
            ),
            None => CredentialStatus::new(
                "Data.gov",
                "Optional",
                Severity::Warn,
                "Set DATA_GOV_API_KEY to avoid anonymous rate limits.",
            ),
        });

        out.push(match self.noaa_user_agent.as_deref() {
            Some(ua) if EMAIL_PATTERN.is_match(ua) => CredentialStatus::new(
                "NOAA User-Agent",
                "OK",
                Severity::Success,
                "Using configured email for weather requests.",
            ),
            Some(_) => CredentialStatus::new(
                "NOAA User-Agent",
                "Invalid",
                Severity::Error,
                "Provide a valid email (e.g. yourname@example.com).",
            ),
            None => CredentialStatus::new(
                "NOAA User-Agent",
                "Missing",
                Severity::Error,
                "Set NOAA_USER_AGENT to an email to avoid request rejections.",
            ),
        });

        out.push(CredentialStatus::new(
            "TSA Throughput",
            "Public",
            Severity::Success,
            "Dataset is public and requires no credentials.",
        ));

        out.push(match &self.opensky {
            Some(_) => CredentialStatus::new(
                "OpenSky",
                "Configured",
                Severity::Success,
                "Basic-auth credentials ready for opensky-network.org requests.",
            ),
            None => CredentialStatus::new(
                "OpenSky",
                "Not configured",
                Severity::Info,
                "Optional: set OPENSKY_USER and OPENSKY_PASS when needed.",
            ),
        });

        out.push(match &self.flightaware_api_key {
            Some(_) => CredentialStatus::new(
                "FlightAware",
                "Configured",
                Severity::Success,
                "API key present for FlightAware requests.",
            ),
            None => CredentialStatus::new(
                "FlightAware",
                "Not configured",
                Severity::Info,
                "Optional: add FLIGHTAWARE_API_KEY when ready.",
            ),
        });

        out
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        fn mask<T>(v: &Option<T>) -> &'static str {
            if v.is_some() { "<redacted>" } else { "<unset>" }
        }
        f.debug_struct("Credentials")
            .field("data_gov_api_key", &mask(&self.data_gov_api_key))
            .field("flightaware_api_key", &mask(&self.flightaware_api_key))
            .field("opensky", &mask(&self.opensky))
            .field("noaa_user_agent", &self.noaa_user_agent)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Success,
    Info,
    Warn,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CredentialStatus {
    pub name: &'static str,
    pub status: &'static str,
    pub severity: Severity,
    pub message: &'static str,
}

impl CredentialStatus {
    fn new(name: &'static str, status: &'static str, severity: Severity, message: &'static str) -> Self {
        Self {
            name,
            status,
            severity,
            message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn creds(pairs: &[(&str, &str)]) -> Credentials {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Credentials::from_lookup(|k| map.get(k).cloned())
    }

    #[test]
    fn blank_values_are_unset_and_opensky_needs_both_parts() {
        let c = creds(&[(ENV_DATA_GOV_API_KEY, "   "), (ENV_OPENSKY_USER, "pilot")]);
        assert!(c.data_gov_api_key.is_none());
        assert!(c.opensky.is_none());
    }

    #[test]
    fn debug_output_never_contains_secrets() {
        let c = creds(&[
            (ENV_DATA_GOV_API_KEY, "secret-key-123"),
            (ENV_OPENSKY_USER, "pilot"),
            (ENV_OPENSKY_PASS, "hunter2"),
        ]);
        let dbg = format!("{c:?}");
        assert!(!dbg.contains("secret-key-123"));
        assert!(!dbg.contains("hunter2"));
        assert!(dbg.contains("<redacted>"));
    }

    #[test]
    fn user_agent_must_look_like_an_email() {
        let ok = creds(&[(ENV_NOAA_USER_AGENT, "ops@example.com")]).status_report();
        assert_eq!(ok[1].status, "OK");
        let bad = creds(&[(ENV_NOAA_USER_AGENT, "not an email")]).status_report();
        assert_eq!(bad[1].severity, Severity::Error);
        let missing = creds(&[]).status_report();
        assert_eq!(missing[1].status, "Missing");
        assert_eq!(missing.len(), 5);
    }
}
