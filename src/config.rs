//! Configuration for Proof of Peacemaking
//!
//! CLI arguments and environment variable handling using clap. Object
//! storage buckets are discovered by scanning the environment for
//! `R2_<TYPE>_*` groups.

use clap::Parser;
use reqwest::Url;
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::time::Duration;

/// Proof of Peacemaking API server
#[derive(Parser, Debug, Clone)]
#[command(name = "peacemaking")]
#[command(about = "Expressions, acknowledgements and proofs of peacemaking")]
pub struct Args {
    /// Address to listen on
    #[arg(long, env = "LISTEN", default_value = "0.0.0.0:8080")]
    pub listen: SocketAddr,

    /// Development mode (in-memory stores when MongoDB is unavailable)
    #[arg(long, env = "DEV_MODE", default_value = "false")]
    pub dev_mode: bool,

    /// MongoDB connection URI
    #[arg(long, env = "MONGODB_URI", default_value = "mongodb://localhost:27017")]
    pub mongodb_uri: String,

    /// MongoDB database name
    #[arg(long, env = "MONGODB_DB", default_value = "proofofpeacemaking")]
    pub mongodb_db: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Log format: text or json
    #[arg(long, env = "LOG_FORMAT", default_value = "text")]
    pub log_format: String,

    /// Per-request deadline in milliseconds
    #[arg(long, env = "REQUEST_TIMEOUT_MS", default_value = "30000")]
    pub request_timeout_ms: u64,

    /// Seconds between expired-session sweeps
    #[arg(long, env = "SESSION_SWEEP_INTERVAL_SECS", default_value = "300")]
    pub session_sweep_interval_secs: u64,

    /// WebAuthn relying-party id (the site's domain)
    #[arg(long, env = "WEBAUTHN_RP_ID", default_value = "localhost")]
    pub webauthn_rp_id: String,

    /// WebAuthn relying-party origin
    #[arg(long, env = "WEBAUTHN_RP_ORIGIN", default_value = "http://localhost:8080")]
    pub webauthn_rp_origin: String,

    /// WebAuthn relying-party display name
    #[arg(long, env = "WEBAUTHN_RP_NAME", default_value = "Proof of Peacemaking")]
    pub webauthn_rp_name: String,

    /// LiveKit server URL
    #[arg(long, env = "LIVEKIT_HOST")]
    pub livekit_host: Option<String>,

    #[arg(long, env = "LIVEKIT_API_KEY")]
    pub livekit_api_key: Option<String>,

    #[arg(long, env = "LIVEKIT_API_SECRET")]
    pub livekit_api_secret: Option<String>,

    /// Sender address for outbound mail
    #[arg(long, env = "EMAIL_SENDER_ADDRESS")]
    pub email_sender_address: Option<String>,

    /// Recipient of contact-form mail
    #[arg(long, env = "CONTACT_EMAIL_RECIPIENT_ADDRESS")]
    pub contact_email_recipient_address: Option<String>,

    /// YouTube Data API key for the playlist helper
    #[arg(long, env = "YOUTUBE_API_KEY")]
    pub youtube_api_key: Option<String>,
}

/// LiveKit connection settings, present only when fully configured
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveKitConfig {
    pub host: String,
    pub api_key: String,
    pub api_secret: String,
}

/// One object storage bucket discovered from `R2_<TYPE>_*`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct R2Bucket {
    /// Lowercased `<TYPE>`, e.g. `images`
    pub kind: String,
    pub access_key: String,
    pub secret_key: String,
    pub account_id: String,
    pub bucket: String,
}

const R2_FIELDS: [&str; 4] = ["ACCESS_KEY", "SECRET_KEY", "ACCOUNT_ID", "BUCKET"];

/// Group `R2_<TYPE>_<FIELD>` variables by type.
///
/// Every group must carry all four fields.
pub fn discover_r2_buckets<I>(vars: I) -> Result<Vec<R2Bucket>, String>
where
    I: IntoIterator<Item = (String, String)>,
{
    let mut groups: BTreeMap<String, BTreeMap<&'static str, String>> = BTreeMap::new();

    for (key, value) in vars {
        let Some(rest) = key.strip_prefix("R2_") else {
            continue;
        };
        for field in R2_FIELDS {
            if let Some(kind) = rest.strip_suffix(field).and_then(|k| k.strip_suffix('_')) {
                if !kind.is_empty() {
                    groups
                        .entry(kind.to_ascii_lowercase())
                        .or_default()
                        .insert(field, value.clone());
                }
                break;
            }
        }
    }

    groups
        .into_iter()
        .map(|(kind, mut fields)| {
            let mut take = |field: &str| {
                fields.remove(field).filter(|v| !v.is_empty()).ok_or_else(|| {
                    format!(
                        "R2_{}_{} is required when other R2_{}_* variables are set",
                        kind.to_ascii_uppercase(),
                        field,
                        kind.to_ascii_uppercase()
                    )
                })
            };
            Ok(R2Bucket {
                access_key: take("ACCESS_KEY")?,
                secret_key: take("SECRET_KEY")?,
                account_id: take("ACCOUNT_ID")?,
                bucket: take("BUCKET")?,
                kind: kind.clone(),
            })
        })
        .collect()
}

impl Args {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn session_sweep_interval(&self) -> Duration {
        Duration::from_secs(self.session_sweep_interval_secs.max(1))
    }

    /// LiveKit settings if all three variables are set
    pub fn livekit(&self) -> Option<LiveKitConfig> {
        match (
            &self.livekit_host,
            &self.livekit_api_key,
            &self.livekit_api_secret,
        ) {
            (Some(host), Some(api_key), Some(api_secret)) => Some(LiveKitConfig {
                host: host.clone(),
                api_key: api_key.clone(),
                api_secret: api_secret.clone(),
            }),
            _ => None,
        }
    }

    /// Buckets configured in the process environment
    pub fn r2_buckets(&self) -> Result<Vec<R2Bucket>, String> {
        discover_r2_buckets(std::env::vars())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        Url::parse(&self.webauthn_rp_origin)
            .map_err(|e| format!("WEBAUTHN_RP_ORIGIN is not a valid URL: {}", e))?;

        let livekit_set = [
            &self.livekit_host,
            &self.livekit_api_key,
            &self.livekit_api_secret,
        ]
        .iter()
        .filter(|v| v.is_some())
        .count();
        if livekit_set != 0 && livekit_set != 3 {
            return Err(
                "LIVEKIT_HOST, LIVEKIT_API_KEY and LIVEKIT_API_SECRET must be set together"
                    .to_string(),
            );
        }

        if self.request_timeout_ms == 0 {
            return Err("REQUEST_TIMEOUT_MS must be greater than zero".to_string());
        }

        if !matches!(self.log_format.as_str(), "text" | "json") {
            return Err("LOG_FORMAT must be text or json".to_string());
        }

        self.r2_buckets()?;

        Ok(())
    }
}
