//! Configuration handling for the application.
//!
//! Everything is read from environment variables once at startup. Optional
//! knobs fall back to defaults; credentials and peer endpoints are mandatory
//! for the binaries that need them and their absence is fatal.

use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Environment variable names. Public so tests and the debug endpoint can
/// refer to them.
pub const ENV_BIND_ADDR: &str = "BIND_ADDR";
pub const ENV_LISTINGS_BASE_URL: &str = "LISTINGS_BASE_URL";
pub const ENV_NOTIFY_CONCURRENCY: &str = "NOTIFY_CONCURRENCY";
pub const ENV_SCRAPE_DEADLINE_SECS: &str = "SCRAPE_DEADLINE_SECS";
pub const ENV_NOTIFICATION_SUBJECT: &str = "NOTIFICATION_SUBJECT";
pub const ENV_STORE: &str = "STORE";
pub const ENV_FIRESTORE_BASE_URL: &str = "FIRESTORE_BASE_URL";
pub const ENV_FIRESTORE_EMULATOR_HOST: &str = "FIRESTORE_EMULATOR_HOST";

pub const ENV_SCRAPER_FUNCTION_URL: &str = "SCRAPER_FUNCTION_URL";
pub const ENV_DATABASE_FUNCTION_URL: &str = "DATABASE_FUNCTION_URL";
pub const ENV_EMAIL_FUNCTION_URL: &str = "EMAIL_FUNCTION_URL";

pub const ENV_EMAIL_ADDRESS: &str = "EMAIL_ADDRESS";
pub const ENV_EMAIL_PASSWORD: &str = "EMAIL_PASSWORD";
pub const ENV_SMTP_SERVER: &str = "SMTP_SERVER";
pub const ENV_SMTP_PORT: &str = "SMTP_PORT";
pub const ENV_NOTIFICATION_EMAIL: &str = "NOTIFICATION_EMAIL";

pub const FIREBASE_ENV_VARS: [&str; 11] = [
    "FIREBASE_TYPE",
    "FIREBASE_PROJECT_ID",
    "FIREBASE_PRIVATE_KEY_ID",
    "FIREBASE_PRIVATE_KEY",
    "FIREBASE_CLIENT_EMAIL",
    "FIREBASE_CLIENT_ID",
    "FIREBASE_AUTH_URI",
    "FIREBASE_TOKEN_URI",
    "FIREBASE_AUTH_PROVIDER_X509_CERT_URL",
    "FIREBASE_CLIENT_X509_CERT_URL",
    "FIREBASE_UNIVERSE_DOMAIN",
];

pub const SMTP_ENV_VARS: [&str; 5] = [
    ENV_EMAIL_ADDRESS,
    ENV_EMAIL_PASSWORD,
    ENV_SMTP_SERVER,
    ENV_SMTP_PORT,
    ENV_NOTIFICATION_EMAIL,
];

pub const PEER_ENV_VARS: [&str; 3] = [
    ENV_SCRAPER_FUNCTION_URL,
    ENV_DATABASE_FUNCTION_URL,
    ENV_EMAIL_FUNCTION_URL,
];

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8000";
const DEFAULT_LISTINGS_BASE_URL: &str = "https://www.polovniautomobili.com";
const DEFAULT_NOTIFY_CONCURRENCY: usize = 4;
const DEFAULT_SCRAPE_DEADLINE_SECS: u64 = 120;
const DEFAULT_NOTIFICATION_SUBJECT: &str = "New Car Listed";
const DEFAULT_FIRESTORE_BASE_URL: &str = "https://firestore.googleapis.com/v1";

/// Errors that can occur while building a configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value for '{field}': {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

/// Settings shared by every binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerSettings {
    pub bind_addr: String,
    pub listings_base_url: String,
    pub notify_concurrency: usize,
    pub deadline: Duration,
    pub subject: String,
}

/// Service-account credentials for the document store.
#[derive(Clone, PartialEq, Eq)]
pub struct FirebaseCredentials {
    pub account_type: String,
    pub project_id: String,
    pub private_key_id: String,
    pub private_key: String,
    pub client_email: String,
    pub client_id: String,
    pub auth_uri: String,
    pub token_uri: String,
    pub auth_provider_x509_cert_url: String,
    pub client_x509_cert_url: String,
    pub universe_domain: String,
}

impl fmt::Debug for FirebaseCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FirebaseCredentials")
            .field("account_type", &self.account_type)
            .field("project_id", &self.project_id)
            .field("private_key_id", &self.private_key_id)
            .field("private_key", &"<redacted>")
            .field("client_email", &self.client_email)
            .field("token_uri", &self.token_uri)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirestoreSettings {
    pub credentials: FirebaseCredentials,
    pub base_url: String,
    /// `host:port` of a local emulator; disables OAuth when set.
    pub emulator_host: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackend {
    Firestore(FirestoreSettings),
    Memory,
}

#[derive(Clone, PartialEq, Eq)]
pub struct SmtpSettings {
    pub from_address: String,
    pub password: String,
    pub server: String,
    pub port: u16,
    pub recipient: String,
}

impl fmt::Debug for SmtpSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmtpSettings")
            .field("from_address", &self.from_address)
            .field("password", &"<redacted>")
            .field("server", &self.server)
            .field("port", &self.port)
            .field("recipient", &self.recipient)
            .finish()
    }
}

/// Base URLs of the component services in a split deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerEndpoints {
    pub scraper_url: String,
    pub database_url: String,
    pub email_url: String,
}

/// Configuration of the all-in-one server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub server: ServerSettings,
    pub store: StoreBackend,
    pub smtp: SmtpSettings,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let vars = Vars(&lookup);
        Ok(Self {
            server: ServerSettings::load(&vars)?,
            store: StoreBackend::load(&vars)?,
            smtp: SmtpSettings::load(&vars)?,
        })
    }
}

/// Configuration of the gateway, which reaches every component over HTTP.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayConfig {
    pub server: ServerSettings,
    pub peers: PeerEndpoints,
}

impl GatewayConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let vars = Vars(&lookup);
        Ok(Self {
            server: ServerSettings::load(&vars)?,
            peers: PeerEndpoints {
                scraper_url: vars.url(ENV_SCRAPER_FUNCTION_URL)?,
                database_url: vars.url(ENV_DATABASE_FUNCTION_URL)?,
                email_url: vars.url(ENV_EMAIL_FUNCTION_URL)?,
            },
        })
    }
}

/// Presence (never the value) of every variable the system reads.
pub fn env_presence() -> Vec<(&'static str, bool)> {
    FIREBASE_ENV_VARS
        .iter()
        .chain(SMTP_ENV_VARS.iter())
        .chain(PEER_ENV_VARS.iter())
        .map(|&name| (name, env::var(name).is_ok_and(|v| !v.is_empty())))
        .collect()
}

struct Vars<'a>(&'a dyn Fn(&str) -> Option<String>);

impl Vars<'_> {
    fn get(&self, name: &str) -> Option<String> {
        (self.0)(name).filter(|v| !v.trim().is_empty())
    }

    fn required(&self, name: &'static str) -> Result<String, ConfigError> {
        self.get(name).ok_or(ConfigError::Missing(name))
    }

    fn or(&self, name: &str, default: &str) -> String {
        self.get(name).unwrap_or_else(|| default.to_string())
    }

    fn parsed<T>(&self, name: &'static str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        match self.get(name) {
            Some(raw) => parse(name, &raw),
            None => Ok(default),
        }
    }

    fn url(&self, name: &'static str) -> Result<String, ConfigError> {
        let raw = self.required(name)?;
        url::Url::parse(&raw).map_err(|e| ConfigError::InvalidValue {
            field: name,
            reason: e.to_string(),
        })?;
        Ok(raw.trim_end_matches('/').to_string())
    }
}

fn parse<T>(field: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
        field,
        reason: e.to_string(),
    })
}

impl ServerSettings {
    fn load(vars: &Vars<'_>) -> Result<Self, ConfigError> {
        let notify_concurrency = vars.parsed(ENV_NOTIFY_CONCURRENCY, DEFAULT_NOTIFY_CONCURRENCY)?;
        if notify_concurrency == 0 {
            return Err(ConfigError::InvalidValue {
                field: ENV_NOTIFY_CONCURRENCY,
                reason: "must be at least 1".to_string(),
            });
        }
        let deadline_secs = vars.parsed(ENV_SCRAPE_DEADLINE_SECS, DEFAULT_SCRAPE_DEADLINE_SECS)?;

        Ok(Self {
            bind_addr: vars.or(ENV_BIND_ADDR, DEFAULT_BIND_ADDR),
            listings_base_url: vars.or(ENV_LISTINGS_BASE_URL, DEFAULT_LISTINGS_BASE_URL),
            notify_concurrency,
            deadline: Duration::from_secs(deadline_secs),
            subject: vars.or(ENV_NOTIFICATION_SUBJECT, DEFAULT_NOTIFICATION_SUBJECT),
        })
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            listings_base_url: DEFAULT_LISTINGS_BASE_URL.to_string(),
            notify_concurrency: DEFAULT_NOTIFY_CONCURRENCY,
            deadline: Duration::from_secs(DEFAULT_SCRAPE_DEADLINE_SECS),
            subject: DEFAULT_NOTIFICATION_SUBJECT.to_string(),
        }
    }
}

impl StoreBackend {
    fn load(vars: &Vars<'_>) -> Result<Self, ConfigError> {
        match vars.or(ENV_STORE, "firestore").to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "firestore" => Ok(Self::Firestore(FirestoreSettings {
                credentials: FirebaseCredentials::load(vars)?,
                base_url: vars
                    .or(ENV_FIRESTORE_BASE_URL, DEFAULT_FIRESTORE_BASE_URL)
                    .trim_end_matches('/')
                    .to_string(),
                emulator_host: vars.get(ENV_FIRESTORE_EMULATOR_HOST),
            })),
            other => Err(ConfigError::InvalidValue {
                field: ENV_STORE,
                reason: format!("unknown store '{other}', expected 'firestore' or 'memory'"),
            }),
        }
    }
}

impl FirebaseCredentials {
    fn load(vars: &Vars<'_>) -> Result<Self, ConfigError> {
        let [
            account_type,
            project_id,
            private_key_id,
            private_key,
            client_email,
            client_id,
            auth_uri,
            token_uri,
            auth_provider_x509_cert_url,
            client_x509_cert_url,
            universe_domain,
        ] = FIREBASE_ENV_VARS;

        Ok(Self {
            account_type: vars.required(account_type)?,
            project_id: vars.required(project_id)?,
            private_key_id: vars.required(private_key_id)?,
            // Keys are usually stored on one line with escaped newlines
            private_key: vars.required(private_key)?.replace("\\n", "\n"),
            client_email: vars.required(client_email)?,
            client_id: vars.required(client_id)?,
            auth_uri: vars.required(auth_uri)?,
            token_uri: vars.required(token_uri)?,
            auth_provider_x509_cert_url: vars.required(auth_provider_x509_cert_url)?,
            client_x509_cert_url: vars.required(client_x509_cert_url)?,
            universe_domain: vars.required(universe_domain)?,
        })
    }
}

impl SmtpSettings {
    fn load(vars: &Vars<'_>) -> Result<Self, ConfigError> {
        Ok(Self {
            from_address: vars.required(ENV_EMAIL_ADDRESS)?,
            password: vars.required(ENV_EMAIL_PASSWORD)?,
            server: vars.required(ENV_SMTP_SERVER)?,
            port: parse(ENV_SMTP_PORT, &vars.required(ENV_SMTP_PORT)?)?,
            recipient: vars.required(ENV_NOTIFICATION_EMAIL)?,
        })
    }
}
