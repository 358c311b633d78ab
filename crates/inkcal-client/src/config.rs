//! Client configuration.
//!
//! All settings live in a single `config.toml` file at
//! `~/.config/inkcal/config.toml` by default:
//!
//! ```toml
//! [calendar]
//! timezone = "Europe/Berlin"
//! output = "calendar-condensed.json"
//!
//! [graph]
//! tenant_id = "contoso.onmicrosoft.com"
//! client_id = "env::INKCAL_CLIENT_ID"
//! client_secret = "pass::work/inkcal"
//! user_id = "someone@contoso.com"
//!
//! [ble]
//! name_prefix = "InkCal"
//! chunk_size = 180
//! ```
//!
//! Credential values (`client_id`, `client_secret`, `access_token`) support
//! secret references, see [`crate::secret`]. Command-line flags override the
//! file; [`PipelineConfig::resolve`] produces the merged result.

use std::path::{Path, PathBuf};
use std::time::Duration;

use inkcal_ble::{
    DEFAULT_CHARACTERISTIC_UUID, DEFAULT_SERVICE_UUID, DiscoveryConfig, GattTarget, Thresholds,
    TransferSettings,
};
use inkcal_core::LocalZone;
use inkcal_protocol::DEFAULT_MAX_PAYLOAD;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::cli::Cli;
use crate::error::{ClientError, ClientResult};

// ---------------------------------------------------------------------------
// ClientConfig (config.toml)
// ---------------------------------------------------------------------------

/// Configuration for the inkcal client.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Calendar and condensing settings.
    pub calendar: CalendarSettings,

    /// Microsoft Graph settings.
    pub graph: Option<GraphSettings>,

    /// Discovery and transfer settings.
    pub ble: BleSettings,
}

/// Calendar window and output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CalendarSettings {
    /// IANA timezone for condensed times.
    pub timezone: String,

    /// Where the condensed JSON is written.
    pub output: PathBuf,

    /// Days before today included in the window.
    pub lookback_days: u32,

    /// Length of the window in days.
    pub days: u32,
}

impl Default for CalendarSettings {
    fn default() -> Self {
        Self {
            timezone: "Europe/Berlin".to_string(),
            output: PathBuf::from("calendar-condensed.json"),
            lookback_days: 1,
            days: 7,
        }
    }
}

/// Microsoft Graph provider settings.
///
/// Either `access_token`, or all of `tenant_id`, `client_id` and
/// `client_secret`, must be set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphSettings {
    pub tenant_id: Option<String>,

    /// Application (client) ID (supports `pass::` and `env::` prefixes).
    pub client_id: Option<String>,

    /// Client secret (supports `pass::` and `env::` prefixes).
    pub client_secret: Option<String>,

    /// Mailbox whose calendar is read (UPN or object id).
    pub user_id: Option<String>,

    /// Pre-issued bearer token (supports `pass::` and `env::` prefixes).
    pub access_token: Option<String>,
}

/// Discovery and transfer settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BleSettings {
    pub name_prefix: String,
    pub service_uuid: String,
    pub characteristic_uuid: String,
    pub address: Option<String>,
    /// Scan window in seconds.
    pub scan_timeout: u64,
    pub chunk_size: usize,
    pub max_payload: usize,
    pub force_ack: bool,
    /// Delay between chunks in seconds.
    pub chunk_delay: f64,
    pub thresholds: ThresholdSettings,
}

impl Default for BleSettings {
    fn default() -> Self {
        Self {
            name_prefix: DiscoveryConfig::DEFAULT_NAME_PREFIX.to_string(),
            service_uuid: DEFAULT_SERVICE_UUID.to_string(),
            characteristic_uuid: DEFAULT_CHARACTERISTIC_UUID.to_string(),
            address: None,
            scan_timeout: DiscoveryConfig::DEFAULT_SCAN_TIMEOUT_SECS,
            chunk_size: TransferSettings::DEFAULT_CHUNK_SIZE,
            max_payload: DEFAULT_MAX_PAYLOAD,
            force_ack: false,
            chunk_delay: 0.0,
            thresholds: ThresholdSettings::default(),
        }
    }
}

/// Transfer thresholds, see [`Thresholds`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdSettings {
    pub combined_max_frame: usize,
    pub large_payload: usize,
    pub large_chunk_cap: usize,
    pub large_min_delay_ms: u64,
    pub small_chunk_ack: usize,
}

impl Default for ThresholdSettings {
    fn default() -> Self {
        Self::from(Thresholds::default())
    }
}

impl From<Thresholds> for ThresholdSettings {
    fn from(t: Thresholds) -> Self {
        Self {
            combined_max_frame: t.combined_max_frame,
            large_payload: t.large_payload,
            large_chunk_cap: t.large_chunk_cap,
            large_min_delay_ms: u64::try_from(t.large_min_delay.as_millis()).unwrap_or(u64::MAX),
            small_chunk_ack: t.small_chunk_ack,
        }
    }
}

impl From<&ThresholdSettings> for Thresholds {
    fn from(t: &ThresholdSettings) -> Self {
        Self {
            combined_max_frame: t.combined_max_frame,
            large_payload: t.large_payload,
            large_chunk_cap: t.large_chunk_cap,
            large_min_delay: Duration::from_millis(t.large_min_delay_ms),
            small_chunk_ack: t.small_chunk_ack,
        }
    }
}

impl ClientConfig {
    /// Loads configuration from the default path, or defaults if it does not exist.
    pub fn load() -> ClientResult<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Loads configuration from a specific path.
    pub fn load_from(path: &Path) -> ClientResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ClientError::io(path, e))?;
        toml::from_str(&content).map_err(|e| {
            ClientError::Config(format!("failed to parse {}: {}", path.display(), e))
        })
    }

    /// Returns the default configuration file path.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("inkcal")
            .join("config.toml")
    }
}

#[cfg(feature = "graph")]
impl GraphSettings {
    /// Converts to provider configuration, resolving secret references.
    pub fn to_provider_config(&self) -> ClientResult<inkcal_providers::graph::GraphConfig> {
        use inkcal_providers::graph::{GraphConfig, GraphCredentials};

        let user_id = self.user_id.as_deref().ok_or_else(|| {
            ClientError::Config("user_id is missing from [graph] section".to_string())
        })?;

        let credentials = match (&self.access_token, &self.client_secret) {
            (Some(token), _) => GraphCredentials::AccessToken(resolve_secret("access_token", token)?),
            (None, Some(secret)) => GraphCredentials::ClientSecret {
                tenant_id: required("tenant_id", &self.tenant_id)?.to_string(),
                client_id: resolve_secret("client_id", required("client_id", &self.client_id)?)?,
                client_secret: resolve_secret("client_secret", secret)?,
            },
            (None, None) => {
                return Err(ClientError::Config(format!(
                    "Graph credentials not found. Add to {}:\n  \
                     [graph]\n  \
                     tenant_id = \"YOUR_TENANT\"\n  \
                     client_id = \"YOUR_APP_ID\"\n  \
                     client_secret = \"env::INKCAL_CLIENT_SECRET\"\n  \
                     user_id = \"you@example.com\"",
                    ClientConfig::default_path().display()
                )));
            }
        };

        let config = GraphConfig::new(credentials, user_id);
        config
            .validate()
            .map_err(|e| ClientError::Config(format!("invalid [graph] section: {}", e)))?;
        Ok(config)
    }
}

#[cfg(feature = "graph")]
fn required<'a>(field: &str, value: &'a Option<String>) -> ClientResult<&'a str> {
    value
        .as_deref()
        .ok_or_else(|| ClientError::Config(format!("{} is missing from [graph] section", field)))
}

#[cfg(feature = "graph")]
fn resolve_secret(field: &str, value: &str) -> ClientResult<String> {
    crate::secret::resolve(value)
        .map_err(|e| ClientError::Config(format!("failed to resolve {}: {}", field, e)))
}

// ---------------------------------------------------------------------------
// PipelineConfig (file merged with flags)
// ---------------------------------------------------------------------------

/// Where raw events come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventSource {
    /// Microsoft Graph, configured by `[graph]`.
    Graph,
    /// A saved calendarView response.
    File(PathBuf),
    /// Nothing is fetched; the condensed file is sent as is.
    Skip,
}

/// Everything one run needs, after merging the file with the flags.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub source: EventSource,
    pub zone: LocalZone,
    pub output: PathBuf,
    pub lookback_days: u32,
    pub days: u32,
    pub send: bool,
    pub send_time: bool,
    pub time_only: bool,
    pub max_payload: usize,
    pub discovery: DiscoveryConfig,
    pub target: GattTarget,
    pub transfer: TransferSettings,
}

impl PipelineConfig {
    /// Merges `file` with the flags in `cli`; flags win.
    pub fn resolve(cli: &Cli, file: &ClientConfig) -> ClientResult<Self> {
        let calendar = &file.calendar;
        let ble = &file.ble;

        let zone = LocalZone::parse(cli.timezone.as_deref().unwrap_or(&calendar.timezone))?;
        let days = cli.days.unwrap_or(calendar.days);
        if days == 0 {
            return Err(ClientError::Config("days must be at least 1".to_string()));
        }

        let source = if cli.skip_fetch || cli.time_only {
            EventSource::Skip
        } else if let Some(path) = &cli.events_file {
            EventSource::File(path.clone())
        } else {
            EventSource::Graph
        };

        let service = parse_uuid("service_uuid", &ble.service_uuid)?;
        let characteristic = parse_uuid("characteristic_uuid", &ble.characteristic_uuid)?;

        let discovery = DiscoveryConfig {
            name_prefix: cli
                .name_prefix
                .clone()
                .unwrap_or_else(|| ble.name_prefix.clone()),
            service_uuid: Some(service),
            address: cli.address.clone().or_else(|| ble.address.clone()),
            scan_timeout: Duration::from_secs(cli.scan_timeout.unwrap_or(ble.scan_timeout)),
        };

        let transfer = TransferSettings {
            chunk_size: cli.chunk_size.unwrap_or(ble.chunk_size),
            force_ack: cli.force_ack || ble.force_ack,
            chunk_delay: seconds("chunk_delay", cli.chunk_delay.unwrap_or(ble.chunk_delay))?,
            thresholds: Thresholds::from(&ble.thresholds),
        };
        transfer
            .validate()
            .map_err(|e| ClientError::Config(e.to_string()))?;

        let max_payload = cli.max_payload.unwrap_or(ble.max_payload);
        if max_payload == 0 {
            return Err(ClientError::Config(
                "max_payload must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            source,
            zone,
            output: cli.output.clone().unwrap_or_else(|| calendar.output.clone()),
            lookback_days: calendar.lookback_days,
            days,
            send: !cli.no_send,
            send_time: cli.send_time || cli.time_only,
            time_only: cli.time_only,
            max_payload,
            discovery,
            target: GattTarget {
                service,
                characteristic,
            },
            transfer,
        })
    }
}

fn parse_uuid(field: &str, value: &str) -> ClientResult<Uuid> {
    Uuid::parse_str(value.trim())
        .map_err(|e| ClientError::Config(format!("invalid {} {:?}: {}", field, value, e)))
}

fn seconds(field: &str, value: f64) -> ClientResult<Duration> {
    Duration::try_from_secs_f64(value).map_err(|_| {
        ClientError::Config(format!(
            "{} must be a non-negative number of seconds, got {}",
            field, value
        ))
    })
}
