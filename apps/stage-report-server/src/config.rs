use anyhow::{Context, Result};
use chrono::FixedOffset;
use std::path::PathBuf;
use std::time::Duration;

use crate::services::report::assembler::ReportShape;
use crate::services::report::groups::StageGroupTable;
use crate::services::report::ReportSettings;
use crate::store::StoreBackend;
use crate::time::{report_offset, DEFAULT_REPORT_OFFSET_MINUTES};

const DEFAULT_SCAN_TIMEOUT_SECONDS: u64 = 30;
const MAX_SCAN_TIMEOUT_SECONDS: u64 = 600;
// FixedOffset accepts anything under a day; civil offsets stay within -12:00..=+14:00.
const MIN_UTC_OFFSET_MINUTES: i32 = -12 * 60;
const MAX_UTC_OFFSET_MINUTES: i32 = 14 * 60;

#[derive(Debug, Clone)]
pub struct ReportConfig {
    pub store_backend: StoreBackend,
    pub database_url: Option<String>,
    pub store_schema: String,
    pub fixture_path: Option<PathBuf>,
    pub scan_timeout_seconds: u64,
    pub utc_offset_minutes: i32,
    pub report_shape: ReportShape,
    pub filtered_collections: Vec<String>,
    pub stage_groups_path: Option<PathBuf>,
}

impl ReportConfig {
    pub fn from_env(cli_fixture: Option<PathBuf>) -> Result<Self> {
        let database_url = env_optional_string("CORE_DATABASE_URL");
        let fixture_path = cli_fixture.or_else(|| env_optional_path("CORE_FIXTURE_PATH"));
        let store_backend = match env_optional_string("CORE_STORE_BACKEND") {
            Some(raw) => raw
                .parse::<StoreBackend>()
                .map_err(anyhow::Error::msg)
                .context("invalid CORE_STORE_BACKEND")?,
            None if database_url.is_some() => StoreBackend::Postgres,
            None => StoreBackend::Memory,
        };
        let store_schema = env_string("CORE_STORE_SCHEMA", "public");
        let scan_timeout_seconds = env_u64("CORE_SCAN_TIMEOUT_SECONDS", DEFAULT_SCAN_TIMEOUT_SECONDS)
            .clamp(1, MAX_SCAN_TIMEOUT_SECONDS);
        let utc_offset_minutes =
            env_i32("CORE_REPORT_UTC_OFFSET_MINUTES", DEFAULT_REPORT_OFFSET_MINUTES)
                .clamp(MIN_UTC_OFFSET_MINUTES, MAX_UTC_OFFSET_MINUTES);
        let report_shape = match env_optional_string("CORE_REPORT_SHAPE") {
            Some(raw) => raw
                .parse::<ReportShape>()
                .map_err(anyhow::Error::msg)
                .context("invalid CORE_REPORT_SHAPE")?,
            None => ReportShape::default(),
        };
        let filtered_collections = env_list("CORE_FILTERED_COLLECTIONS");
        let stage_groups_path = env_optional_path("CORE_STAGE_GROUPS_PATH");

        let config = Self {
            store_backend,
            database_url,
            store_schema,
            fixture_path,
            scan_timeout_seconds,
            utc_offset_minutes,
            report_shape,
            filtered_collections,
            stage_groups_path,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        match self.store_backend {
            StoreBackend::Postgres if self.database_url.is_none() => {
                anyhow::bail!("CORE_DATABASE_URL must be set when CORE_STORE_BACKEND=postgres");
            }
            StoreBackend::Postgres if self.store_schema.trim().is_empty() => {
                anyhow::bail!("CORE_STORE_SCHEMA resolved to an empty value");
            }
            _ => {}
        }
        self.report_offset()?;
        Ok(())
    }

    pub fn report_offset(&self) -> Result<FixedOffset> {
        report_offset(self.utc_offset_minutes).with_context(|| {
            format!(
                "CORE_REPORT_UTC_OFFSET_MINUTES={} is not a valid UTC offset",
                self.utc_offset_minutes
            )
        })
    }

    pub fn scan_timeout(&self) -> Duration {
        Duration::from_secs(self.scan_timeout_seconds)
    }

    /// Built-in collection → stage table with any file overrides applied.
    pub fn stage_group_table(&self) -> Result<StageGroupTable> {
        let table = StageGroupTable::builtin();
        match self.stage_groups_path.as_deref() {
            Some(path) => table.load_overrides(path),
            None => Ok(table),
        }
    }

    pub fn report_settings(&self) -> Result<ReportSettings> {
        Ok(ReportSettings {
            offset: self.report_offset()?,
            shape: self.report_shape,
            scan_timeout: self.scan_timeout(),
            filtered_collections: self.filtered_collections.clone(),
        })
    }

    /// Effective settings for `--print-config`. The database URL is reduced to a flag.
    pub fn summary(&self) -> serde_json::Value {
        serde_json::json!({
            "store_backend": self.store_backend.as_str(),
            "database_configured": self.database_url.is_some(),
            "store_schema": self.store_schema,
            "fixture_path": self.fixture_path.as_ref().map(|path| path.display().to_string()),
            "scan_timeout_seconds": self.scan_timeout_seconds,
            "utc_offset_minutes": self.utc_offset_minutes,
            "report_shape": self.report_shape.as_str(),
            "filtered_collections": self.filtered_collections,
            "stage_groups_path": self
                .stage_groups_path
                .as_ref()
                .map(|path| path.display().to_string()),
        })
    }
}

fn env_string(key: &str, default: &str) -> String {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn env_optional_string(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|value| value.trim().parse::<u64>().ok())
        .unwrap_or(default)
}

fn env_i32(key: &str, default: i32) -> i32 {
    std::env::var(key)
        .ok()
        .and_then(|value| value.trim().parse::<i32>().ok())
        .unwrap_or(default)
}

fn env_optional_path(key: &str) -> Option<PathBuf> {
    env_optional_string(key).map(PathBuf::from)
}

fn env_list(key: &str) -> Vec<String> {
    env_optional_string(key)
        .map(|value| parse_list(&value))
        .unwrap_or_default()
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}
