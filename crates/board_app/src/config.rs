use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use board_core::{RetentionPolicy, DEFAULT_MAX_CONSECUTIVE_FAILURES};
use board_engine::{FetchSettings, WalkSettings};
use log::LevelFilter;
use serde::{Deserialize, Serialize};

use crate::Cli;

pub(crate) const DEFAULT_CONFIG_FILENAME: &str = "board_crawler.ron";

/// Run-wide retention and paging, chosen once per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RunProfile {
    pub retention: RetentionPolicy,
    pub page_cap: u32,
    /// Extra months added to every notice board's own lookback.
    pub notice_lookback_widening: u32,
}

impl RunProfile {
    pub fn standard() -> Self {
        Self {
            retention: RetentionPolicy::FutureOnly,
            page_cap: 20,
            notice_lookback_widening: 0,
        }
    }

    pub fn diagnostic() -> Self {
        Self {
            retention: RetentionPolicy::RollingWindow { months: 3 },
            page_cap: 50,
            notice_lookback_widening: 3,
        }
    }
}

impl fmt::Display for RunProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "retention {}, page cap {}", self.retention, self.page_cap)?;
        if self.notice_lookback_widening > 0 {
            write!(f, ", notices +{} months", self.notice_lookback_widening)?;
        }
        Ok(())
    }
}

/// Contents of the optional RON file. Every field may be omitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct FileConfig {
    pub output_dir: PathBuf,
    pub diagnostic: bool,
    pub page_cap: Option<u32>,
    pub log_file: Option<PathBuf>,
    pub log_level: String,
    pub user_agent: Option<String>,
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub max_bytes: u64,
    pub max_consecutive_failures: u32,
    pub page_delay_ms: u64,
    pub failure_delay_ms: u64,
}

impl Default for FileConfig {
    fn default() -> Self {
        let fetch = FetchSettings::default();
        let walk = WalkSettings::default();
        Self {
            output_dir: PathBuf::from("output"),
            diagnostic: false,
            page_cap: None,
            log_file: None,
            log_level: "info".to_string(),
            user_agent: None,
            connect_timeout_secs: fetch.connect_timeout.as_secs(),
            request_timeout_secs: fetch.request_timeout.as_secs(),
            max_bytes: fetch.max_bytes,
            max_consecutive_failures: DEFAULT_MAX_CONSECUTIVE_FAILURES,
            page_delay_ms: walk.page_delay.as_millis() as u64,
            failure_delay_ms: walk.failure_delay.as_millis() as u64,
        }
    }
}

/// Read `explicit`, or the default file in the working directory when it
/// exists. An explicit path that cannot be read is an error.
pub(crate) fn load_file_config(explicit: Option<&Path>) -> Result<FileConfig> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => {
            let default = PathBuf::from(DEFAULT_CONFIG_FILENAME);
            if !default.is_file() {
                return Ok(FileConfig::default());
            }
            default
        }
    };
    let content = fs::read_to_string(&path)
        .with_context(|| format!("reading config {}", path.display()))?;
    parse_file_config(&content).with_context(|| format!("parsing config {}", path.display()))
}

pub(crate) fn parse_file_config(content: &str) -> Result<FileConfig> {
    Ok(ron::from_str(content)?)
}

/// Everything a run needs, after defaults, the file and flags are merged.
#[derive(Debug, Clone)]
pub(crate) struct Settings {
    pub profile: RunProfile,
    pub output_dir: PathBuf,
    pub only: Option<String>,
    pub fetch: FetchSettings,
    pub walk: WalkSettings,
    pub log_file: Option<PathBuf>,
    pub log_level: LevelFilter,
}

impl Settings {
    pub fn resolve(file: FileConfig, cli: &Cli) -> Result<Self> {
        let mut profile = if cli.diagnostic || file.diagnostic {
            RunProfile::diagnostic()
        } else {
            RunProfile::standard()
        };
        if let Some(cap) = cli.page_cap.or(file.page_cap) {
            if cap == 0 {
                bail!("page cap must be at least 1");
            }
            profile.page_cap = cap;
        }

        let log_level = if cli.quiet {
            LevelFilter::Warn
        } else {
            LevelFilter::from_str(&file.log_level)
                .with_context(|| format!("unknown log level {:?}", file.log_level))?
        };

        let mut fetch = FetchSettings {
            connect_timeout: Duration::from_secs(file.connect_timeout_secs),
            request_timeout: Duration::from_secs(file.request_timeout_secs),
            max_bytes: file.max_bytes,
            ..FetchSettings::default()
        };
        if let Some(agent) = file.user_agent {
            fetch.user_agent = agent;
        }

        let settings = Self {
            profile,
            output_dir: cli.output.clone().unwrap_or(file.output_dir),
            only: cli.only.clone(),
            fetch,
            walk: WalkSettings {
                max_consecutive_failures: file.max_consecutive_failures.max(1),
                page_delay: Duration::from_millis(file.page_delay_ms),
                failure_delay: Duration::from_millis(file.failure_delay_ms),
            },
            log_file: cli.log_file.clone().or(file.log_file),
            log_level,
        };
        Ok(settings)
    }
}
