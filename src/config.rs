use std::env;
use std::net::SocketAddr;
use std::ops::RangeInclusive;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::Context;
use chrono::Duration;

const SESSION_TTL_HOURS: RangeInclusive<i64> = 1..=24 * 365;
const LATE_GRACE_MINUTES: RangeInclusive<i64> = 0..=24 * 60;

#[derive(Debug, Clone)]
pub struct Config {
    pub addr: SocketAddr,
    pub data_dir: PathBuf,
    pub session_ttl: Duration,
    pub mirror: bool,
    pub late_grace: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            data_dir: PathBuf::from("attendance"),
            session_ttl: Duration::days(2),
            mirror: true,
            late_grace: Duration::minutes(15),
        }
    }
}

impl Config {
    /// Reads `ATTENDANCE_*` variables, picking up a `.env` file if there is one.
    pub fn from_env() -> anyhow::Result<Self> {
        if let Ok(path) = dotenvy::dotenv() {
            log::debug!("Loaded environment from {}", path.display());
        }
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();
        if let Some(addr) = parsed::<SocketAddr, _>(&lookup, "ATTENDANCE_ADDR")? {
            config.addr = addr;
        }
        if let Some(dir) = lookup("ATTENDANCE_DATA_DIR") {
            config.data_dir = PathBuf::from(dir);
        }
        if let Some(hours) = parsed::<i64, _>(&lookup, "ATTENDANCE_SESSION_TTL_HOURS")? {
            config.session_ttl = bounded(
                "ATTENDANCE_SESSION_TTL_HOURS",
                hours,
                SESSION_TTL_HOURS,
                Duration::try_hours,
            )?;
        }
        if let Some(mirror) = parsed::<bool, _>(&lookup, "ATTENDANCE_MIRROR")? {
            config.mirror = mirror;
        }
        if let Some(minutes) = parsed::<i64, _>(&lookup, "ATTENDANCE_LATE_GRACE_MINUTES")? {
            config.late_grace = bounded(
                "ATTENDANCE_LATE_GRACE_MINUTES",
                minutes,
                LATE_GRACE_MINUTES,
                Duration::try_minutes,
            )?;
        }
        Ok(config)
    }

    pub fn mirror_path(&self) -> PathBuf {
        self.data_dir.join("attendanceRecords.json")
    }
}

fn parsed<T, F>(lookup: &F, key: &str) -> anyhow::Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .with_context(|| format!("{} has an invalid value `{}`", key, raw)),
        None => Ok(None),
    }
}

fn bounded<F>(
    key: &str,
    value: i64,
    range: RangeInclusive<i64>,
    unit: F,
) -> anyhow::Result<Duration>
where
    F: Fn(i64) -> Option<Duration>,
{
    if !range.contains(&value) {
        anyhow::bail!(
            "{} must be between {} and {}, got {}",
            key,
            range.start(),
            range.end(),
            value
        );
    }
    unit(value).with_context(|| format!("{} is out of range", key))
}
