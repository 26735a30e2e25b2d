//! Configuration Module
//!
//! Handles loading and managing scheduler and server configuration from
//! environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Reminders fetched from the store on each periodic refill
    pub fetch_limit: usize,
    /// Maximum number of reminders held in memory
    pub cache_limit: usize,
    /// Periodic refill interval in seconds
    pub fetch_interval: u64,
    /// Periodic health check interval in seconds
    pub health_check_interval: u64,
    /// Minimum remaining time in seconds that makes a reminder evictable
    pub eviction_min_ttl: u64,
    /// Maximum pending reminders per owner
    pub owner_reminder_limit: usize,
    /// HTTP server port
    pub server_port: u16,
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `FETCH_LIMIT` - Reminders per refill (default: 25)
    /// - `CACHE_LIMIT` - Working-set capacity (default: 50)
    /// - `FETCH_INTERVAL` - Refill frequency in seconds (default: 60)
    /// - `HEALTH_CHECK_INTERVAL` - Health check frequency in seconds (default: 3600)
    /// - `EVICTION_MIN_TTL` - Eviction protection in seconds (default: `FETCH_INTERVAL`)
    /// - `OWNER_REMINDER_LIMIT` - Pending reminders per owner (default: 5)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let fetch_interval = env_or("FETCH_INTERVAL", defaults.fetch_interval);

        Self {
            fetch_limit: env_or("FETCH_LIMIT", defaults.fetch_limit),
            cache_limit: env_or("CACHE_LIMIT", defaults.cache_limit),
            fetch_interval,
            health_check_interval: env_or("HEALTH_CHECK_INTERVAL", defaults.health_check_interval),
            eviction_min_ttl: env_or("EVICTION_MIN_TTL", fetch_interval),
            owner_reminder_limit: env_or("OWNER_REMINDER_LIMIT", defaults.owner_reminder_limit),
            server_port: env_or("SERVER_PORT", defaults.server_port),
        }
    }

    /// Scheduler settings derived from this configuration.
    pub fn scheduler(&self) -> SchedulerConfig {
        SchedulerConfig {
            fetch_limit: self.fetch_limit,
            cache_limit: self.cache_limit,
            fetch_interval: Duration::from_secs(self.fetch_interval),
            health_check_interval: Duration::from_secs(self.health_check_interval),
            eviction_min_ttl: Duration::from_secs(self.eviction_min_ttl),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            fetch_limit: 25,
            cache_limit: 50,
            fetch_interval: 60,
            health_check_interval: 3600,
            eviction_min_ttl: 60,
            owner_reminder_limit: 5,
            server_port: 3000,
        }
    }
}

/// Parameters the reminder scheduler is constructed with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerConfig {
    pub fetch_limit: usize,
    /// Working-set capacity
    pub cache_limit: usize,
    pub fetch_interval: Duration,
    pub health_check_interval: Duration,
    /// Reminders with this much time left or less are never evicted
    pub eviction_min_ttl: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Config::default().scheduler()
    }
}
