//! Configuration management for the pawnshop loan engine
//!
//! This module handles loading and validating configuration from environment variables,
//! with support for different environments (development, staging, production).

use chrono::FixedOffset;
use std::env;
use std::str::FromStr;
use thiserror::Error;

use crate::jobs::Schedule;
use crate::notification::NotificationChannel;

/// Upper bound for a single loan query page
pub const MAX_LOAN_PAGE_SIZE: i64 = 5000;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid environment value: {0}")]
    InvalidValue(String),

    #[error("Invalid port number: {0}")]
    InvalidPort(String),
}

/// Application environment
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl Environment {
    /// Parse environment from string
    pub fn parse(s: &str) -> Result<Self, ConfigError> {
        match s.to_lowercase().as_str() {
            "dev" | "development" => Ok(Environment::Development),
            "staging" => Ok(Environment::Staging),
            "prod" | "production" => Ok(Environment::Production),
            _ => Err(ConfigError::InvalidValue(format!(
                "Invalid environment: '{}'. Expected: dev, staging, or prod",
                s
            ))),
        }
    }

    /// Check if this is a production environment
    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }

    /// Get the environment name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Staging => "staging",
            Environment::Production => "production",
        }
    }
}

/// Schedules and switches for the background jobs
#[derive(Debug, Clone)]
pub struct JobsConfig {
    /// Overdue/confiscation pass followed by late-fee accrual
    pub loan_maintenance_schedule: Schedule,

    /// Due-date reminders for active loans
    pub reminder_schedule: Schedule,
    pub reminders_enabled: bool,

    /// Escalation messages for overdue loans
    pub overdue_escalation_schedule: Schedule,

    /// Daily interest accrual, off for simple-interest products
    pub daily_interest_schedule: Schedule,
    pub daily_interest_enabled: bool,
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            loan_maintenance_schedule: Schedule::every_hours(1),
            reminder_schedule: Schedule::every_hours(24),
            reminders_enabled: true,
            overdue_escalation_schedule: Schedule::every_hours(24),
            daily_interest_schedule: Schedule::every_hours(24),
            daily_interest_enabled: false,
        }
    }
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Database connection URL
    pub database_url: String,

    /// Current environment
    pub environment: Environment,

    /// Operational HTTP port
    pub port: u16,

    /// Maximum database connections
    pub db_max_connections: u32,

    /// Log level (RUST_LOG)
    pub log_level: String,

    /// Branch scope for the processors, 0 means all branches
    pub branch_id: i64,

    /// Cap on the number of loans a single query returns
    pub loan_page_size: i64,

    /// Offset of the shop's local time, used for end-of-day boundaries
    pub business_utc_offset: FixedOffset,

    /// Base URL of the notification service; log-only delivery when unset
    pub notification_service_url: Option<String>,

    /// Channel used for customer notifications
    pub notification_channel: NotificationChannel,

    /// Timeout for one notification request
    pub notification_timeout_seconds: u64,

    pub jobs: JobsConfig,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors)
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT")
            .map(|s| Environment::parse(&s))
            .unwrap_or(Ok(Environment::Development))?;

        let database_url = env::var("DATABASE_URL")
            .map_err(|_| ConfigError::MissingEnvVar("DATABASE_URL".to_string()))?;

        let port = env::var("PORT")
            .unwrap_or_else(|_| "3001".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort("PORT must be a valid number".to_string()))?;

        let db_max_connections = env::var("DB_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "5".to_string())
            .parse::<u32>()
            .unwrap_or(5);

        let log_level = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let branch_id = env::var("BRANCH_ID")
            .unwrap_or_else(|_| "0".to_string())
            .parse::<i64>()
            .map_err(|_| ConfigError::InvalidValue("BRANCH_ID must be an integer".to_string()))?;

        let loan_page_size = number_var::<i64>("LOAN_PAGE_SIZE", 500)?.clamp(1, MAX_LOAN_PAGE_SIZE);

        let business_utc_offset = parse_utc_offset(
            &env::var("BUSINESS_UTC_OFFSET").unwrap_or_else(|_| "+00:00".to_string()),
        )?;

        let notification_service_url = env::var("NOTIFICATION_SERVICE_URL")
            .ok()
            .filter(|url| !url.trim().is_empty());

        let notification_channel = env::var("NOTIFICATION_CHANNEL")
            .unwrap_or_else(|_| "sms".to_string())
            .parse::<NotificationChannel>()
            .map_err(ConfigError::InvalidValue)?;

        let notification_timeout_seconds = number_var::<u64>("NOTIFICATION_TIMEOUT_SECONDS", 10)?;

        let defaults = JobsConfig::default();
        let jobs = JobsConfig {
            loan_maintenance_schedule: schedule_var(
                "LOAN_MAINTENANCE_SCHEDULE",
                defaults.loan_maintenance_schedule,
            )?,
            reminder_schedule: schedule_var("LOAN_REMINDER_SCHEDULE", defaults.reminder_schedule)?,
            reminders_enabled: bool_var("REMINDERS_ENABLED", defaults.reminders_enabled)?,
            overdue_escalation_schedule: schedule_var(
                "OVERDUE_ESCALATION_SCHEDULE",
                defaults.overdue_escalation_schedule,
            )?,
            daily_interest_schedule: schedule_var(
                "DAILY_INTEREST_SCHEDULE",
                defaults.daily_interest_schedule,
            )?,
            daily_interest_enabled: bool_var(
                "DAILY_INTEREST_ENABLED",
                defaults.daily_interest_enabled,
            )?,
        };

        Ok(Config {
            database_url,
            environment,
            port,
            db_max_connections,
            log_level,
            branch_id,
            loan_page_size,
            business_utc_offset,
            notification_service_url,
            notification_channel,
            notification_timeout_seconds,
            jobs,
        })
    }

    /// Get database URL (useful for logging masked version)
    pub fn database_url_masked(&self) -> String {
        // Mask password in database URL for logging
        if let Some(at_pos) = self.database_url.find('@') {
            if let Some(colon_pos) = self.database_url[..at_pos].rfind(':') {
                let prefix = &self.database_url[..colon_pos + 1];
                let suffix = &self.database_url[at_pos..];
                return format!("{}****{}", prefix, suffix);
            }
        }
        self.database_url.clone()
    }
}

fn schedule_var(name: &str, default: Schedule) -> Result<Schedule, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .parse::<Schedule>()
            .map_err(|e| ConfigError::InvalidValue(format!("{}: {}", name, e))),
        Err(_) => Ok(default),
    }
}

fn number_var<T: FromStr>(name: &str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw.trim().parse::<T>().map_err(|_| {
            ConfigError::InvalidValue(format!("{} must be an integer, got '{}'", name, raw))
        }),
        Err(_) => Ok(default),
    }
}

fn bool_var(name: &str, default: bool) -> Result<bool, ConfigError> {
    match env::var(name) {
        Ok(raw) => match raw.trim().to_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            other => Err(ConfigError::InvalidValue(format!(
                "{} must be a boolean, got '{}'",
                name, other
            ))),
        },
        Err(_) => Ok(default),
    }
}

/// Parse an offset such as `-05:00`, `+0530` or `Z`
pub fn parse_utc_offset(raw: &str) -> Result<FixedOffset, ConfigError> {
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("z") || raw.eq_ignore_ascii_case("utc") {
        return FixedOffset::east_opt(0)
            .ok_or_else(|| ConfigError::InvalidValue("UTC offset".to_string()));
    }

    let invalid = || ConfigError::InvalidValue(format!("Invalid UTC offset: '{}'", raw));

    let (sign, rest) = match raw.chars().next() {
        Some('+') => (1, &raw[1..]),
        Some('-') => (-1, &raw[1..]),
        _ => return Err(invalid()),
    };

    let digits: String = rest.chars().filter(|c| *c != ':').collect();
    if digits.len() != 4 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid());
    }

    let hours: i32 = digits[..2].parse().map_err(|_| invalid())?;
    let minutes: i32 = digits[2..].parse().map_err(|_| invalid())?;
    if hours > 14 || minutes > 59 {
        return Err(invalid());
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60)).ok_or_else(invalid)
}
