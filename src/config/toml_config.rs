use crate::core::slots::SlotAlignment;
use crate::domain::model::{
    BlockedInterval, DayTemplate, Provider, Service, WeeklyTemplate, Worker, ALL_WEEKDAYS,
};
use crate::utils::error::{ReservationError, Result};
use crate::utils::validation::{self, Validate};
use chrono::{DateTime, NaiveTime, Utc, Weekday};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Catalog file: engine settings plus the provider profiles to serve.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogConfig {
    #[serde(default)]
    pub settings: Settings,
    #[serde(default)]
    pub providers: Vec<ProviderConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub slot_alignment: SlotAlignment,
    pub journal_path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub utc_offset_minutes: i32,
    pub weekly: Vec<DayConfig>,
    #[serde(default)]
    pub blocked: Vec<BlockedConfig>,
    #[serde(default)]
    pub services: Vec<ServiceConfig>,
    #[serde(default)]
    pub workers: Vec<WorkerConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DayConfig {
    pub day: String,
    /// Wall-clock "HH:mm"
    pub open: String,
    pub close: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

/// A service never spans more than one day.
const MAX_SERVICE_MINUTES: i64 = 24 * 60;

fn default_enabled() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockedConfig {
    pub id: String,
    /// RFC 3339 instant
    pub start: String,
    pub end: String,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub id: String,
    pub name: String,
    pub duration_minutes: i64,
    #[serde(default)]
    pub price: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub services: Vec<String>,
}

impl CatalogConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(ReservationError::IoError)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| ReservationError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Replaces `${VAR}` with the environment value; unknown variables are left as-is.
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}")
            .map_err(|e| ReservationError::config(format!("env pattern: {}", e)))?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn slot_alignment(&self) -> SlotAlignment {
        self.settings.slot_alignment
    }

    pub fn journal_path(&self) -> Option<&str> {
        self.settings.journal_path.as_deref()
    }

    /// Converts every provider section into domain records.
    pub fn providers(&self) -> Result<Vec<Provider>> {
        self.providers.iter().map(ProviderConfig::to_provider).collect()
    }

    pub fn validate_config(&self) -> Result<()> {
        if let Some(path) = &self.settings.journal_path {
            validation::validate_path("settings.journal_path", path)?;
        }
        validation::validate_unique_ids("providers", self.providers.iter().map(|p| p.id.as_str()))?;
        for provider in &self.providers {
            provider.validate()?;
        }
        Ok(())
    }
}

impl Validate for CatalogConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

impl ProviderConfig {
    pub fn to_provider(&self) -> Result<Provider> {
        let days = self
            .weekly
            .iter()
            .map(|d| -> Result<DayTemplate> {
                Ok(DayTemplate {
                    day_of_week: parse_weekday(&self.field("weekly.day"), &d.day)?,
                    open: parse_wall_clock(&self.field("weekly.open"), &d.open)?,
                    close: parse_wall_clock(&self.field("weekly.close"), &d.close)?,
                    enabled: d.enabled,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let blocked = self
            .blocked
            .iter()
            .map(|b| -> Result<BlockedInterval> {
                Ok(BlockedInterval {
                    id: b.id.clone(),
                    start: parse_instant(&self.field("blocked.start"), &b.start)?,
                    end: parse_instant(&self.field("blocked.end"), &b.end)?,
                    reason: b.reason.clone(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let services = self
            .services
            .iter()
            .map(|s| Service {
                id: s.id.clone(),
                name: s.name.clone(),
                duration_minutes: s.duration_minutes,
                price: s.price,
            })
            .collect();

        let workers = self
            .workers
            .iter()
            .map(|w| Worker {
                id: w.id.clone(),
                name: w.name.clone(),
                eligible_service_ids: w.services.iter().cloned().collect(),
            })
            .collect();

        Ok(Provider {
            id: self.id.clone(),
            name: self.name.clone(),
            utc_offset_minutes: self.utc_offset_minutes,
            weekly: WeeklyTemplate::new(days),
            blocked,
            services,
            workers,
        })
    }

    fn field(&self, name: &str) -> String {
        format!("providers[{}].{}", self.id, name)
    }
}

impl Validate for ProviderConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_non_empty_string(&self.field("id"), &self.id)?;
        validation::validate_range(
            &self.field("utc_offset_minutes"),
            self.utc_offset_minutes,
            -1439,
            1439,
        )?;

        let provider = self.to_provider()?;

        for day in ALL_WEEKDAYS {
            let count = provider
                .weekly
                .days
                .iter()
                .filter(|d| d.day_of_week == day)
                .count();
            if count != 1 {
                return Err(ReservationError::ConfigValidationError {
                    field: self.field("weekly"),
                    message: format!("expected exactly one entry for {}, found {}", day, count),
                });
            }
        }
        for day in provider.weekly.days.iter().filter(|d| d.enabled) {
            if day.open >= day.close {
                return Err(ReservationError::ConfigValidationError {
                    field: self.field("weekly"),
                    message: format!(
                        "{} opens at {} but closes at {}",
                        day.day_of_week, day.open, day.close
                    ),
                });
            }
        }

        for block in &provider.blocked {
            if block.end <= block.start {
                return Err(ReservationError::ConfigValidationError {
                    field: self.field("blocked"),
                    message: format!("blocked interval {} ends before it starts", block.id),
                });
            }
        }

        validation::validate_unique_ids(
            &self.field("services"),
            provider.services.iter().map(|s| s.id.as_str()),
        )?;
        for service in &provider.services {
            let field = self.field(&format!("services[{}].duration_minutes", service.id));
            validation::validate_positive(&field, service.duration_minutes)?;
            validation::validate_range(
                &field,
                service.duration_minutes,
                1,
                MAX_SERVICE_MINUTES,
            )?;
        }

        validation::validate_unique_ids(
            &self.field("workers"),
            provider.workers.iter().map(|w| w.id.as_str()),
        )?;
        for worker in &provider.workers {
            if let Some(unknown) = worker
                .eligible_service_ids
                .iter()
                .find(|id| provider.service(id).is_none())
            {
                return Err(ReservationError::ConfigValidationError {
                    field: self.field(&format!("workers[{}].services", worker.id)),
                    message: format!("unknown service '{}'", unknown),
                });
            }
        }

        Ok(())
    }
}

pub fn parse_weekday(field: &str, value: &str) -> Result<Weekday> {
    value
        .trim()
        .parse::<Weekday>()
        .map_err(|_| ReservationError::InvalidConfigValueError {
            field: field.to_string(),
            value: value.to_string(),
            reason: "expected a weekday name such as Mon or Monday".to_string(),
        })
}

pub fn parse_wall_clock(field: &str, value: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M").map_err(|e| {
        ReservationError::InvalidConfigValueError {
            field: field.to_string(),
            value: value.to_string(),
            reason: format!("expected HH:mm ({})", e),
        }
    })
}

pub fn parse_instant(field: &str, value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value.trim())
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| ReservationError::InvalidConfigValueError {
            field: field.to_string(),
            value: value.to_string(),
            reason: format!("expected an RFC 3339 instant ({})", e),
        })
}
