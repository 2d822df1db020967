use crate::adapters::scheduler::{Cadence, WeeklySchedule};
use crate::core::{LedgerEntry, Member, RosterProvider};
use crate::utils::error::{Result, RotationError};
use crate::utils::validation::{
    validate_non_empty_string, validate_positive_number, validate_required_field, validate_unique,
    validate_url, Validate,
};
use chrono::{NaiveTime, Weekday};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const BOT_TOKEN_ENV: &str = "HOST_ROTATION_BOT_TOKEN";
pub const DEFAULT_API_BASE_URL: &str = "https://api.telegram.org";

const DEFAULT_WEEKDAY: &str = "Mon";
const DEFAULT_TIME: &str = "17:00";
const DEFAULT_TIMEZONE: &str = "Europe/Amsterdam";
const DEFAULT_DEBUG_INTERVAL_SECONDS: u64 = 10;
const DEFAULT_POLL_TIMEOUT_SECONDS: u64 = 30;
const DEFAULT_RETRY_DELAY_SECONDS: u64 = 5;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BotConfig {
    pub bot_token: Option<String>,
    pub chat_id: Option<i64>,
    pub api_base_url: Option<String>,
    pub members: Option<Vec<MemberConfig>>,
    pub schedule: Option<ScheduleConfig>,
    pub polling: Option<PollingConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemberConfig {
    pub username: Option<String>,
    /// 重啟後可手動補回的週數
    pub weeks_since: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScheduleConfig {
    pub weekday: Option<String>,
    pub time: Option<String>,
    pub timezone: Option<String>,
    pub debug_interval_seconds: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PollingConfig {
    pub timeout_seconds: Option<u64>,
    pub retry_delay_seconds: Option<u64>,
}

impl BotConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(RotationError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        let mut config: Self =
            toml::from_str(&processed_content).map_err(|e| RotationError::ConfigValidationError {
                field: "toml_parsing".to_string(),
                message: format!("TOML parsing error: {}", e),
            })?;

        if config.bot_token.is_none() {
            config.bot_token = std::env::var(BOT_TOKEN_ENV).ok();
        }

        Ok(config)
    }

    /// 替換環境變數 (例如 ${BOT_TOKEN})
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| RotationError::ConfigError {
            message: format!("Invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn validate_config(&self) -> Result<()> {
        let token = validate_required_field("bot_token", &self.bot_token)?;
        validate_non_empty_string("bot_token", token)?;
        if token.contains("${") {
            return Err(RotationError::InvalidConfigValueError {
                field: "bot_token".to_string(),
                value: "<unresolved placeholder>".to_string(),
                reason: "Environment variable is not set".to_string(),
            });
        }

        validate_url("api_base_url", self.api_base_url())?;

        let members = validate_required_field("members", &self.members)?;
        if members.is_empty() {
            return Err(RotationError::ConfigError {
                message: "Field \"members\" must list at least one member".to_string(),
            });
        }
        for (i, member) in members.iter().enumerate() {
            let field = format!("members[{}].username", i);
            let username = validate_required_field(&field, &member.username)?;
            validate_non_empty_string(&field, Member::new(username.as_str()).username())?;
        }
        let handles: Vec<Member> = members
            .iter()
            .filter_map(|m| m.username.as_deref())
            .map(Member::new)
            .collect();
        validate_unique("members", handles.iter().map(|m| m.username()))?;

        self.weekday()?;
        self.time()?;
        self.timezone()?;
        validate_positive_number(
            "schedule.debug_interval_seconds",
            self.debug_interval().as_secs(),
            1,
        )?;
        validate_positive_number("polling.timeout_seconds", self.poll_timeout().as_secs(), 1)?;
        validate_positive_number(
            "polling.retry_delay_seconds",
            self.retry_delay().as_secs(),
            1,
        )?;

        Ok(())
    }

    pub fn bot_token(&self) -> &str {
        self.bot_token.as_deref().unwrap_or_default()
    }

    pub fn api_base_url(&self) -> &str {
        self.api_base_url
            .as_deref()
            .unwrap_or(DEFAULT_API_BASE_URL)
            .trim_end_matches('/')
    }

    pub fn weekday(&self) -> Result<Weekday> {
        let raw = self
            .schedule
            .as_ref()
            .and_then(|s| s.weekday.as_deref())
            .unwrap_or(DEFAULT_WEEKDAY);
        raw.parse::<Weekday>()
            .map_err(|_| RotationError::InvalidConfigValueError {
                field: "schedule.weekday".to_string(),
                value: raw.to_string(),
                reason: "Expected a weekday such as \"Mon\" or \"Monday\"".to_string(),
            })
    }

    pub fn time(&self) -> Result<NaiveTime> {
        let raw = self
            .schedule
            .as_ref()
            .and_then(|s| s.time.as_deref())
            .unwrap_or(DEFAULT_TIME);
        NaiveTime::parse_from_str(raw, "%H:%M").map_err(|e| {
            RotationError::InvalidConfigValueError {
                field: "schedule.time".to_string(),
                value: raw.to_string(),
                reason: format!("Expected HH:MM ({})", e),
            }
        })
    }

    pub fn timezone(&self) -> Result<Tz> {
        let raw = self
            .schedule
            .as_ref()
            .and_then(|s| s.timezone.as_deref())
            .unwrap_or(DEFAULT_TIMEZONE);
        raw.parse::<Tz>()
            .map_err(|_| RotationError::InvalidConfigValueError {
                field: "schedule.timezone".to_string(),
                value: raw.to_string(),
                reason: "Expected an IANA time zone such as \"Europe/Amsterdam\"".to_string(),
            })
    }

    pub fn debug_interval(&self) -> Duration {
        Duration::from_secs(
            self.schedule
                .as_ref()
                .and_then(|s| s.debug_interval_seconds)
                .unwrap_or(DEFAULT_DEBUG_INTERVAL_SECONDS),
        )
    }

    pub fn poll_timeout(&self) -> Duration {
        Duration::from_secs(
            self.polling
                .as_ref()
                .and_then(|p| p.timeout_seconds)
                .unwrap_or(DEFAULT_POLL_TIMEOUT_SECONDS),
        )
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(
            self.polling
                .as_ref()
                .and_then(|p| p.retry_delay_seconds)
                .unwrap_or(DEFAULT_RETRY_DELAY_SECONDS),
        )
    }

    /// 依設定建立排程；`debug` 時改用固定秒數間隔
    pub fn cadence(&self, debug: bool) -> Result<Cadence> {
        if debug {
            return Ok(Cadence::Every(self.debug_interval()));
        }
        Ok(Cadence::Weekly(WeeklySchedule::new(
            self.weekday()?,
            self.time()?,
            self.timezone()?,
        )))
    }
}

impl RosterProvider for BotConfig {
    fn roster(&self) -> Vec<LedgerEntry> {
        self.members
            .iter()
            .flatten()
            .filter_map(|m| {
                m.username.as_deref().map(|username| LedgerEntry {
                    member: Member::new(username),
                    weeks_since: m.weeks_since.unwrap_or(0),
                })
            })
            .collect()
    }
}

impl Validate for BotConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
