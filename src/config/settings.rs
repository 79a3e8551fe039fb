use chrono::Duration;

#[derive(Debug, Clone)]
pub struct StoreSettings {
    pub database_path: String,
    pub busy_timeout_ms: u64,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            database_path: std::env::var("DATABASE_PATH")
                .unwrap_or_else(|_| "tournaments.db".to_string()),
            busy_timeout_ms: 5_000,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SchedulerSettings {
    pub sweep_interval_secs: u64,
    /// A room is revealed once `visible_from` lies this far in the past.
    pub reveal_lead_minutes: i64,
}

impl SchedulerSettings {
    pub fn reveal_lead(&self) -> Duration {
        Duration::minutes(self.reveal_lead_minutes)
    }
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            sweep_interval_secs: 300, // every 5 minutes
            reveal_lead_minutes: 15,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProgressionSettings {
    pub queue_capacity: usize,
}

impl Default for ProgressionSettings {
    fn default() -> Self {
        Self { queue_capacity: 256 }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub store: StoreSettings,
    pub scheduler: SchedulerSettings,
    pub progression: ProgressionSettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl AppConfig {
    pub fn new() -> Self {
        Self {
            store: StoreSettings::default(),
            scheduler: SchedulerSettings::default(),
            progression: ProgressionSettings::default(),
        }
    }

    pub fn with_database_path(mut self, path: impl Into<String>) -> Self {
        self.store.database_path = path.into();
        self
    }
}
