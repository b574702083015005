use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const DEFAULT_TICK_INTERVAL_MS: u64 = 25;
pub const DEFAULT_SCRIPT_EXTENSION: &str = "script";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SchedulerConfig {
    /// Zero means "as fast as the host loop allows".
    pub tick_interval_ms: u64,
    pub disable_play_finish: bool,
    pub disable_stopwatch: bool,
    pub script_extension: String,
    pub scripts_dir: Option<String>,
    pub secondary_scripts_dir: Option<String>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
            disable_play_finish: false,
            disable_stopwatch: false,
            script_extension: DEFAULT_SCRIPT_EXTENSION.to_string(),
            scripts_dir: None,
            secondary_scripts_dir: None,
        }
    }
}

impl SchedulerConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}
