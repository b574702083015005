use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::thread;

use asc_core::{SchedulerConfig, SchedulerPhase, ScriptError};
use asc_registry::ScriptRegistry;
use asc_runtime::{
    DryRunParser, DryRunProvider, HostStatus, NotificationSink, ScriptParser, ScriptScheduler,
    ScriptSchedulerOptions, StepProvider, VariableNamespace,
};
use tracing::{debug, info};

pub fn load_config(path: &Path) -> Result<SchedulerConfig, ScriptError> {
    let raw = fs::read_to_string(path).map_err(|error| {
        ScriptError::new(
            "API_CONFIG_READ",
            format!("Failed to read config {}: {}", path.display(), error),
        )
    })?;
    serde_json::from_str(&raw).map_err(|error| {
        ScriptError::new(
            "API_CONFIG_INVALID",
            format!("Invalid config {}: {}", path.display(), error),
        )
    })
}

/// Everything needed to wire a scheduler to a scripts directory. Collaborators
/// left as `None` fall back to the dry-run provider/parser and the runtime
/// defaults.
#[derive(Default)]
pub struct CreateSchedulerOptions {
    pub config: SchedulerConfig,
    pub scripts_dir: Option<PathBuf>,
    pub provider: Option<Box<dyn StepProvider>>,
    pub parser: Option<Box<dyn ScriptParser>>,
    pub host: Option<Box<dyn HostStatus>>,
    pub notifications: Option<Box<dyn NotificationSink>>,
    pub variables: Option<Box<dyn VariableNamespace>>,
}

pub struct CreatedScheduler {
    pub scheduler: ScriptScheduler,
    pub registry: Rc<RefCell<ScriptRegistry>>,
}

pub fn create_scheduler(options: CreateSchedulerOptions) -> Result<CreatedScheduler, ScriptError> {
    let scripts_dir = options
        .scripts_dir
        .or_else(|| options.config.scripts_dir.as_ref().map(PathBuf::from))
        .ok_or_else(|| {
            ScriptError::new(
                "API_SCRIPTS_DIR_MISSING",
                "No scripts directory configured.",
            )
        })?;

    let mut registry = ScriptRegistry::new(options.config.script_extension.clone());
    registry.discover(&scripts_dir)?;
    if let Some(secondary) = options.config.secondary_scripts_dir.as_deref() {
        registry.discover_optional(Path::new(secondary));
    }
    info!(
        scripts_dir = %scripts_dir.display(),
        scripts = registry.len(),
        "script registry ready"
    );

    let registry = Rc::new(RefCell::new(registry));
    let scheduler = ScriptScheduler::new(ScriptSchedulerOptions {
        provider: options
            .provider
            .unwrap_or_else(|| Box::new(DryRunProvider::new())),
        host: options.host,
        notifications: options.notifications,
        variables: options.variables,
        parser: Some(options.parser.unwrap_or_else(|| Box::new(DryRunParser))),
        resolver: Some(Box::new(Rc::clone(&registry))),
        config: options.config,
    });

    Ok(CreatedScheduler {
        scheduler,
        registry,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub ticks: usize,
}

/// Ticks until the scheduler goes idle. With `sleep` set, waits the current
/// tick interval between ticks, re-read every time.
pub fn run_until_idle(
    scheduler: &mut ScriptScheduler,
    max_ticks: usize,
    sleep: bool,
) -> Result<RunSummary, ScriptError> {
    let mut phase = scheduler.phase();
    for ticks in 1..=max_ticks {
        phase = scheduler.tick();
        if phase == SchedulerPhase::Idle {
            debug!(ticks, "scheduler idle");
            return Ok(RunSummary { ticks });
        }
        if sleep {
            let interval = scheduler.tick_interval();
            if !interval.is_zero() {
                thread::sleep(interval);
            }
        }
    }

    Err(ScriptError::new(
        "API_TICK_LIMIT",
        format!(
            "Scheduler still {:?} after {} ticks.",
            phase, max_ticks
        ),
    ))
}
