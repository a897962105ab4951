use std::io::Read;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use subsentry_domain::{
    display::menu_label,
    parsing::fields_from_json,
    service::DEFAULT_UPCOMING_LIMIT,
    store::JsonFileStore,
    tray::{TraySink, TrayStatus},
    urgency::UrgencySummary,
    SubscriptionRecord, SubscriptionService, UrgencyTier,
};
use tracing::{info, warn};

const PRODUCT_NAME: &str = "SubSentry - Subscription Tracker";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppConfig {
    pub(crate) store_path: PathBuf,
    pub(crate) refresh_interval: Duration,
    pub(crate) upcoming_limit: usize,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self::from_lookup(|key| std::env::var(key).ok()))
    }

    /// Unset or unparsable values keep their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(path) = lookup("SUBSENTRY_STORE") {
            if !path.trim().is_empty() {
                config.store_path = PathBuf::from(path.trim());
            }
        }
        if let Some(minutes) = lookup("SUBSENTRY_REFRESH_MINUTES") {
            if let Some(secs) = minutes
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|value| *value > 0)
                .and_then(|value| value.checked_mul(60))
            {
                config.refresh_interval = Duration::from_secs(secs);
            }
        }
        if let Some(limit) = lookup("SUBSENTRY_UPCOMING_LIMIT") {
            if let Ok(value) = limit.trim().parse::<usize>() {
                if value > 0 {
                    config.upcoming_limit = value;
                }
            }
        }
        config
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            store_path: PathBuf::from("subsentry.json"),
            refresh_interval: Duration::from_secs(60 * 60),
            upcoming_limit: DEFAULT_UPCOMING_LIMIT,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    /// Refresh on a timer until the process is stopped.
    Watch,
    Once,
    /// Read a JSON object of extracted fields from stdin and add it.
    Import,
}

impl Command {
    pub fn from_args(mut args: impl Iterator<Item = String>) -> Result<Self> {
        let command = match args.next().as_deref() {
            None | Some("watch") => Command::Watch,
            Some("once") => Command::Once,
            Some("import") => Command::Import,
            Some(other) => bail!("unknown command `{other}` (expected watch, once or import)"),
        };
        if let Some(extra) = args.next() {
            bail!("unexpected argument `{extra}`");
        }
        Ok(command)
    }
}

/// Renders tray updates as log lines; stands in for a native tray icon.
#[derive(Debug, Default)]
pub struct LogTraySink;

impl TraySink for LogTraySink {
    fn render(&self, status: &TrayStatus) {
        info!(icon = ?status.icon_state(), tooltip = %tooltip_text(&status.summary), "tray updated");
        for entry in &status.upcoming {
            info!(tier = ?entry.tier, "  {}", menu_label(&entry.name, entry.days_until));
        }
    }
}

pub fn tooltip_text(summary: &UrgencySummary) -> String {
    let plural = |count: usize| if count == 1 { "" } else { "s" };
    match summary.most_severe_tier {
        UrgencyTier::VeryUrgent => format!(
            "⚠️ {} subscription{} renewing in ≤2 days!",
            summary.very_urgent_count,
            plural(summary.very_urgent_count)
        ),
        UrgencyTier::Urgent => format!(
            "⚡ {} subscription{} renewing soon",
            summary.renewing_soon(),
            plural(summary.renewing_soon())
        ),
        UrgencyTier::Normal => PRODUCT_NAME.to_string(),
    }
}

pub fn build_service(config: &AppConfig) -> Result<SubscriptionService> {
    let store = JsonFileStore::open(&config.store_path).with_context(|| {
        format!(
            "failed to open subscription store {}",
            config.store_path.display()
        )
    })?;
    SubscriptionService::builder()
        .with_store(Box::new(store))
        .with_tray_sink(Box::new(LogTraySink))
        .with_upcoming_limit(config.upcoming_limit)
        .build()
        .context("failed to initialize subscription service")
}

pub fn import_fields(service: &SubscriptionService, mut input: impl Read) -> Result<SubscriptionRecord> {
    let mut body = String::new();
    input
        .read_to_string(&mut body)
        .context("failed to read extracted fields")?;
    let fields = fields_from_json(&body)?;
    let record = service.add_from_fields(&fields)?;
    Ok(record)
}

pub fn run(config: AppConfig, command: Command) -> Result<()> {
    info!(store = %config.store_path.display(), ?command, "starting SubSentry");
    let service = build_service(&config)?;
    match command {
        Command::Once => {
            service.refresh()?;
        }
        Command::Import => {
            let record = import_fields(&service, std::io::stdin().lock())?;
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
        Command::Watch => loop {
            if let Err(err) = service.refresh() {
                warn!(%err, "scheduled refresh failed");
            }
            std::thread::sleep(config.refresh_interval);
        },
    }
    Ok(())
}
