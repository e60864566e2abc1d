use super::Work;
use std::time::Duration;
use tracing::info;

/// Default stand-in duration for the real work.
pub const DEFAULT_PLACEHOLDER_SECONDS: u64 = 120;

/// Waits for a fixed duration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceholderWork {
    duration: Duration,
}

impl PlaceholderWork {
    pub fn new(duration: Duration) -> Self {
        Self { duration }
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }
}

impl Default for PlaceholderWork {
    fn default() -> Self {
        Self::new(Duration::from_secs(DEFAULT_PLACEHOLDER_SECONDS))
    }
}

impl Work for PlaceholderWork {
    fn describe(&self) -> String {
        format!("placeholder work ({}s)", self.duration.as_secs())
    }

    fn run(&mut self) -> anyhow::Result<()> {
        info!(seconds = self.duration.as_secs(), "placeholder work started");
        std::thread::sleep(self.duration);
        info!("placeholder work finished");
        Ok(())
    }
}
