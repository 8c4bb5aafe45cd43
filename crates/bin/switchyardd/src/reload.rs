//! Rule hot-reload: polls the config file's modification time and publishes
//! a fresh [`RuleSet`] to the reconciler when it changes.
//!
//! Only the rules are reloaded: timers, pairings and scheduled program
//! events. Server, loop, profile and program library settings need a
//! restart.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use tokio::sync::watch;
use tokio::task::JoinHandle;

use switchyard_domain::rule::RuleSet;

use crate::config::Config;

/// Poll interval of the config file.
pub const RELOAD_INTERVAL: Duration = Duration::from_secs(5);

pub struct RuleReloader {
    path: PathBuf,
    rules: watch::Sender<Arc<RuleSet>>,
    interval: Duration,
}

impl RuleReloader {
    #[must_use]
    pub fn new(path: PathBuf, rules: watch::Sender<Arc<RuleSet>>, interval: Duration) -> Self {
        Self {
            path,
            rules,
            interval,
        }
    }

    /// Spawn the watcher on the runtime.
    pub fn start(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    async fn run(self) {
        let mut seen = modified_at(&self.path).await;
        loop {
            tokio::time::sleep(self.interval).await;
            let current = modified_at(&self.path).await;
            if current != seen {
                seen = current;
                self.reload();
            }
        }
    }

    /// Re-read the file and publish its rules if they differ.
    ///
    /// A file that was removed, no longer parses or fails validation keeps
    /// the previous rules in force.
    pub fn reload(&self) -> bool {
        let loaded = Config::read(&self.path).and_then(|config| {
            config.validate_rules()?;
            Ok(config)
        });
        let config = match loaded {
            Ok(config) => config,
            Err(err) => {
                tracing::warn!(error = %err, path = %self.path.display(), "config reload failed, keeping previous rules");
                return false;
            }
        };
        let rules = config.rules();
        let timers = rules.timers.len();
        let paired = rules.paired.len();
        let programs = rules.programs.len();
        let changed = self.rules.send_if_modified(|current| {
            if **current == rules {
                return false;
            }
            *current = Arc::new(rules);
            true
        });
        if changed {
            tracing::info!(timers, paired, programs, "rules reloaded");
        }
        changed
    }
}

async fn modified_at(path: &Path) -> Option<SystemTime> {
    tokio::fs::metadata(path).await.ok()?.modified().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct TempConfig(PathBuf);

    impl TempConfig {
        fn new(name: &str, content: &str) -> Self {
            let path = std::env::temp_dir().join(format!(
                "switchyard-{name}-{}.toml",
                std::process::id()
            ));
            std::fs::write(&path, content).unwrap();
            Self(path)
        }

        fn write(&self, content: &str) {
            std::fs::write(&self.0, content).unwrap();
        }

        fn remove(&self) {
            std::fs::remove_file(&self.0).unwrap();
        }
    }

    impl Drop for TempConfig {
        fn drop(&mut self) {
            let _ = std::fs::remove_file(&self.0);
        }
    }

    const ONE_TIMER: &str = r#"
        [[timers]]
        zone = "Kitchen"
        control = "Lights"
        on = "sunset"
        off = "01:00"
    "#;

    #[test]
    fn should_publish_changed_rules() {
        let file = TempConfig::new("publish", ONE_TIMER);
        let (tx, rx) = watch::channel(Arc::new(RuleSet::default()));
        let reloader = RuleReloader::new(file.0.clone(), tx, RELOAD_INTERVAL);

        assert!(reloader.reload());
        assert_eq!(rx.borrow().timers.len(), 1);
    }

    #[test]
    fn should_not_republish_identical_rules() {
        let file = TempConfig::new("identical", ONE_TIMER);
        let (tx, _rx) = watch::channel(Arc::new(RuleSet::default()));
        let reloader = RuleReloader::new(file.0.clone(), tx, RELOAD_INTERVAL);

        assert!(reloader.reload());
        assert!(!reloader.reload());
    }

    #[test]
    fn should_keep_previous_rules_when_file_is_invalid() {
        let file = TempConfig::new("invalid", ONE_TIMER);
        let (tx, rx) = watch::channel(Arc::new(RuleSet::default()));
        let reloader = RuleReloader::new(file.0.clone(), tx, RELOAD_INTERVAL);
        reloader.reload();

        file.write("[[timers]]\nzone = ");

        assert!(!reloader.reload());
        assert_eq!(rx.borrow().timers.len(), 1);
    }

    #[test]
    fn should_keep_previous_rules_when_file_is_removed() {
        let file = TempConfig::new("removed", ONE_TIMER);
        let (tx, rx) = watch::channel(Arc::new(RuleSet::default()));
        let reloader = RuleReloader::new(file.0.clone(), tx, RELOAD_INTERVAL);
        reloader.reload();

        file.remove();

        assert!(!reloader.reload());
        assert_eq!(rx.borrow().timers.len(), 1);
    }

    #[test]
    fn should_keep_previous_rules_when_event_names_unknown_program() {
        let file = TempConfig::new("unknown-program", ONE_TIMER);
        let (tx, rx) = watch::channel(Arc::new(RuleSet::default()));
        let reloader = RuleReloader::new(file.0.clone(), tx, RELOAD_INTERVAL);
        reloader.reload();

        file.write(
            r#"
            [[device_programs]]
            zone = "Hall"
            control = "Strip"
            events = [{ time = "21:00", params = { program = "disco" } }]
            "#,
        );

        assert!(!reloader.reload());
        assert_eq!(rx.borrow().timers.len(), 1);
        assert!(rx.borrow().programs.is_empty());
    }
}
