//! Hot reload of the schedule file.
//!
//! The parent directory is watched rather than the file itself so that
//! editors and `tiltr schedule install` (which replace the file by rename)
//! are seen. Bursts of events collapse into one [`SignalMessage::Reload`].

use std::path::{Path, PathBuf};
use std::sync::mpsc::{Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use notify::{
    Config as NotifyConfig, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher,
};

use crate::common::constants::WATCH_DEBOUNCE_MS;
use crate::common::utils::private_path;
use crate::io::signals::SignalMessage;

pub struct ScheduleWatcher {
    signal_sender: Sender<SignalMessage>,
    schedule_path: PathBuf,
    debug_enabled: bool,
}

impl ScheduleWatcher {
    pub fn new(
        signal_sender: Sender<SignalMessage>,
        schedule_path: PathBuf,
        debug_enabled: bool,
    ) -> Self {
        Self {
            signal_sender,
            schedule_path,
            debug_enabled,
        }
    }

    /// Spawn the watcher thread. It lives until the loop's channel closes.
    pub fn start(self) -> Result<()> {
        let directory = self
            .schedule_path
            .parent()
            .map(Path::to_path_buf)
            .context("Schedule path has no parent directory")?;
        std::fs::create_dir_all(&directory)
            .with_context(|| format!("Failed to create {}", private_path(&directory)))?;

        let (tx, rx) = std::sync::mpsc::channel();
        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| {
                if let Ok(event) = res
                    && matches!(
                        event.kind,
                        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
                    )
                {
                    let _ = tx.send(event);
                }
            },
            NotifyConfig::default(),
        )
        .context("Failed to create file watcher")?;
        watcher
            .watch(&directory, RecursiveMode::NonRecursive)
            .with_context(|| format!("Failed to watch {}", private_path(&directory)))?;

        if self.debug_enabled {
            log_pipe!();
            log_debug!("Watching {} for changes", private_path(&self.schedule_path));
        }

        thread::spawn(move || {
            let _watcher = watcher;
            self.forward(rx);
        });
        Ok(())
    }

    fn forward(&self, events: Receiver<Event>) {
        let debounce = Duration::from_millis(WATCH_DEBOUNCE_MS);
        while let Ok(event) = events.recv() {
            if !self.affects_schedule(&event) {
                continue;
            }
            // Swallow the rest of the burst.
            loop {
                match events.recv_timeout(debounce) {
                    Ok(_) => continue,
                    Err(RecvTimeoutError::Timeout) => break,
                    Err(RecvTimeoutError::Disconnected) => return,
                }
            }
            if self.debug_enabled {
                log_debug!("Schedule file changed on disk");
            }
            if self.signal_sender.send(SignalMessage::Reload).is_err() {
                return;
            }
        }
    }

    fn affects_schedule(&self, event: &Event) -> bool {
        event.paths.iter().any(|path| path == &self.schedule_path)
    }
}
