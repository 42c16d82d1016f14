//! Speaking avatar
//!
//! While a reply plays, a background thread cycles the speaking frames as a
//! terminal spinner. The thread only reads the shared "playing" flag.

use indicatif::{ProgressBar, ProgressStyle};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::debug;

use crate::config::AvatarConfig;

#[derive(Debug, Clone)]
pub struct AvatarAnimation {
    idle_frame: String,
    speaking_frames: Vec<String>,
    interval: Duration,
}

impl AvatarAnimation {
    pub fn new(idle_frame: &str, speaking_frames: Vec<String>, interval: Duration) -> Self {
        let speaking_frames = if speaking_frames.is_empty() {
            vec![idle_frame.to_string()]
        } else {
            speaking_frames
        };
        Self {
            idle_frame: idle_frame.to_string(),
            speaking_frames,
            interval: interval.max(Duration::from_millis(10)),
        }
    }

    pub fn from_config(config: &AvatarConfig) -> Self {
        Self::new(
            &config.idle_frame,
            config.speaking_frames.clone(),
            Duration::from_millis(config.frame_interval_ms),
        )
    }

    pub fn idle_frame(&self) -> &str {
        &self.idle_frame
    }

    /// Speaking frame shown on the given tick
    pub fn frame_at(&self, tick: usize) -> &str {
        &self.speaking_frames[tick % self.speaking_frames.len()]
    }

    /// Animate until `playing` goes false
    pub fn start(&self, playing: Arc<AtomicBool>) -> JoinHandle<()> {
        let animation = self.clone();
        std::thread::spawn(move || animation.run(&playing))
    }

    fn run(&self, playing: &AtomicBool) {
        let pb = ProgressBar::new_spinner();
        let mut ticks: Vec<&str> = self.speaking_frames.iter().map(String::as_str).collect();
        // indicatif shows the last tick string once finished
        ticks.push(&self.idle_frame);
        if let Ok(style) = ProgressStyle::default_spinner()
            .template("  {spinner} {msg}")
        {
            pb.set_style(style.tick_strings(&ticks));
        }
        pb.set_message("Bella is speaking...");

        let mut frames = 0usize;
        while playing.load(Ordering::Acquire) {
            pb.tick();
            frames += 1;
            std::thread::sleep(self.interval);
        }
        pb.finish_and_clear();
        debug!(frames, "Avatar animation stopped");
    }
}
