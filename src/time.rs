//! Frame timing on a time base shared by every surface.
//!
//! Each process runs its own clock, but all of them count from the most
//! recent UTC midnight, so two windows opened minutes apart still agree on
//! `elapsed()`.
//!
//! # Example
//!
//! ```ignore
//! use mwpf::time::Time;
//!
//! let mut time = Time::new();
//!
//! // In your frame loop:
//! time.update();
//!
//! println!("Day time: {:.2}s", time.elapsed());
//! println!("Delta: {:.4}s", time.delta());
//! println!("Frame: {}", time.frame());
//! ```

use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

/// The most recent UTC midnight before `now`.
pub fn day_origin(now: SystemTime) -> SystemTime {
    let since_epoch = now.duration_since(UNIX_EPOCH).unwrap_or(Duration::ZERO);
    let whole_days = since_epoch.as_secs() / SECONDS_PER_DAY;
    UNIX_EPOCH + Duration::from_secs(whole_days * SECONDS_PER_DAY)
}

/// Time tracking for the frame loop.
#[derive(Debug)]
pub struct Time {
    /// Shared reference instant.
    origin: SystemTime,
    /// When the last frame occurred.
    last_frame: Instant,
    /// Seconds from `origin` to the last update.
    elapsed_secs: f64,
    /// Time since last frame in seconds.
    delta_secs: f32,
    /// Total frames since start.
    frame_count: u64,
    /// Calculated FPS (updated periodically).
    fps: f32,
    /// Frame count at last FPS update.
    fps_frame_count: u64,
    /// Time of last FPS calculation.
    fps_update_time: Instant,
    /// How often to update FPS calculation.
    fps_update_interval: Duration,
}

impl Time {
    /// Clock counting from today's UTC midnight.
    pub fn new() -> Self {
        Self::with_origin(day_origin(SystemTime::now()))
    }

    /// Clock counting from a fixed origin.
    pub fn with_origin(origin: SystemTime) -> Self {
        let now = Instant::now();
        let mut time = Self {
            origin,
            last_frame: now,
            elapsed_secs: 0.0,
            delta_secs: 0.0,
            frame_count: 0,
            fps: 0.0,
            fps_frame_count: 0,
            fps_update_time: now,
            fps_update_interval: Duration::from_millis(500),
        };
        time.elapsed_secs = time.read_elapsed();
        time
    }

    fn read_elapsed(&self) -> f64 {
        SystemTime::now()
            .duration_since(self.origin)
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0)
    }

    /// Update timing values. Call once per frame.
    ///
    /// Returns `(elapsed_time, delta_time)` for convenience.
    pub fn update(&mut self) -> (f64, f32) {
        let now = Instant::now();

        self.delta_secs = now.duration_since(self.last_frame).as_secs_f32();
        self.last_frame = now;
        self.elapsed_secs = self.read_elapsed();
        self.frame_count += 1;

        let fps_elapsed = now.duration_since(self.fps_update_time);
        if fps_elapsed >= self.fps_update_interval {
            let frames_since = self.frame_count - self.fps_frame_count;
            self.fps = frames_since as f32 / fps_elapsed.as_secs_f32();
            self.fps_frame_count = self.frame_count;
            self.fps_update_time = now;
        }

        (self.elapsed_secs, self.delta_secs)
    }

    /// Seconds since the shared origin, as of the last update.
    #[inline]
    pub fn elapsed(&self) -> f64 {
        self.elapsed_secs
    }

    /// Time since last frame in seconds (delta time).
    #[inline]
    pub fn delta(&self) -> f32 {
        self.delta_secs
    }

    /// Total frames since start.
    #[inline]
    pub fn frame(&self) -> u64 {
        self.frame_count
    }

    /// Calculated frames per second.
    #[inline]
    pub fn fps(&self) -> f32 {
        self.fps
    }

    #[inline]
    pub fn origin(&self) -> SystemTime {
        self.origin
    }
}

impl Default for Time {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_day_origin() {
        let noon = UNIX_EPOCH + Duration::from_secs(3 * SECONDS_PER_DAY + 12 * 3600 + 5);
        assert_eq!(day_origin(noon), UNIX_EPOCH + Duration::from_secs(3 * SECONDS_PER_DAY));
    }

    #[test]
    fn test_elapsed_within_a_day() {
        let time = Time::new();
        assert!(time.elapsed() >= 0.0);
        assert!(time.elapsed() < SECONDS_PER_DAY as f64 + 1.0);
    }

    #[test]
    fn test_two_clocks_agree() {
        let a = Time::new();
        let b = Time::with_origin(a.origin());
        assert!((a.elapsed() - b.elapsed()).abs() < 1.0);
    }

    #[test]
    fn test_time_update() {
        let mut time = Time::with_origin(SystemTime::now());
        thread::sleep(Duration::from_millis(10));
        let (elapsed, delta) = time.update();

        assert!(elapsed > 0.0);
        assert!(delta > 0.0);
        assert_eq!(time.frame(), 1);
    }
}
