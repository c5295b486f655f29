//! The frame loop.
//!
//! [`FrameScheduler::run_forever`] waits for a refresh, reads the clock and
//! runs one step, over and over. Waiting on the [`RefreshSignal`] is the
//! only place the loop yields, so swapping the signal is all it takes to
//! run a fixed number of frames in a test.

use crate::time::Time;
use std::thread;
use std::time::{Duration, Instant};

/// Source of refresh ticks.
pub trait RefreshSignal {
    /// Block until the next frame is due. `false` means the host is going
    /// away and the loop should end.
    fn wait(&mut self) -> bool;
}

/// Yields a fixed number of frames without sleeping.
#[derive(Clone, Copy, Debug)]
pub struct FixedFrames {
    remaining: u64,
}

impl FixedFrames {
    pub fn new(frames: u64) -> Self {
        Self { remaining: frames }
    }
}

impl RefreshSignal for FixedFrames {
    fn wait(&mut self) -> bool {
        if self.remaining == 0 {
            return false;
        }
        self.remaining -= 1;
        true
    }
}

/// Real-time ticks at a fixed period, optionally for a bounded number of
/// frames.
#[derive(Clone, Copy, Debug)]
pub struct Interval {
    period: Duration,
    next: Option<Instant>,
    remaining: Option<u64>,
}

impl Interval {
    /// Tick every `period`, forever.
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            next: None,
            remaining: None,
        }
    }

    /// Stop after `frames` ticks.
    pub fn with_limit(mut self, frames: u64) -> Self {
        self.remaining = Some(frames);
        self
    }
}

impl RefreshSignal for Interval {
    fn wait(&mut self) -> bool {
        if let Some(remaining) = self.remaining.as_mut() {
            if *remaining == 0 {
                return false;
            }
            *remaining -= 1;
        }

        let now = Instant::now();
        let due = self.next.unwrap_or(now);
        if due > now {
            thread::sleep(due - now);
        }
        // Don't try to catch up on missed frames.
        self.next = Some(due.max(now) + self.period);
        true
    }
}

/// Drives one step per refresh.
#[derive(Debug)]
pub struct FrameScheduler<S: RefreshSignal> {
    signal: S,
    time: Time,
}

impl<S: RefreshSignal> FrameScheduler<S> {
    pub fn new(signal: S) -> Self {
        Self::with_time(signal, Time::new())
    }

    pub fn with_time(signal: S, time: Time) -> Self {
        Self { signal, time }
    }

    pub fn time(&self) -> &Time {
        &self.time
    }

    /// Run `step` once per refresh until the signal ends.
    ///
    /// Returns the number of frames run.
    pub fn run_forever<F>(&mut self, mut step: F) -> u64
    where
        F: FnMut(&Time),
    {
        let mut frames = 0;
        while self.signal.wait() {
            self.time.update();
            step(&self.time);
            frames += 1;
        }
        frames
    }
}
