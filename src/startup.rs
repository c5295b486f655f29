//! Launch options and the one-shot startup guard.

use crate::error::ConfigError;
use std::path::PathBuf;
use std::time::{Duration, Instant};

/// What the process was asked to do.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LaunchMode {
    /// Join the pool and run the field.
    Run,
    /// Wipe the shared registry and exit without running anything.
    Clear,
}

/// Parsed command line.
#[derive(Clone, Debug, PartialEq)]
pub struct LaunchOptions {
    pub mode: LaunchMode,
    pub config: Option<PathBuf>,
    pub registry: Option<PathBuf>,
    /// Run this many frames without a window.
    pub headless: Option<u64>,
    pub seed: Option<u64>,
}

impl Default for LaunchOptions {
    fn default() -> Self {
        Self {
            mode: LaunchMode::Run,
            config: None,
            registry: None,
            headless: None,
            seed: None,
        }
    }
}

pub const USAGE: &str = "\
Usage: mwpf [--clear] [--config <file>] [--registry <file>] [--headless <frames>] [--seed <n>]

  --clear              remove every surface from the shared registry and exit
  --config <file>      load settings from a JSON file
  --registry <file>    shared registry document (default: <tmp>/mwpf-registry.json)
  --headless <frames>  run without a window for the given number of frames
  --seed <n>           seed the particle RNG";

impl LaunchOptions {
    /// Parse arguments, not including the program name.
    ///
    /// `clear` without dashes is accepted too.
    pub fn parse<I, S>(args: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut options = Self::default();
        let mut args = args.into_iter().map(Into::into);

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--clear" | "clear" => options.mode = LaunchMode::Clear,
                "--config" => options.config = Some(PathBuf::from(value(&arg, args.next())?)),
                "--registry" => options.registry = Some(PathBuf::from(value(&arg, args.next())?)),
                "--headless" => options.headless = Some(number(&arg, args.next())?),
                "--seed" => options.seed = Some(number(&arg, args.next())?),
                other => {
                    return Err(ConfigError::InvalidArgument(format!("unknown argument '{}'", other)))
                }
            }
        }

        Ok(options)
    }
}

fn value(flag: &str, next: Option<String>) -> Result<String, ConfigError> {
    next.ok_or_else(|| ConfigError::InvalidArgument(format!("{} needs a value", flag)))
}

fn number(flag: &str, next: Option<String>) -> Result<u64, ConfigError> {
    let raw = value(flag, next)?;
    raw.parse()
        .map_err(|_| ConfigError::InvalidArgument(format!("{} expects a number, got '{}'", flag, raw)))
}

/// Starts the field at most once, a settling delay after the surface is
/// first seen visible.
///
/// Some window systems report a wrong position right after a window
/// appears, so the position is only read once the delay has passed.
#[derive(Clone, Copy, Debug)]
pub struct StartupGuard {
    settle_delay: Duration,
    deadline: Option<Instant>,
    started: bool,
}

impl StartupGuard {
    pub fn new(settle_delay: Duration) -> Self {
        Self {
            settle_delay,
            deadline: None,
            started: false,
        }
    }

    /// The surface finished loading; `visible` is its state at that point.
    pub fn on_load(&mut self, visible: bool, now: Instant) {
        if visible {
            self.arm(now);
        }
    }

    /// The surface's visibility changed.
    pub fn on_visibility_change(&mut self, visible: bool, now: Instant) {
        if visible {
            self.arm(now);
        }
    }

    fn arm(&mut self, now: Instant) {
        if self.started || self.deadline.is_some() {
            return;
        }
        log::debug!("startup armed, settling for {:?}", self.settle_delay);
        self.deadline = Some(now + self.settle_delay);
    }

    /// When the pending startup is due, if armed and not yet fired.
    pub fn deadline(&self) -> Option<Instant> {
        if self.started {
            None
        } else {
            self.deadline
        }
    }

    /// `true` exactly once: on the first call at or after the deadline.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if !self.started && now >= deadline => {
                self.started = true;
                true
            }
            _ => false,
        }
    }

    pub fn has_started(&self) -> bool {
        self.started
    }
}
