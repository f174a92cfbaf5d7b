use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum StageError {
    #[error("invalid duration '{input}': {source}")]
    InvalidDuration {
        input: String,
        #[source]
        source: humantime::DurationError,
    },
    #[error("invalid stage '{0}': expected '<duration>:<target>'")]
    InvalidStage(String),
    #[error("stage profile has no stages")]
    Empty,
}

/// Parses durations such as `30s`, `1m`, `500ms`, `1m 30s` or `1min`.
pub fn parse_duration(s: &str) -> Result<Duration, StageError> {
    humantime::parse_duration(s.trim()).map_err(|source| StageError::InvalidDuration {
        input: s.to_string(),
        source,
    })
}

/// Ramp the virtual-user count to `target` over `duration`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stage {
    pub duration: Duration,
    pub target: usize,
}

impl Stage {
    pub fn new(duration: Duration, target: usize) -> Stage {
        Stage { duration, target }
    }
}

impl FromStr for Stage {
    type Err = StageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (duration, target) = s
            .trim()
            .split_once(':')
            .ok_or_else(|| StageError::InvalidStage(s.to_string()))?;
        let duration = parse_duration(duration)?;
        let target = target
            .trim()
            .parse()
            .map_err(|_| StageError::InvalidStage(s.to_string()))?;
        Ok(Stage::new(duration, target))
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let duration = humantime::format_duration(self.duration).to_string();
        write!(f, "{}:{}", duration.replace(' ', ""), self.target)
    }
}

/// Ordered ramp stages. The population starts at zero and every stage moves
/// it linearly toward its own target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageProfile {
    stages: Vec<Stage>,
}

impl StageProfile {
    pub fn new(stages: Vec<Stage>) -> Result<StageProfile, StageError> {
        if stages.is_empty() {
            return Err(StageError::Empty);
        }
        Ok(StageProfile { stages })
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn total_duration(&self) -> Duration {
        self.stages.iter().map(|s| s.duration).sum()
    }

    pub fn peak_target(&self) -> usize {
        self.stages.iter().map(|s| s.target).max().unwrap_or(0)
    }

    /// Virtual users that should be running `elapsed` into the run, or `None`
    /// once the profile is over.
    pub fn target_at(&self, elapsed: Duration) -> Option<usize> {
        let mut stage_start = Duration::ZERO;
        let mut from = 0usize;
        for stage in &self.stages {
            let stage_end = stage_start + stage.duration;
            if elapsed < stage_end {
                let progress =
                    (elapsed - stage_start).as_secs_f64() / stage.duration.as_secs_f64();
                let delta = stage.target as f64 - from as f64;
                let target = from as f64 + delta * progress;
                return Some(target.floor().max(0.0) as usize);
            }
            stage_start = stage_end;
            from = stage.target;
        }
        None
    }
}

impl Default for StageProfile {
    /// 0 → 100 VUs over 30s, hold 100 for a minute, back to 0 over 30s.
    fn default() -> Self {
        StageProfile {
            stages: vec![
                Stage::new(Duration::from_secs(30), 100),
                Stage::new(Duration::from_secs(60), 100),
                Stage::new(Duration::from_secs(30), 0),
            ],
        }
    }
}

impl FromStr for StageProfile {
    type Err = StageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let stages = s
            .split(',')
            .filter(|part| !part.trim().is_empty())
            .map(str::parse)
            .collect::<Result<Vec<Stage>, _>>()?;
        StageProfile::new(stages)
    }
}

impl fmt::Display for StageProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.stages.iter().map(|s| s.to_string()).collect();
        write!(f, "{}", parts.join(","))
    }
}
