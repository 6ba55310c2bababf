use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::acquisition::domain::mda_event::{FrameIndex, MdaEvent};
use crate::shared::constants::MAX_Z_PLANES;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SequenceError {
    #[error("sequence has an unbounded time axis and cannot be pre-allocated")]
    Unbounded,
    #[error("z plan contains a non-finite value")]
    NonFiniteZPlan,
    #[error("z plan spans more than {max} planes")]
    TooManyPlanes { max: usize },
    #[error("sequence declares more frames than can be addressed")]
    TooManyFrames,
}

#[derive(Error, Debug)]
pub enum SequenceLoadError {
    #[error("failed to read sequence file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid sequence file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("sequence file {path} is not acquirable: {source}")]
    Invalid {
        path: PathBuf,
        #[source]
        source: SequenceError,
    },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TimePlan {
    /// Seconds between consecutive time points.
    #[serde(alias = "interval")]
    pub interval_s: f64,
    /// Number of time points. `None` runs until the acquisition is stopped.
    #[serde(default)]
    pub loops: Option<usize>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub z: Option<f64>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Channel {
    pub config: String,
    #[serde(default, alias = "exposure")]
    pub exposure_ms: Option<f64>,
}

/// Focus plan. Variants are distinguished by their fields in JSON.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ZPlan {
    /// Symmetric range centred on the position's focus.
    RangeAround { range: f64, step: f64 },
    TopBottom { top: f64, bottom: f64, step: f64 },
    Absolute { positions: Vec<f64> },
}

impl ZPlan {
    /// Number of focus planes. Fails for non-finite values or a span of
    /// more than [`MAX_Z_PLANES`] planes.
    pub fn count(&self) -> Result<usize, SequenceError> {
        match self {
            ZPlan::RangeAround { range, step } => steps_in(&[*range], range.abs(), *step),
            ZPlan::TopBottom { top, bottom, step } => {
                steps_in(&[*top, *bottom], (top - bottom).abs(), *step)
            }
            ZPlan::Absolute { positions } => {
                if positions.iter().any(|v| !v.is_finite()) {
                    return Err(SequenceError::NonFiniteZPlan);
                }
                Ok(positions.len().max(1))
            }
        }
    }

    /// Focus positions in acquisition order.
    pub fn positions(&self) -> Result<Vec<f64>, SequenceError> {
        let count = self.count()?;
        Ok(match self {
            ZPlan::RangeAround { .. } if count == 1 => vec![0.0],
            ZPlan::RangeAround { range, step } => {
                let start = -range.abs() / 2.0;
                (0..count).map(|i| start + i as f64 * step).collect()
            }
            ZPlan::TopBottom { top, bottom, step } => {
                let dir = if top >= bottom { 1.0 } else { -1.0 };
                (0..count).map(|i| bottom + dir * i as f64 * step).collect()
            }
            ZPlan::Absolute { positions } if positions.is_empty() => vec![0.0],
            ZPlan::Absolute { positions } => positions.clone(),
        })
    }
}

fn steps_in(bounds: &[f64], span: f64, step: f64) -> Result<usize, SequenceError> {
    if !step.is_finite() || !span.is_finite() || bounds.iter().any(|v| !v.is_finite()) {
        return Err(SequenceError::NonFiniteZPlan);
    }
    if step <= 0.0 {
        return Ok(1);
    }
    let steps = (span / step).round();
    if steps >= MAX_Z_PLANES as f64 {
        return Err(SequenceError::TooManyPlanes { max: MAX_Z_PLANES });
    }
    Ok(steps as usize + 1)
}

/// Declared cardinality of each acquisition axis.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SequenceSizes {
    /// `None` for an open-ended time plan.
    pub time: Option<usize>,
    pub position: usize,
    pub channel: usize,
    pub z: usize,
}

impl SequenceSizes {
    /// Sizes in `(t, p, c, z)` order, or an error if time is unbounded.
    pub fn bounded(&self) -> Result<[usize; 4], SequenceError> {
        let time = self.time.ok_or(SequenceError::Unbounded)?;
        Ok([time, self.position, self.channel, self.z])
    }

    pub fn contains(&self, index: &FrameIndex) -> bool {
        self.time.map_or(true, |t| index.t < t)
            && index.p < self.position
            && index.c < self.channel
            && index.z < self.z
    }

    /// Frames in one time point.
    pub fn frames_per_time_point(&self) -> Result<usize, SequenceError> {
        self.position
            .checked_mul(self.channel)
            .and_then(|n| n.checked_mul(self.z))
            .ok_or(SequenceError::TooManyFrames)
    }

    /// `Ok(None)` for an open-ended time plan.
    pub fn total_frames(&self) -> Result<Option<usize>, SequenceError> {
        let per_time_point = self.frames_per_time_point()?;
        self.time
            .map(|t| t.checked_mul(per_time_point).ok_or(SequenceError::TooManyFrames))
            .transpose()
    }
}

/// A planned multi-dimensional acquisition. Absent axes have size 1.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MdaSequence {
    #[serde(default)]
    pub time_plan: Option<TimePlan>,
    #[serde(default)]
    pub stage_positions: Vec<Position>,
    #[serde(default)]
    pub channels: Vec<Channel>,
    #[serde(default)]
    pub z_plan: Option<ZPlan>,
}

impl MdaSequence {
    pub fn from_json_file(path: &Path) -> Result<Self, SequenceLoadError> {
        let text = fs::read_to_string(path).map_err(|source| SequenceLoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let sequence: Self =
            serde_json::from_str(&text).map_err(|source| SequenceLoadError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        sequence
            .sizes()
            .map_err(|source| SequenceLoadError::Invalid {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(sequence)
    }

    /// Axis sizes, checked so that the frame count fits in `usize`.
    pub fn sizes(&self) -> Result<SequenceSizes, SequenceError> {
        let time = match &self.time_plan {
            None => Some(1),
            Some(plan) => plan.loops.map(|n| n.max(1)),
        };
        let z = match &self.z_plan {
            Some(plan) => plan.count()?,
            None => 1,
        };
        let sizes = SequenceSizes {
            time,
            position: self.stage_positions.len().max(1),
            channel: self.channels.len().max(1),
            z,
        };
        sizes.total_frames()?;
        Ok(sizes)
    }

    pub fn channel_names(&self) -> Vec<String> {
        self.channels.iter().map(|c| c.config.clone()).collect()
    }

    /// Every planned event in `t, p, c, z` order.
    ///
    /// Infinite when the time plan is open-ended.
    pub fn events(&self) -> Result<Box<dyn Iterator<Item = MdaEvent> + '_>, SequenceError> {
        let sizes = self.sizes()?;
        let (p_count, c_count) = (sizes.position, sizes.channel);
        let z_positions = match &self.z_plan {
            Some(plan) => plan.positions()?,
            None => Vec::new(),
        };
        let z_count = sizes.z;
        let channels = &self.channels;

        let times: Box<dyn Iterator<Item = usize>> = match sizes.time {
            Some(n) => Box::new(0..n),
            None => Box::new(0..),
        };

        Ok(Box::new(times.flat_map(move |t| {
            let z_positions = z_positions.clone();
            (0..p_count).flat_map(move |p| {
                let z_positions = z_positions.clone();
                (0..c_count).flat_map(move |c| {
                    let channel = channels.get(c);
                    let z_positions = z_positions.clone();
                    (0..z_count).map(move |z| MdaEvent {
                        index: FrameIndex::new(t, p, c, z),
                        channel: channel.map(|ch| ch.config.clone()),
                        exposure_ms: channel.and_then(|ch| ch.exposure_ms),
                        z_offset: z_positions.get(z).copied(),
                    })
                })
            })
        })))
    }
}
