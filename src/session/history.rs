//! Effect of each executed step on the session state.
//!
//! A checkpoint stores only the fields a step changed. State after `k` steps
//! is rebuilt by applying the first `k` checkpoints to the anchored original
//! `(x, y)` with no points or windows.

use serde::{Deserialize, Serialize};

use crate::domain::{Point, Window};
use crate::session::FunctionId;

/// The mutable state of a session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub points: Vec<Point>,
    pub windows: Vec<Window>,
}

impl Snapshot {
    pub fn new(x: Vec<f64>, y: Vec<f64>) -> Self {
        Self {
            x,
            y,
            points: Vec::new(),
            windows: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub function: FunctionId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub points: Option<Vec<Point>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub windows: Option<Vec<Window>>,
}

impl Checkpoint {
    pub fn diff(function: FunctionId, before: &Snapshot, after: &Snapshot) -> Self {
        fn changed<T: Clone + PartialEq>(before: &T, after: &T) -> Option<T> {
            (before != after).then(|| after.clone())
        }
        Self {
            function,
            x: changed(&before.x, &after.x),
            y: changed(&before.y, &after.y),
            points: changed(&before.points, &after.points),
            windows: changed(&before.windows, &after.windows),
        }
    }

    pub fn apply(&self, state: &mut Snapshot) {
        if let Some(x) = &self.x {
            state.x.clone_from(x);
        }
        if let Some(y) = &self.y {
            state.y.clone_from(y);
        }
        if let Some(points) = &self.points {
            state.points.clone_from(points);
        }
        if let Some(windows) = &self.windows {
            state.windows.clone_from(windows);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_none() && self.y.is_none() && self.points.is_none() && self.windows.is_none()
    }
}

/// Anchor plus one checkpoint per executed step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct History {
    base_x: Vec<f64>,
    base_y: Vec<f64>,
    checkpoints: Vec<Checkpoint>,
}

impl History {
    pub fn new(x: Vec<f64>, y: Vec<f64>) -> Self {
        Self {
            base_x: x,
            base_y: y,
            checkpoints: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.checkpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checkpoints.is_empty()
    }

    pub fn checkpoints(&self) -> &[Checkpoint] {
        &self.checkpoints
    }

    pub fn push(&mut self, checkpoint: Checkpoint) {
        self.checkpoints.push(checkpoint);
    }

    /// Keep the first `len` checkpoints.
    pub fn truncate(&mut self, len: usize) {
        self.checkpoints.truncate(len);
    }

    pub fn clear(&mut self) {
        self.checkpoints.clear();
    }

    /// The untouched original data.
    pub fn base(&self) -> Snapshot {
        Snapshot::new(self.base_x.clone(), self.base_y.clone())
    }

    /// State after the first `steps` checkpoints.
    pub fn restore(&self, steps: usize) -> Snapshot {
        let mut state = self.base();
        for cp in self.checkpoints.iter().take(steps) {
            cp.apply(&mut state);
        }
        state
    }
}
