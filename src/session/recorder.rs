//! Interactive analysis session with step recording and replay.
//!
//! Every public operation goes through `Session::apply`, which:
//!
//! - runs the operation on a copy of the state (failures leave the session untouched)
//! - appends the resolved step to the algorithm when recording is on
//! - appends a checkpoint of the changed fields when history saving is on
//!
//! `run_algorithm(k)` regenerates the state after step `k` from the closest
//! checkpoint, running only the steps the history does not cover yet.

use crate::calibrate::{self, Constraint, PeakSet};
use crate::config::AnalysisConfig;
use crate::domain::{CenterType, FitResult, Point, PointKind, Spectrum, Window, x_range};
use crate::error::{TreatError, TreatResult};
use crate::fit::{FitEngine, FitParameters};
use crate::session::{
    AddPointParams, Algorithm, CenterParams, Checkpoint, FsrParams, History, InterpolateParams, Operation,
    ResampleParams, ShiftParams, Snapshot,
};
use crate::signal::{localize_in_window, resample};

#[derive(Debug, Clone)]
pub struct Session {
    state: Snapshot,
    algorithm: Algorithm,
    history: History,
    config: AnalysisConfig,
    engine: FitEngine,
    last_fit: Option<FitResult>,
    record_algorithm: bool,
    save_history: bool,
}

impl Session {
    pub fn new(spectrum: Spectrum) -> Self {
        Self::with_config(spectrum, AnalysisConfig::default())
    }

    pub fn with_config(spectrum: Spectrum, config: AnalysisConfig) -> Self {
        let Spectrum { x, y } = spectrum;
        Self {
            history: History::new(x.clone(), y.clone()),
            state: Snapshot::new(x, y),
            algorithm: Algorithm::default(),
            config,
            engine: FitEngine::new(),
            last_fit: None,
            record_algorithm: true,
            save_history: true,
        }
    }

    pub fn x(&self) -> &[f64] {
        &self.state.x
    }

    pub fn y(&self) -> &[f64] {
        &self.state.y
    }

    pub fn points(&self) -> &[Point] {
        &self.state.points
    }

    pub fn windows(&self) -> &[Window] {
        &self.state.windows
    }

    pub fn state(&self) -> &Snapshot {
        &self.state
    }

    pub fn algorithm(&self) -> &Algorithm {
        &self.algorithm
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Result of the last successful `fit_model`.
    pub fn last_fit(&self) -> Option<&FitResult> {
        self.last_fit.as_ref()
    }

    /// Treatment applied by the last `fit_model` call.
    pub fn treat_steps(&self) -> &[String] {
        self.engine.treat_steps()
    }

    pub fn set_recording(&mut self, on: bool) {
        self.record_algorithm = on;
    }

    pub fn set_history_saving(&mut self, on: bool) {
        self.save_history = on;
    }

    /// Run `f` without appending steps to the algorithm.
    pub fn without_recording<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        let previous = self.record_algorithm;
        self.record_algorithm = false;
        let out = f(self);
        self.record_algorithm = previous;
        out
    }

    /// Replace the data. The new data becomes the replay anchor.
    pub fn set_data(&mut self, spectrum: Spectrum) {
        let Spectrum { x, y } = spectrum;
        self.history = History::new(x.clone(), y.clone());
        self.state = Snapshot::new(x, y);
        self.last_fit = None;
    }

    /// Execute one operation, recording it according to the session flags.
    pub fn apply(&mut self, op: Operation) -> TreatResult<()> {
        let function = op.function();
        let step = if self.record_algorithm { Some(op.to_step()?) } else { None };

        let mut next = self.state.clone();
        let fit = self.execute(&op, &mut next)?;

        if let Some(step) = step {
            log::debug!("recorded step {} ({})", self.algorithm.len(), function.name());
            self.algorithm.functions.push(step);
        }
        if self.save_history {
            self.history.push(Checkpoint::diff(function, &self.state, &next));
        }
        self.state = next;
        if fit.is_some() {
            self.last_fit = fit;
        }
        Ok(())
    }

    fn execute(&mut self, op: &Operation, state: &mut Snapshot) -> TreatResult<Option<FitResult>> {
        match op {
            Operation::AddPoint(p) => add_point(state, p)?,
            Operation::ClearPoints => clear_points(state),
            Operation::Resample(p) => {
                let (x, y) = resample(&state.x, &state.y, p.new_x.as_deref())?;
                state.x = x;
                state.y = y;
            }
            Operation::CenterXAxis(p) => {
                if let Some(center_type) = p.center_type {
                    state.x = calibrate::center_x_axis(&state.x, &state.points, center_type)?;
                    clear_points(state);
                }
            }
            Operation::InterpolateElasticInelastic(p) => {
                let constraint = Constraint::from_options(p.fsr, p.shift)?;
                let peaks = PeakSet::from_points(&state.points);
                let map = calibrate::calibrate(&peaks, x_range(&state.x), constraint, p.bound_curvature)?;
                apply_map(state, map);
            }
            Operation::InterpolateBetweenOneOrder(p) => {
                let fsr = require_fsr(p)?;
                let map = calibrate::between_one_order(&PeakSet::from_points(&state.points), fsr)?;
                apply_map(state, map);
            }
            Operation::InterpolateOnOneOrder(p) => {
                let map = calibrate::on_one_order(&PeakSet::from_points(&state.points), p.shift)?;
                apply_map(state, map);
            }
            Operation::InterpolateElastic(p) => {
                let fsr = require_fsr(p)?;
                let peaks = PeakSet::from_points(&state.points);
                let map = calibrate::elastic_only(&peaks.elastic, fsr)?;
                apply_map(state, map);
            }
            Operation::FitModel(p) => {
                let result = self.engine.run(&state.x, &state.y, p, &self.config)?;
                return Ok(Some(result));
            }
        }
        Ok(None)
    }

    /// Mark the extremum found in a window of full width `window_width`
    /// around `center`. A zero width is a no-op.
    pub fn add_point(&mut self, center: f64, window_width: f64, kind: PointKind) -> TreatResult<()> {
        self.apply(Operation::AddPoint(AddPointParams {
            position_center_window: center,
            window_width,
            type_pnt: kind,
        }))
    }

    pub fn clear_points(&mut self) -> TreatResult<()> {
        self.apply(Operation::ClearPoints)
    }

    pub fn resample(&mut self, new_x: Option<Vec<f64>>) -> TreatResult<()> {
        self.apply(Operation::Resample(ResampleParams { new_x }))
    }

    pub fn center_x_axis(&mut self, center_type: Option<CenterType>) -> TreatResult<()> {
        self.apply(Operation::CenterXAxis(CenterParams { center_type }))
    }

    pub fn interpolate_elastic_inelastic(&mut self, shift: Option<f64>, fsr: Option<f64>) -> TreatResult<()> {
        self.apply(Operation::InterpolateElasticInelastic(InterpolateParams {
            shift,
            fsr,
            ..InterpolateParams::default()
        }))
    }

    pub fn interpolate_between_one_order(&mut self, fsr: f64) -> TreatResult<()> {
        self.apply(Operation::InterpolateBetweenOneOrder(FsrParams { fsr: Some(fsr) }))
    }

    pub fn interpolate_on_one_order(&mut self, shift: f64) -> TreatResult<()> {
        self.apply(Operation::InterpolateOnOneOrder(ShiftParams { shift }))
    }

    pub fn interpolate_elastic(&mut self, fsr: f64) -> TreatResult<()> {
        self.apply(Operation::InterpolateElastic(FsrParams { fsr: Some(fsr) }))
    }

    pub fn fit_model(&mut self, params: FitParameters) -> TreatResult<FitResult> {
        self.apply(Operation::FitModel(params))?;
        self.last_fit
            .clone()
            .ok_or_else(|| TreatError::fit_convergence("the fit produced no result"))
    }

    /// Start a new, empty algorithm and forget the history.
    pub fn create_algorithm(
        &mut self,
        name: impl Into<String>,
        version: impl Into<String>,
        author: impl Into<String>,
        description: impl Into<String>,
    ) {
        self.algorithm = Algorithm::new(name, version, author, description);
        self.history.clear();
    }

    /// Adopt an existing algorithm and forget the history.
    pub fn open_algorithm(&mut self, algorithm: Algorithm) {
        log::info!("opened algorithm '{}' ({} steps)", algorithm.name, algorithm.len());
        self.algorithm = algorithm;
        self.history.clear();
    }

    /// Move a step; checkpoints from the earlier of the two positions on are dropped.
    pub fn move_step(&mut self, from: usize, to: usize) -> TreatResult<()> {
        self.algorithm.move_step(from, to)?;
        self.history.truncate(from.min(to));
        Ok(())
    }

    /// Remove a step (the last one by default) and the checkpoints from it on.
    pub fn remove_step(&mut self, step: Option<usize>) -> TreatResult<()> {
        let removed = self.algorithm.remove_step(step)?;
        self.history.truncate(removed);
        Ok(())
    }

    /// Bring the state to just after step `step` (the last step by default).
    pub fn run_algorithm(&mut self, step: Option<usize>) -> TreatResult<()> {
        let n = self.algorithm.len();
        let target = match step {
            Some(s) => s,
            None => n
                .checked_sub(1)
                .ok_or_else(|| TreatError::configuration("The algorithm has no step to run."))?,
        };
        if target >= n {
            return Err(TreatError::configuration(format!(
                "The step has to be smaller than the number of functions (here {n}), got {target}."
            )));
        }

        let covered = self.history.len();
        let first = if target == 0 || covered == 0 {
            self.history.clear();
            self.state = self.history.base();
            0
        } else if target < covered {
            self.history.truncate(target);
            self.state = self.history.restore(target);
            target
        } else {
            self.state = self.history.restore(covered);
            covered
        };
        log::info!("replaying steps {first}..={target} of '{}'", self.algorithm.name);

        let save_history = self.save_history;
        self.save_history = true;
        let out = self.without_recording(|session| {
            for i in first..=target {
                let op = Operation::from_step(&session.algorithm.functions[i])?;
                session.apply(op)?;
            }
            Ok(())
        });
        self.save_history = save_history;
        out
    }
}

fn clear_points(state: &mut Snapshot) {
    state.points.clear();
    state.windows.clear();
}

fn add_point(state: &mut Snapshot, p: &AddPointParams) -> TreatResult<()> {
    if p.window_width == 0.0 {
        return Ok(());
    }
    let (lo, hi) = x_range(&state.x);
    let window = Window::centered(p.position_center_window, p.window_width)
        .clamp_to(lo, hi)
        .ok_or_else(|| {
            TreatError::insufficient_window(format!(
                "the window around {} is out of the range of the data [{lo}, {hi}]",
                p.position_center_window
            ))
        })?;
    let position = localize_in_window(&state.x, &state.y, window)?;
    let ordinal = state
        .points
        .iter()
        .filter(|q| q.kind() == Some(p.type_pnt))
        .count();
    state.points.push(Point::new(p.type_pnt, ordinal, position));
    state.windows.push(window);
    Ok(())
}

fn apply_map(state: &mut Snapshot, map: calibrate::AxisMap) {
    log::info!("new axis: f(x) = {:.6e} x² + {:.6e} x + {:.6e}", map.a, map.b, map.c);
    state.x = map.apply(&state.x);
    clear_points(state);
}

fn require_fsr(p: &FsrParams) -> TreatResult<f64> {
    match p.fsr {
        Some(f) if f.is_finite() && f != 0.0 => Ok(f),
        Some(f) => Err(TreatError::configuration(format!("Invalid FSR {f}."))),
        None => Err(TreatError::configuration("The FSR must be given to calibrate the axis.")),
    }
}
