//! Session operations as data.
//!
//! Every public session call is an `Operation`: a function id plus typed
//! parameters. An operation serializes to a `Step` (the JSON form stored in
//! algorithms) with every parameter resolved, and a `Step` parses back into an
//! operation after merging its parameters over the declared defaults.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::{CenterType, PointKind};
use crate::error::{TreatError, TreatResult};
use crate::fit::FitParameters;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FunctionId {
    AddPoint,
    ClearPoints,
    Resample,
    CenterXAxis,
    InterpolateElasticInelastic,
    InterpolateBetweenOneOrder,
    InterpolateOnOneOrder,
    InterpolateElastic,
    FitModel,
}

impl FunctionId {
    pub const ALL: [FunctionId; 9] = [
        FunctionId::AddPoint,
        FunctionId::ClearPoints,
        FunctionId::Resample,
        FunctionId::CenterXAxis,
        FunctionId::InterpolateElasticInelastic,
        FunctionId::InterpolateBetweenOneOrder,
        FunctionId::InterpolateOnOneOrder,
        FunctionId::InterpolateElastic,
        FunctionId::FitModel,
    ];

    pub fn name(self) -> &'static str {
        match self {
            FunctionId::AddPoint => "add_point",
            FunctionId::ClearPoints => "clear_points",
            FunctionId::Resample => "resample",
            FunctionId::CenterXAxis => "center_x_axis",
            FunctionId::InterpolateElasticInelastic => "interpolate_elastic_inelastic",
            FunctionId::InterpolateBetweenOneOrder => "interpolate_between_one_order",
            FunctionId::InterpolateOnOneOrder => "interpolate_on_one_order",
            FunctionId::InterpolateElastic => "interpolate_elastic",
            FunctionId::FitModel => "fit_model",
        }
    }

    /// One-line description stored with each recorded step.
    pub fn description(self) -> &'static str {
        match self {
            FunctionId::AddPoint => {
                "Adds a single point to the list of points together with a window to the list of windows with its type."
            }
            FunctionId::ClearPoints => "Clears the list of points and the list of windows.",
            FunctionId::Resample => {
                "Resamples the signal on an evenly spaced axis by locally fitting a quadratic polynomial."
            }
            FunctionId::CenterXAxis => {
                "Centers the x axis on the first elastic peak or on the middle of the first Stokes and anti-Stokes peaks."
            }
            FunctionId::InterpolateElasticInelastic => {
                "Uses the elastic peaks and the Brillouin peaks of the different orders to obtain a frequency axis from a known shift or FSR."
            }
            FunctionId::InterpolateBetweenOneOrder => {
                "Creates a frequency axis from two neighbouring elastic peaks and the Brillouin peaks between them, with a known FSR."
            }
            FunctionId::InterpolateOnOneOrder => {
                "Creates a frequency axis from one elastic peak and its Brillouin doublet, with a known shift."
            }
            FunctionId::InterpolateElastic => {
                "Uses the elastic peaks of the different orders to obtain a frequency axis from a known FSR."
            }
            FunctionId::FitModel => {
                "Fits a line-shape model to the spectrum and returns the fitted values and their standard deviations."
            }
        }
    }

    /// Parameters of this function at their declared defaults.
    pub fn default_parameters(self) -> Value {
        let value = match self {
            FunctionId::AddPoint => serde_json::to_value(AddPointParams::default()),
            FunctionId::ClearPoints => serde_json::to_value(NoParams::default()),
            FunctionId::Resample => serde_json::to_value(ResampleParams::default()),
            FunctionId::CenterXAxis => serde_json::to_value(CenterParams::default()),
            FunctionId::InterpolateElasticInelastic => serde_json::to_value(InterpolateParams::default()),
            FunctionId::InterpolateBetweenOneOrder | FunctionId::InterpolateElastic => {
                serde_json::to_value(FsrParams::default())
            }
            FunctionId::InterpolateOnOneOrder => serde_json::to_value(ShiftParams::default()),
            FunctionId::FitModel => serde_json::to_value(FitParameters::default()),
        };
        value.unwrap_or_else(|_| Value::Object(Map::new()))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NoParams {}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AddPointParams {
    /// Center of the window surrounding the peak, on the x axis.
    pub position_center_window: f64,
    /// Full width of the window. Zero makes the call a no-op.
    pub window_width: f64,
    pub type_pnt: PointKind,
}

impl Default for AddPointParams {
    fn default() -> Self {
        Self {
            position_center_window: 0.0,
            window_width: 0.0,
            type_pnt: PointKind::Elastic,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResampleParams {
    /// Target axis; evenly spaced over the current range when absent.
    pub new_x: Option<Vec<f64>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CenterParams {
    /// No-op when absent.
    pub center_type: Option<CenterType>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InterpolateParams {
    pub shift: Option<f64>,
    #[serde(rename = "FSR")]
    pub fsr: Option<f64>,
    /// Keep the map monotonic over the axis (FSR mode).
    pub bound_curvature: bool,
}

impl Default for InterpolateParams {
    fn default() -> Self {
        Self {
            shift: None,
            fsr: None,
            bound_curvature: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FsrParams {
    #[serde(rename = "FSR")]
    pub fsr: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ShiftParams {
    /// Defaults to 1 so frequencies come out relative to the calibration sample.
    pub shift: f64,
}

impl Default for ShiftParams {
    fn default() -> Self {
        Self { shift: 1.0 }
    }
}

/// A session call.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    AddPoint(AddPointParams),
    ClearPoints,
    Resample(ResampleParams),
    CenterXAxis(CenterParams),
    InterpolateElasticInelastic(InterpolateParams),
    InterpolateBetweenOneOrder(FsrParams),
    InterpolateOnOneOrder(ShiftParams),
    InterpolateElastic(FsrParams),
    FitModel(FitParameters),
}

/// A recorded call: `{"function", "parameters", "description"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub function: FunctionId,
    #[serde(default)]
    pub parameters: Value,
    #[serde(default)]
    pub description: String,
}

impl Step {
    /// Same step with its parameters reset to the declared defaults.
    pub fn with_default_parameters(&self) -> Self {
        Self {
            function: self.function,
            parameters: self.function.default_parameters(),
            description: self.description.clone(),
        }
    }
}

impl Operation {
    pub fn function(&self) -> FunctionId {
        match self {
            Operation::AddPoint(_) => FunctionId::AddPoint,
            Operation::ClearPoints => FunctionId::ClearPoints,
            Operation::Resample(_) => FunctionId::Resample,
            Operation::CenterXAxis(_) => FunctionId::CenterXAxis,
            Operation::InterpolateElasticInelastic(_) => FunctionId::InterpolateElasticInelastic,
            Operation::InterpolateBetweenOneOrder(_) => FunctionId::InterpolateBetweenOneOrder,
            Operation::InterpolateOnOneOrder(_) => FunctionId::InterpolateOnOneOrder,
            Operation::InterpolateElastic(_) => FunctionId::InterpolateElastic,
            Operation::FitModel(_) => FunctionId::FitModel,
        }
    }

    fn parameters(&self) -> serde_json::Result<Value> {
        match self {
            Operation::AddPoint(p) => serde_json::to_value(p),
            Operation::ClearPoints => serde_json::to_value(NoParams::default()),
            Operation::Resample(p) => serde_json::to_value(p),
            Operation::CenterXAxis(p) => serde_json::to_value(p),
            Operation::InterpolateElasticInelastic(p) => serde_json::to_value(p),
            Operation::InterpolateBetweenOneOrder(p) | Operation::InterpolateElastic(p) => serde_json::to_value(p),
            Operation::InterpolateOnOneOrder(p) => serde_json::to_value(p),
            Operation::FitModel(p) => serde_json::to_value(p),
        }
    }

    /// The step recorded for this call, with every parameter resolved.
    pub fn to_step(&self) -> TreatResult<Step> {
        let function = self.function();
        let parameters = self.parameters().map_err(|e| {
            TreatError::configuration(format!("Cannot serialize parameters of {}: {e}", function.name()))
        })?;
        Ok(Step {
            function,
            parameters,
            description: function.description().to_string(),
        })
    }

    /// Parse a recorded step; missing parameters take their defaults.
    pub fn from_step(step: &Step) -> TreatResult<Self> {
        let function = step.function;
        let merged = merge_over_defaults(function, &step.parameters)?;
        Ok(match function {
            FunctionId::AddPoint => Operation::AddPoint(parse(function, merged)?),
            FunctionId::ClearPoints => {
                let _: NoParams = parse(function, merged)?;
                Operation::ClearPoints
            }
            FunctionId::Resample => Operation::Resample(parse(function, merged)?),
            FunctionId::CenterXAxis => Operation::CenterXAxis(parse(function, merged)?),
            FunctionId::InterpolateElasticInelastic => Operation::InterpolateElasticInelastic(parse(function, merged)?),
            FunctionId::InterpolateBetweenOneOrder => Operation::InterpolateBetweenOneOrder(parse(function, merged)?),
            FunctionId::InterpolateOnOneOrder => Operation::InterpolateOnOneOrder(parse(function, merged)?),
            FunctionId::InterpolateElastic => Operation::InterpolateElastic(parse(function, merged)?),
            FunctionId::FitModel => Operation::FitModel(parse(function, merged)?),
        })
    }
}

fn merge_over_defaults(function: FunctionId, given: &Value) -> TreatResult<Value> {
    let mut merged = match function.default_parameters() {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    match given {
        Value::Null => {}
        Value::Object(map) => {
            for (k, v) in map {
                merged.insert(k.clone(), v.clone());
            }
        }
        other => {
            return Err(TreatError::configuration(format!(
                "Parameters of {} must be an object, got {other}",
                function.name()
            )));
        }
    }
    Ok(Value::Object(merged))
}

fn parse<T: DeserializeOwned>(function: FunctionId, value: Value) -> TreatResult<T> {
    serde_json::from_value(value)
        .map_err(|e| TreatError::configuration(format!("Invalid parameters for {}: {e}", function.name())))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::domain::ModelKind;

    #[test]
    fn function_names_match_their_serde_form() {
        for f in FunctionId::ALL {
            let s = serde_json::to_value(f).unwrap();
            assert_eq!(s, json!(f.name()));
        }
    }

    #[test]
    fn steps_carry_every_resolved_parameter() {
        let op = Operation::AddPoint(AddPointParams {
            position_center_window: 401.0,
            window_width: 10.0,
            type_pnt: PointKind::AntiStokes,
        });
        let step = op.to_step().unwrap();
        assert_eq!(
            step.parameters,
            json!({"position_center_window": 401.0, "window_width": 10.0, "type_pnt": "Anti-Stokes"})
        );
        assert_eq!(Operation::from_step(&step).unwrap(), op);
    }

    #[test]
    fn missing_parameters_take_defaults() {
        let step = Step {
            function: FunctionId::InterpolateOnOneOrder,
            parameters: json!({}),
            description: String::new(),
        };
        assert_eq!(
            Operation::from_step(&step).unwrap(),
            Operation::InterpolateOnOneOrder(ShiftParams { shift: 1.0 })
        );

        let fit = Step {
            function: FunctionId::FitModel,
            parameters: json!({"model": "DHO elastic", "linewidth": 0.4}),
            description: String::new(),
        };
        let Operation::FitModel(p) = Operation::from_step(&fit).unwrap() else {
            panic!("expected a fit");
        };
        assert_eq!(p.model, ModelKind::DhoElastic);
        assert_eq!(p.window_peak_fit, 3.0);
    }

    #[test]
    fn fsr_keeps_its_upper_case_key() {
        let step = Operation::InterpolateElastic(FsrParams { fsr: Some(30.0) }).to_step().unwrap();
        assert_eq!(step.parameters, json!({"FSR": 30.0}));
    }

    #[test]
    fn unknown_parameters_are_configuration_errors() {
        let step = Step {
            function: FunctionId::ClearPoints,
            parameters: json!({"everything": true}),
            description: String::new(),
        };
        assert!(matches!(Operation::from_step(&step), Err(TreatError::Configuration(_))));
        let bad: serde_json::Result<Step> = serde_json::from_value(json!({"function": "teleport"}));
        assert!(bad.is_err());
    }
}
