//! Algorithm documents: an ordered list of steps plus metadata.
//!
//! ```json
//! {"name": "...", "version": "...", "author": "...", "description": "...",
//!  "functions": [{"function": "...", "parameters": {...}, "description": "..."}]}
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{TreatError, TreatResult};
use crate::session::Step;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Algorithm {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default = "default_author")]
    pub author: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub functions: Vec<Step>,
}

fn default_name() -> String {
    "Unnamed Algorithm".to_string()
}

fn default_version() -> String {
    "0.1".to_string()
}

fn default_author() -> String {
    "Unknown".to_string()
}

impl Default for Algorithm {
    fn default() -> Self {
        Self::new(default_name(), default_version(), default_author(), "")
    }
}

impl Algorithm {
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        author: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            author: author.into(),
            description: description.into(),
            functions: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    pub fn from_json_str(s: &str) -> TreatResult<Self> {
        serde_json::from_str(s).map_err(|e| TreatError::configuration(format!("Invalid algorithm JSON: {e}")))
    }

    /// Pretty JSON. Without `save_parameters`, every step's parameters are
    /// reset to their declared defaults.
    pub fn to_json_string(&self, save_parameters: bool) -> TreatResult<String> {
        let doc = if save_parameters {
            self.clone()
        } else {
            Self {
                functions: self.functions.iter().map(Step::with_default_parameters).collect(),
                ..self.clone()
            }
        };
        serde_json::to_string_pretty(&doc)
            .map_err(|e| TreatError::configuration(format!("Failed to serialize algorithm: {e}")))
    }

    /// Move step `from` to position `to`.
    pub fn move_step(&mut self, from: usize, to: usize) -> TreatResult<()> {
        let n = self.functions.len();
        if from >= n || to >= n {
            return Err(TreatError::configuration(format!(
                "Cannot move step {from} to {to} in an algorithm of {n} steps."
            )));
        }
        let step = self.functions.remove(from);
        self.functions.insert(to, step);
        Ok(())
    }

    /// Remove step `step`, or the last one. Returns the removed index.
    pub fn remove_step(&mut self, step: Option<usize>) -> TreatResult<usize> {
        let n = self.functions.len();
        let index = match step {
            Some(i) => i,
            None => n.checked_sub(1).ok_or_else(|| TreatError::configuration("The algorithm has no step."))?,
        };
        if index >= n {
            return Err(TreatError::configuration(format!(
                "The step has to be smaller than the number of functions (here {n})."
            )));
        }
        self.functions.remove(index);
        Ok(index)
    }
}
