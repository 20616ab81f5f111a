//! Validated, immutable plans.
//!
//! JSON shape: `{"steps":[{"op":"codec.csv.decode","args":{}}, ...]}`.
//! Construction normalizes op aliases, builds one `OpSpec` per step, and checks
//! codec placement. A `Plan` value is therefore always executable.

use serde::{Deserialize, Serialize};

use crate::dag::{canonical_name, OpClass, OpSpec};
use crate::error::{Error, Result};
use crate::hash::{hash_serde, Hash256};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub op: String,
    #[serde(default = "empty_args")]
    pub args: serde_json::Value,
}

fn empty_args() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

impl Step {
    pub fn new(op: impl Into<String>, args: serde_json::Value) -> Self {
        Self {
            op: op.into(),
            args,
        }
    }
}

#[derive(Serialize, Deserialize)]
struct PlanDoc {
    steps: Vec<Step>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Plan {
    steps: Vec<Step>,
    specs: Vec<OpSpec>,
}

impl Plan {
    /// Validate and normalize a step list.
    pub fn new(steps: Vec<Step>) -> Result<Self> {
        if steps.is_empty() {
            return Err(Error::Plan("plan has no steps".into()));
        }

        let mut normalized = Vec::with_capacity(steps.len());
        let mut specs = Vec::with_capacity(steps.len());
        for step in steps {
            let name = canonical_name(&step.op)
                .ok_or_else(|| Error::Plan(format!("unknown op: '{}'", step.op)))?;
            let args = if step.args.is_null() {
                empty_args()
            } else {
                step.args
            };
            specs.push(OpSpec::from_step(name, &args)?);
            normalized.push(Step::new(name, args));
        }

        check_codecs(&specs)?;
        Ok(Self {
            steps: normalized,
            specs,
        })
    }

    pub fn from_json(src: &str) -> Result<Self> {
        let doc: PlanDoc = serde_json::from_str(src)?;
        Self::new(doc.steps)
    }

    /// Same document shape as JSON, written in YAML.
    pub fn from_yaml(src: &str) -> Result<Self> {
        let doc: PlanDoc = serde_yaml::from_str(src)?;
        Self::new(doc.steps)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.doc())?)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.doc())?)
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(&self.doc())?)
    }

    fn doc(&self) -> PlanDoc {
        PlanDoc {
            steps: self.steps.clone(),
        }
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn specs(&self) -> &[OpSpec] {
        &self.specs
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// The transform steps between decoder and encoder.
    pub fn transforms(&self) -> &[OpSpec] {
        let n = self.specs.len();
        if n < 2 {
            return &[];
        }
        &self.specs[1..n - 1]
    }

    pub fn decoder(&self) -> &OpSpec {
        &self.specs[0]
    }

    pub fn encoder(&self) -> &OpSpec {
        &self.specs[self.specs.len() - 1]
    }

    /// Stable content hash of the normalized step list.
    pub fn fingerprint(&self) -> Result<Hash256> {
        hash_serde(&self.steps)
    }
}

impl Serialize for Plan {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        PlanDoc {
            steps: self.steps.clone(),
        }
        .serialize(s)
    }
}

impl<'de> Deserialize<'de> for Plan {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let doc = PlanDoc::deserialize(d)?;
        Plan::new(doc.steps).map_err(serde::de::Error::custom)
    }
}

fn check_codecs(specs: &[OpSpec]) -> Result<()> {
    let last = specs.len() - 1;

    let decoders: Vec<usize> = positions(specs, OpClass::Decoder);
    match decoders.as_slice() {
        [] => return Err(Error::Plan("plan has no decoder".into())),
        [0] => {}
        [i] => {
            return Err(Error::Plan(format!(
                "decoder '{}' must be the first step",
                specs[*i].name()
            )))
        }
        _ => return Err(Error::Plan("multiple decoders not supported".into())),
    }

    let encoders: Vec<usize> = positions(specs, OpClass::Encoder);
    match encoders.as_slice() {
        [] => Err(Error::Plan("plan has no encoder".into())),
        [i] if *i == last => Ok(()),
        [i] => Err(Error::Plan(format!(
            "encoder '{}' must be the last step",
            specs[*i].name()
        ))),
        _ => Err(Error::Plan("multiple encoders not supported".into())),
    }
}

fn positions(specs: &[OpSpec], class: OpClass) -> Vec<usize> {
    specs
        .iter()
        .enumerate()
        .filter(|(_, s)| s.class() == class)
        .map(|(i, _)| i)
        .collect()
}
