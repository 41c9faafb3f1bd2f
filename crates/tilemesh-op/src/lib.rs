//! Saved operator pipelines for tilemesh.
//!
//! Operators are parameter structs. `#[derive(Op)]` gives them a [`DynOp`]
//! impl so they can be stored as `{ type_name, params }` JSON, looked up in
//! an [`OpRegistry`] and replayed by a [`Pipeline`]:
//!
//! ```ignore
//! #[derive(Clone, Serialize, Deserialize, Op)]
//! #[op(input = MeshObject, output = MeshObject, fallible)]
//! pub struct UvSnapToTile { pub tile_count: u32, pub tile_index: u32 }
//!
//! let mut pipeline = Pipeline::new();
//! pipeline.push(&UvProjectPerFace::default());
//! pipeline.push(&UvSnapToTile { tile_count: 8, tile_index: 3, ..Default::default() });
//!
//! let (input_type, output_type) = pipeline.validate(&registry)?;
//! let result = pipeline.execute(input, &registry)?;
//! ```
//!
//! Fallible operators return their own error type; the pipeline wraps it in
//! [`OpError::Failed`] with the operator's type name.

pub use rhizome_tilemesh_op_macros::Op;

// Generated `params()` bodies go through this path.
#[doc(hidden)]
pub use serde_json;

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The Rust type flowing between two pipeline steps.
///
/// Compared by `TypeId`; `name` is only for messages.
#[derive(Clone, Copy)]
pub struct OpType {
    pub type_id: TypeId,
    pub name: &'static str,
}

impl OpType {
    pub fn of<T: 'static>(name: &'static str) -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            name,
        }
    }
}

impl PartialEq for OpType {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for OpType {}

impl fmt::Debug for OpType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OpType({})", self.name)
    }
}

impl fmt::Display for OpType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// A value passed between pipeline steps, tagged with its [`OpType`].
pub struct OpValue {
    pub op_type: OpType,
    value: Box<dyn Any + Send + Sync>,
}

impl OpValue {
    /// Wraps `value` under an explicit type tag.
    pub fn new<T: Any + Send + Sync>(op_type: OpType, value: T) -> Self {
        Self {
            op_type,
            value: Box::new(value),
        }
    }

    /// Wraps `value`, tagging it with its own type.
    pub fn from<T: Any + Send + Sync>(type_name: &'static str, value: T) -> Self {
        Self::new(OpType::of::<T>(type_name), value)
    }

    /// Takes the value out as `T`.
    pub fn downcast<T: Any>(self) -> Result<T, OpError> {
        self.value
            .downcast::<T>()
            .map(|b| *b)
            .map_err(|_| OpError::DowncastFailed {
                expected: std::any::type_name::<T>(),
            })
    }
}

impl fmt::Debug for OpValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpValue")
            .field("op_type", &self.op_type)
            .finish_non_exhaustive()
    }
}

/// Errors from loading or running a pipeline.
#[derive(Debug, Error)]
pub enum OpError {
    /// A step received a value of the wrong type.
    #[error("type mismatch: expected {expected}, got {got}")]
    TypeMismatch { expected: OpType, got: OpType },

    #[error("failed to downcast to {expected}")]
    DowncastFailed { expected: &'static str },

    /// No operator is registered under this name.
    #[error("unknown operator: {0}")]
    UnknownType(String),

    /// The stored params do not fit the operator.
    #[error("invalid operator params: {0}")]
    DeserializationFailed(String),

    #[error("empty pipeline")]
    EmptyPipeline,

    /// An operator rejected its input. The operator's error is the source.
    #[error("{op} failed")]
    Failed {
        op: &'static str,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl OpError {
    pub fn failed<E>(op: &'static str, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Failed {
            op,
            source: Box::new(source),
        }
    }
}

/// A type-erased operator.
///
/// Usually derived: the generated impl downcasts the input, calls the
/// operator's `apply` and wraps the result.
pub trait DynOp: Send + Sync {
    /// Registry name, e.g. `tilemesh::UvSnapToTile`.
    fn type_name(&self) -> &'static str;

    fn input_type(&self) -> OpType;

    fn output_type(&self) -> OpType;

    fn apply_dyn(&self, input: OpValue) -> Result<OpValue, OpError>;

    /// Current parameters as JSON, in the shape the registry reads back.
    fn params(&self) -> serde_json::Value;
}

pub type BoxedOp = Box<dyn DynOp>;

type OpFactory = Box<dyn Fn(serde_json::Value) -> Result<BoxedOp, OpError> + Send + Sync>;

/// Builds operators from their stored `{ type_name, params }` form.
#[derive(Default)]
pub struct OpRegistry {
    factories: HashMap<String, OpFactory>,
}

impl OpRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a custom factory for `type_name`.
    pub fn register<F>(&mut self, type_name: &str, factory: F)
    where
        F: Fn(serde_json::Value) -> Result<BoxedOp, OpError> + Send + Sync + 'static,
    {
        self.factories.insert(type_name.to_string(), Box::new(factory));
    }

    /// Registers `T`, deserializing it straight from the params.
    pub fn register_type<T>(&mut self, type_name: &str)
    where
        T: DynOp + for<'de> Deserialize<'de> + 'static,
    {
        self.register(type_name, |params| {
            let op: T = serde_json::from_value(params)
                .map_err(|e| OpError::DeserializationFailed(e.to_string()))?;
            Ok(Box::new(op))
        });
    }

    pub fn deserialize(
        &self,
        type_name: &str,
        params: serde_json::Value,
    ) -> Result<BoxedOp, OpError> {
        let factory = self
            .factories
            .get(type_name)
            .ok_or_else(|| OpError::UnknownType(type_name.to_string()))?;
        factory(params)
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.factories.contains_key(type_name)
    }

    /// Registered names, sorted.
    pub fn type_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

/// One stored pipeline step. Missing `params` read as `{}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerialOp {
    pub type_name: String,
    #[serde(default = "empty_params")]
    pub params: serde_json::Value,
}

fn empty_params() -> serde_json::Value {
    serde_json::json!({})
}

impl SerialOp {
    pub fn from_op(op: &dyn DynOp) -> Self {
        Self {
            type_name: op.type_name().to_string(),
            params: op.params(),
        }
    }
}

/// A linear chain of stored operators, each feeding the next.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Pipeline {
    pub ops: Vec<SerialOp>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, op: &dyn DynOp) {
        self.ops.push(SerialOp::from_op(op));
    }

    pub fn push_serial(&mut self, op: SerialOp) {
        self.ops.push(op);
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Builds every step and checks that adjacent types line up.
    ///
    /// Returns the pipeline's `(input_type, output_type)`.
    pub fn validate(&self, registry: &OpRegistry) -> Result<(OpType, OpType), OpError> {
        let mut steps = self
            .ops
            .iter()
            .map(|s| registry.deserialize(&s.type_name, s.params.clone()));
        let first = steps.next().ok_or(OpError::EmptyPipeline)??;

        let mut current = first.output_type();
        for step in steps {
            let op = step?;
            if op.input_type() != current {
                return Err(OpError::TypeMismatch {
                    expected: op.input_type(),
                    got: current,
                });
            }
            current = op.output_type();
        }

        Ok((first.input_type(), current))
    }

    /// Runs every step in order, stopping at the first error.
    pub fn execute(&self, input: OpValue, registry: &OpRegistry) -> Result<OpValue, OpError> {
        let mut value = input;

        for (step, serial) in self.ops.iter().enumerate() {
            let op = registry.deserialize(&serial.type_name, serial.params.clone())?;
            if op.input_type() != value.op_type {
                return Err(OpError::TypeMismatch {
                    expected: op.input_type(),
                    got: value.op_type,
                });
            }

            tracing::debug!(step, op = op.type_name(), "executing pipeline step");
            value = op.apply_dyn(value)?;
        }

        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    struct Tally(u32);

    fn float() -> OpType {
        OpType::of::<f32>("f32")
    }

    /// `x * factor + offset`; fails on negative input when `strict`.
    #[derive(Debug, Clone, Default, Serialize, Deserialize)]
    #[serde(default)]
    struct Affine {
        factor: f32,
        offset: f32,
        strict: bool,
    }

    #[derive(Debug, Error)]
    #[error("negative input {0}")]
    struct Negative(f32);

    impl DynOp for Affine {
        fn type_name(&self) -> &'static str {
            "test::Affine"
        }

        fn input_type(&self) -> OpType {
            float()
        }

        fn output_type(&self) -> OpType {
            float()
        }

        fn apply_dyn(&self, input: OpValue) -> Result<OpValue, OpError> {
            let x: f32 = input.downcast()?;
            if self.strict && x < 0.0 {
                return Err(OpError::failed(self.type_name(), Negative(x)));
            }
            Ok(OpValue::from("f32", x * self.factor + self.offset))
        }

        fn params(&self) -> serde_json::Value {
            serde_json::to_value(self).unwrap()
        }
    }

    /// Rounds a float into a `Tally`.
    #[derive(Debug, Clone, Serialize, Deserialize)]
    struct Count;

    impl DynOp for Count {
        fn type_name(&self) -> &'static str {
            "test::Count"
        }

        fn input_type(&self) -> OpType {
            float()
        }

        fn output_type(&self) -> OpType {
            OpType::of::<Tally>("Tally")
        }

        fn apply_dyn(&self, input: OpValue) -> Result<OpValue, OpError> {
            let x: f32 = input.downcast()?;
            Ok(OpValue::new(self.output_type(), Tally(x.round() as u32)))
        }

        fn params(&self) -> serde_json::Value {
            serde_json::json!({})
        }
    }

    fn registry() -> OpRegistry {
        let mut registry = OpRegistry::new();
        registry.register_type::<Affine>("test::Affine");
        registry.register("test::Count", |_| Ok(Box::new(Count)));
        registry
    }

    fn affine(factor: f32, offset: f32) -> Affine {
        Affine {
            factor,
            offset,
            strict: false,
        }
    }

    #[test]
    fn test_op_type_ignores_name() {
        assert_eq!(OpType::of::<f32>("f32"), OpType::of::<f32>("float"));
        assert_ne!(float(), OpType::of::<Tally>("f32"));
    }

    #[test]
    fn test_op_value_downcast() {
        let value = OpValue::from("f32", 42.0f32);
        assert_eq!(value.op_type.name, "f32");
        assert_eq!(value.downcast::<f32>().unwrap(), 42.0);

        let wrong = OpValue::from("f32", 42.0f32).downcast::<i32>();
        assert!(matches!(wrong, Err(OpError::DowncastFailed { .. })));
    }

    #[test]
    fn test_registry_lookup() {
        let registry = registry();
        assert!(registry.contains("test::Count"));
        assert_eq!(registry.type_names(), vec!["test::Affine", "test::Count"]);

        let unknown = registry.deserialize("test::Missing", serde_json::json!({}));
        assert!(matches!(unknown, Err(OpError::UnknownType(_))));

        let bad = registry.deserialize("test::Affine", serde_json::json!({ "factor": "two" }));
        assert!(matches!(bad, Err(OpError::DeserializationFailed(_))));
    }

    #[test]
    fn test_validate_reports_endpoints() {
        let mut pipeline = Pipeline::new();
        pipeline.push(&affine(2.0, 0.0));
        pipeline.push(&Count);

        let (input, output) = pipeline.validate(&registry()).unwrap();
        assert_eq!(input, float());
        assert_eq!(output.name, "Tally");
    }

    #[test]
    fn test_validate_rejects_empty_and_mismatched() {
        let registry = registry();
        assert!(matches!(
            Pipeline::new().validate(&registry),
            Err(OpError::EmptyPipeline)
        ));

        let mut pipeline = Pipeline::new();
        pipeline.push(&Count);
        pipeline.push(&affine(1.0, 1.0));
        assert!(matches!(
            pipeline.validate(&registry),
            Err(OpError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_execute_chains_steps() {
        let mut pipeline = Pipeline::new();
        pipeline.push(&affine(2.0, 0.0));
        pipeline.push(&affine(1.0, 3.0));
        pipeline.push(&Count);

        let output = pipeline
            .execute(OpValue::from("f32", 5.0f32), &registry())
            .unwrap();
        assert_eq!(output.downcast::<Tally>().unwrap().0, 13);
    }

    #[test]
    fn test_failed_step_keeps_operator_error_as_source() {
        let mut pipeline = Pipeline::new();
        pipeline.push(&Affine {
            factor: 1.0,
            offset: 0.0,
            strict: true,
        });
        pipeline.push(&Count);

        let err = pipeline
            .execute(OpValue::from("f32", -4.0f32), &registry())
            .unwrap_err();
        assert!(matches!(err, OpError::Failed { op: "test::Affine", .. }));
        // The message names the operator once; the cause lives in the chain.
        assert_eq!(err.to_string(), "test::Affine failed");
        assert_eq!(err.source().unwrap().to_string(), "negative input -4");
    }

    #[test]
    fn test_pipeline_json_shape() {
        let mut pipeline = Pipeline::new();
        pipeline.push(&affine(5.0, 0.0));
        let json = serde_json::to_value(&pipeline).unwrap();
        assert_eq!(json["ops"][0]["type_name"], "test::Affine");
        assert_eq!(json["ops"][0]["params"]["factor"], 5.0);

        let loaded: Pipeline =
            serde_json::from_str(r#"{"ops": [{"type_name": "test::Count"}]}"#).unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded.ops[0].params, serde_json::json!({}));
    }
}
