//! Input schemas and the string-keyed maps they operate on.
//!
//! A [`Schema`] is the only thing the pipeline knows about the shape of a
//! request: `parse` either returns the validated (and possibly transformed)
//! map or fails with a [`ValidationError`]. Middlewares and endpoints each
//! declare one.
//!
//! | Schema | Output on success |
//! |---|---|
//! | [`any()`] | the input, unchanged |
//! | [`empty()`] | an empty map, accepts anything |
//! | [`JsonSchema`] | the input, unchanged, once it satisfies a JSON Schema |
//! | [`Typed<T>`] | the input round-tripped through `T` via serde |
//! | [`Validated<T>`] | like `Typed<T>`, plus `validator` rules on `T` |
//! | `Fn(&Input) -> Result<Input, ValidationError>` | whatever the closure returns |

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use validator::Validate;

use crate::error::{Error, Issue, ValidationError};

/// Input accumulated across the pipeline.
pub type Input = Map<String, Value>;

/// Side-channel values contributed by middlewares.
pub type Options = Map<String, Value>;

/// Shared, type-erased schema.
pub type BoxedSchema = Arc<dyn Schema>;

/// Shallow, ordered merge: every key of `source` lands in `target`,
/// replacing any value already stored under the same key.
pub fn merge(target: &mut Map<String, Value>, source: Map<String, Value>) {
    for (key, value) in source {
        target.insert(key, value);
    }
}

/// A value-shape validator.
pub trait Schema: Send + Sync + 'static {
    fn parse(&self, input: &Input) -> Result<Input, ValidationError>;
}

impl<F> Schema for F
where
    F: Fn(&Input) -> Result<Input, ValidationError> + Send + Sync + 'static,
{
    fn parse(&self, input: &Input) -> Result<Input, ValidationError> {
        self(input)
    }
}

// ── Built-ins ─────────────────────────────────────────────────────────────────

/// Accepts any map and returns it unchanged.
#[derive(Clone, Copy, Debug, Default)]
pub struct Passthrough;

impl Schema for Passthrough {
    fn parse(&self, input: &Input) -> Result<Input, ValidationError> {
        Ok(input.clone())
    }
}

/// Accepts any map and contributes nothing.
#[derive(Clone, Copy, Debug, Default)]
pub struct Empty;

impl Schema for Empty {
    fn parse(&self, _input: &Input) -> Result<Input, ValidationError> {
        Ok(Input::new())
    }
}

pub fn any() -> Passthrough {
    Passthrough
}

pub fn empty() -> Empty {
    Empty
}

// ── JSON Schema ───────────────────────────────────────────────────────────────

/// A compiled JSON Schema document.
///
/// ```rust
/// use serde_json::json;
/// use tollgate::{JsonSchema, Schema};
///
/// let schema = JsonSchema::new(&json!({
///     "type": "object",
///     "required": ["name"],
///     "properties": { "name": { "type": "string" } }
/// })).unwrap();
///
/// let ok = json!({ "name": "Ada" });
/// assert!(schema.parse(ok.as_object().unwrap()).is_ok());
/// ```
pub struct JsonSchema {
    validator: jsonschema::Validator,
}

impl JsonSchema {
    /// Compiles `schema`. Fails with [`Error::Schema`] if it is not a valid
    /// JSON Schema document.
    pub fn new(schema: &Value) -> Result<Self, Error> {
        let validator = jsonschema::validator_for(schema)
            .map_err(|e| Error::Schema(e.to_string()))?;
        Ok(Self { validator })
    }
}

impl fmt::Debug for JsonSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonSchema").finish_non_exhaustive()
    }
}

impl Schema for JsonSchema {
    fn parse(&self, input: &Input) -> Result<Input, ValidationError> {
        let instance = Value::Object(input.clone());
        if self.validator.is_valid(&instance) {
            return Ok(input.clone());
        }
        let issues = self
            .validator
            .iter_errors(&instance)
            .map(|e| Issue::new(e.instance_path.as_str(), e.to_string()))
            .collect();
        Err(ValidationError::new(issues))
    }
}

// ── serde-backed schemas ──────────────────────────────────────────────────────

/// Schema backed by a Rust type.
///
/// Parsing deserializes the map into `T` and serializes it back, so unknown
/// keys are dropped and serde defaults and renames are applied.
pub struct Typed<T>(PhantomData<fn() -> T>);

impl<T> Typed<T> {
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T> Default for Typed<T> {
    fn default() -> Self { Self::new() }
}

impl<T> fmt::Debug for Typed<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Typed<{}>", std::any::type_name::<T>())
    }
}

impl<T> Schema for Typed<T>
where
    T: DeserializeOwned + Serialize + 'static,
{
    fn parse(&self, input: &Input) -> Result<Input, ValidationError> {
        let value = deserialize::<T>(input)?;
        serialize(&value)
    }
}

/// [`Typed`] plus the `validator` rules declared on `T`.
pub struct Validated<T>(PhantomData<fn() -> T>);

impl<T> Validated<T> {
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T> Default for Validated<T> {
    fn default() -> Self { Self::new() }
}

impl<T> fmt::Debug for Validated<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Validated<{}>", std::any::type_name::<T>())
    }
}

impl<T> Schema for Validated<T>
where
    T: DeserializeOwned + Serialize + Validate + 'static,
{
    fn parse(&self, input: &Input) -> Result<Input, ValidationError> {
        let value = deserialize::<T>(input)?;
        value.validate().map_err(field_issues)?;
        serialize(&value)
    }
}

fn deserialize<T: DeserializeOwned>(input: &Input) -> Result<T, ValidationError> {
    serde_json::from_value(Value::Object(input.clone()))
        .map_err(|e| ValidationError::single("", e.to_string()))
}

fn serialize<T: Serialize>(value: &T) -> Result<Input, ValidationError> {
    match serde_json::to_value(value) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(ValidationError::single("", "schema output is not an object")),
        Err(e) => Err(ValidationError::single("", e.to_string())),
    }
}

fn field_issues(errors: validator::ValidationErrors) -> ValidationError {
    let mut issues: Vec<Issue> = errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| {
                let message = e.message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| e.code.to_string());
                Issue::new(field.to_string(), message)
            })
        })
        .collect();
    // field_errors() is a HashMap
    issues.sort_by(|a, b| a.path.cmp(&b.path));
    ValidationError::new(issues)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    fn map(value: Value) -> Input {
        match value {
            Value::Object(m) => m,
            _ => panic!("fixture must be an object"),
        }
    }

    #[test]
    fn merge_later_write_wins() {
        let mut target = map(json!({"a": 1, "b": 2}));
        merge(&mut target, map(json!({"b": 3, "c": 4})));
        assert_eq!(Value::Object(target), json!({"a": 1, "b": 3, "c": 4}));
    }

    #[test]
    fn passthrough_and_empty() {
        let input = map(json!({"x": true}));
        assert_eq!(any().parse(&input).unwrap(), input);
        assert!(empty().parse(&input).unwrap().is_empty());
    }

    #[test]
    fn json_schema_reports_violations() {
        let schema = JsonSchema::new(&json!({
            "type": "object",
            "required": ["name"],
            "properties": { "name": { "type": "string" } }
        }))
        .unwrap();

        let ok = map(json!({"name": "Ada", "extra": 1}));
        assert_eq!(schema.parse(&ok).unwrap(), ok);

        let err = schema.parse(&map(json!({}))).unwrap_err();
        assert_eq!(err.issues().len(), 1);
        assert_eq!(err.issues()[0].path, "");
        assert!(err.issues()[0].message.contains("name"));
    }

    #[test]
    fn json_schema_issues_point_at_the_failing_value() {
        let schema = JsonSchema::new(&json!({
            "type": "object",
            "properties": {
                "user": {
                    "type": "object",
                    "properties": { "age": { "type": "integer" } }
                }
            }
        }))
        .unwrap();

        let err = schema.parse(&map(json!({"user": {"age": "old"}}))).unwrap_err();
        assert_eq!(err.issues().len(), 1);
        assert_eq!(err.issues()[0].path, "/user/age");
        assert!(err.issues()[0].message.contains("integer"));
    }

    #[test]
    fn json_schema_rejects_invalid_document() {
        let err = JsonSchema::new(&json!({"type": "no-such-type"})).unwrap_err();
        assert!(matches!(err, Error::Schema(_)));
    }

    #[derive(Deserialize, Serialize)]
    struct Paging {
        #[serde(default = "default_limit")]
        limit: u32,
        cursor: Option<String>,
    }

    fn default_limit() -> u32 { 20 }

    #[test]
    fn typed_strips_unknown_keys_and_applies_defaults() {
        let parsed = Typed::<Paging>::new()
            .parse(&map(json!({"cursor": "abc", "debug": true})))
            .unwrap();
        assert_eq!(Value::Object(parsed), json!({"limit": 20, "cursor": "abc"}));
    }

    #[test]
    fn typed_rejects_wrong_types() {
        let err = Typed::<Paging>::new()
            .parse(&map(json!({"limit": "many"})))
            .unwrap_err();
        assert_eq!(err.issues().len(), 1);
    }

    #[derive(Deserialize, Serialize, Validate)]
    struct Signup {
        #[validate(email)]
        email: String,
        #[validate(length(min = 8, message = "too short"))]
        password: String,
    }

    #[test]
    fn validated_collects_field_issues() {
        let err = Validated::<Signup>::new()
            .parse(&map(json!({"email": "nope", "password": "123"})))
            .unwrap_err();
        let paths: Vec<&str> = err.issues().iter().map(|i| i.path.as_str()).collect();
        assert_eq!(paths, ["email", "password"]);
        assert_eq!(err.issues()[1].message, "too short");
    }

    #[test]
    fn closure_is_a_schema() {
        let upper = |input: &Input| -> Result<Input, ValidationError> {
            let name = input
                .get("name")
                .and_then(Value::as_str)
                .ok_or_else(|| ValidationError::single("name", "expected string"))?;
            let mut out = Input::new();
            out.insert("name".into(), json!(name.to_uppercase()));
            Ok(out)
        };
        let parsed = upper.parse(&map(json!({"name": "ada"}))).unwrap();
        assert_eq!(parsed.get("name"), Some(&json!("ADA")));
        assert!(upper.parse(&Input::new()).is_err());
    }
}
