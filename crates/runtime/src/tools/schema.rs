//! Typed parameter schemas for tool arguments.

use std::collections::HashMap;

use jsonschema::error::ValidationErrorKind;
use jsonschema::{JSONSchema, ValidationError};
use serde_json::{Map, Value, json};

use super::errors::{FieldViolation, Problem, json_type};

/// Type of a single argument field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldType {
    String,
    Number,
    Integer,
    Boolean,
    /// A string restricted to the listed values.
    Enum(Vec<String>),
}

impl FieldType {
    fn json_name(&self) -> &'static str {
        match self {
            FieldType::String | FieldType::Enum(_) => "string",
            FieldType::Number => "number",
            FieldType::Integer => "integer",
            FieldType::Boolean => "boolean",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    pub field_type: FieldType,
    pub description: String,
    pub required: bool,
}

/// The arguments object a tool accepts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParameterSchema {
    fields: Vec<Field>,
}

impl ParameterSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn required(
        self,
        name: impl Into<String>,
        field_type: FieldType,
        description: impl Into<String>,
    ) -> Self {
        self.field(name, field_type, description, true)
    }

    pub fn optional(
        self,
        name: impl Into<String>,
        field_type: FieldType,
        description: impl Into<String>,
    ) -> Self {
        self.field(name, field_type, description, false)
    }

    fn field(
        mut self,
        name: impl Into<String>,
        field_type: FieldType,
        description: impl Into<String>,
        required: bool,
    ) -> Self {
        self.fields.push(Field {
            name: name.into(),
            field_type,
            description: description.into(),
            required,
        });
        self
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Render as a JSON Schema object for the model.
    pub fn to_json_schema(&self) -> Value {
        let mut properties = Map::new();
        for field in &self.fields {
            let mut property = json!({
                "type": field.field_type.json_name(),
                "description": field.description,
            });
            if let FieldType::Enum(values) = &field.field_type {
                property["enum"] = json!(values);
            }
            properties.insert(field.name.clone(), property);
        }
        let required: Vec<&str> = self
            .fields
            .iter()
            .filter(|f| f.required)
            .map(|f| f.name.as_str())
            .collect();

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }

    /// Compile the rendered schema for argument validation.
    pub fn compile(&self) -> Result<Validator, String> {
        let compiled = JSONSchema::compile(&self.to_json_schema()).map_err(|e| e.to_string())?;
        Ok(Validator {
            schema: self.clone(),
            compiled,
        })
    }

    fn position(&self, name: &str) -> usize {
        self.fields
            .iter()
            .position(|f| f.name == name)
            .unwrap_or(self.fields.len())
    }

    fn field_named(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// A [`ParameterSchema`] compiled once, at registration.
pub struct Validator {
    schema: ParameterSchema,
    compiled: JSONSchema,
}

impl Validator {
    /// Check `arguments` against the schema.
    ///
    /// Returns only the declared fields; unknown fields are dropped. A `null`
    /// value counts as absent. Every offending field is reported once, in
    /// declaration order.
    pub fn validate(&self, arguments: &Value) -> Result<Map<String, Value>, Vec<FieldViolation>> {
        let declared = match arguments.as_object() {
            Some(object) => Value::Object(
                object
                    .iter()
                    .filter(|(name, value)| {
                        !value.is_null() && self.schema.field_named(name).is_some()
                    })
                    .map(|(name, value)| (name.clone(), value.clone()))
                    .collect(),
            ),
            None => arguments.clone(),
        };

        let violations = match self.compiled.validate(&declared) {
            Ok(()) => Vec::new(),
            Err(errors) => {
                let mut by_field: HashMap<String, Problem> = HashMap::new();
                for error in errors {
                    let pointer = error.instance_path.to_string();
                    let path = pointer
                        .trim_start_matches('/')
                        .split('/')
                        .next()
                        .unwrap_or_default();
                    let (field, problem) = self.problem(path, &error);
                    // A type mismatch explains an enum miss on the same field.
                    let keep_existing = matches!(
                        by_field.get(&field),
                        Some(Problem::WrongType { .. } | Problem::Missing)
                    );
                    if !keep_existing {
                        by_field.insert(field, problem);
                    }
                }
                let mut violations: Vec<_> = by_field
                    .into_iter()
                    .map(|(field, problem)| FieldViolation::new(field, problem))
                    .collect();
                violations.sort_by_key(|v| match v.field.as_str() {
                    "$" => 0,
                    name => 1 + self.schema.position(name),
                });
                violations
            }
        };

        match declared {
            Value::Object(validated) if violations.is_empty() => Ok(validated),
            _ => Err(violations),
        }
    }

    fn problem(&self, path: &str, error: &ValidationError<'_>) -> (String, Problem) {
        let instance: &Value = &error.instance;
        let found = json_type(instance).to_string();
        let field = self.schema.field_named(path);
        match (&error.kind, field) {
            (ValidationErrorKind::Required { property }, _) => (
                property.as_str().unwrap_or_default().to_string(),
                Problem::Missing,
            ),
            (ValidationErrorKind::Type { .. }, None) if path.is_empty() => {
                ("$".to_string(), Problem::NotAnObject { found })
            }
            (ValidationErrorKind::Type { .. }, Some(field)) => (
                field.name.clone(),
                Problem::WrongType {
                    expected: field.field_type.json_name().to_string(),
                    found,
                },
            ),
            (
                ValidationErrorKind::Enum { .. },
                Some(Field {
                    name,
                    field_type: FieldType::Enum(allowed),
                    ..
                }),
            ) => (
                name.clone(),
                Problem::NotInEnum {
                    allowed: allowed.clone(),
                    found: instance.as_str().map(str::to_string).unwrap_or(found),
                },
            ),
            _ => (
                if path.is_empty() { "$" } else { path }.to_string(),
                Problem::Malformed {
                    reason: error.to_string(),
                },
            ),
        }
    }
}

impl std::fmt::Debug for Validator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Validator")
            .field("schema", &self.schema)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validator() -> Validator {
        ParameterSchema::new()
            .required("location", FieldType::String, "City name")
            .optional(
                "unit",
                FieldType::Enum(vec!["c".into(), "f".into()]),
                "Temperature unit",
            )
            .optional("days", FieldType::Integer, "Forecast length")
            .compile()
            .unwrap()
    }

    #[test]
    fn json_schema_shape() {
        let value = validator().schema.to_json_schema();
        assert_eq!(value["type"], "object");
        assert_eq!(value["required"], json!(["location"]));
        assert_eq!(value["properties"]["location"]["type"], "string");
        assert_eq!(value["properties"]["unit"]["enum"], json!(["c", "f"]));
    }

    #[test]
    fn valid_arguments_pass_and_extras_are_dropped() {
        let args = json!({"location": "Boston", "unit": "f", "mood": "happy"});
        let validated = validator().validate(&args).unwrap();
        assert_eq!(validated.len(), 2);
        assert_eq!(validated["location"], "Boston");
        assert!(!validated.contains_key("mood"));
    }

    #[test]
    fn missing_required_field() {
        let violations = validator().validate(&json!({})).unwrap_err();
        assert_eq!(violations, vec![FieldViolation::missing("location")]);
    }

    #[test]
    fn null_counts_as_missing() {
        let violations = validator().validate(&json!({"location": null})).unwrap_err();
        assert_eq!(violations, vec![FieldViolation::missing("location")]);
    }

    #[test]
    fn reports_every_violation() {
        let args = json!({"location": 42, "unit": "k", "days": 1.5});
        let violations = validator().validate(&args).unwrap_err();
        let fields: Vec<_> = violations.iter().map(|v| v.field.as_str()).collect();
        assert_eq!(fields, ["location", "unit", "days"]);
        assert_eq!(
            violations[0].problem,
            Problem::WrongType {
                expected: "string".into(),
                found: "integer".into()
            }
        );
        assert_eq!(
            violations[1].problem,
            Problem::NotInEnum {
                allowed: vec!["c".into(), "f".into()],
                found: "k".into()
            }
        );
        assert!(matches!(violations[2].problem, Problem::WrongType { .. }));
    }

    #[test]
    fn wrong_type_wins_over_enum_miss() {
        let args = json!({"location": "Boston", "unit": 3});
        let violations = validator().validate(&args).unwrap_err();
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].field, "unit");
        assert!(matches!(violations[0].problem, Problem::WrongType { .. }));
    }

    #[test]
    fn non_object_arguments() {
        let violations = validator().validate(&json!(["Boston"])).unwrap_err();
        assert_eq!(violations[0].field, "$");
        assert_eq!(
            violations[0].problem,
            Problem::NotAnObject {
                found: "array".into()
            }
        );
    }
}
