use crate::{DeptreeError, Result};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum DependencyField {
    #[default]
    Dependencies,
    DevDependencies,
}

impl DependencyField {
    pub fn as_str(&self) -> &'static str {
        match self {
            DependencyField::Dependencies => "dependencies",
            DependencyField::DevDependencies => "devDependencies",
        }
    }
}

impl fmt::Display for DependencyField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DependencyField {
    type Err = DeptreeError;

    fn from_str(value: &str) -> Result<Self> {
        match value {
            "dependencies" => Ok(DependencyField::Dependencies),
            "devDependencies" => Ok(DependencyField::DevDependencies),
            other => Err(DeptreeError::InvalidDependencies {
                package: String::new(),
                field: other.to_string(),
                reason: "expected dependencies or devDependencies".into(),
            }),
        }
    }
}

/// A single version's package.json as published to the registry.
#[derive(Clone, Debug, PartialEq)]
pub struct Manifest {
    raw: Value,
}

impl Manifest {
    pub fn new(raw: Value) -> Self {
        Manifest { raw }
    }

    pub fn raw(&self) -> &Value {
        &self.raw
    }

    pub fn name(&self) -> Result<&str> {
        self.string_field("name")
    }

    pub fn version(&self) -> Result<&str> {
        self.string_field("version")
    }

    pub fn full_name(&self) -> Result<String> {
        Ok(format!("{}@{}", self.name()?, self.version()?))
    }

    /// Looks up a dotted path such as `repository.url` or `engines.node`.
    pub fn get(&self, path: &str) -> Option<&Value> {
        lookup_path(&self.raw, path)
    }

    /// The declared `(name, range)` pairs of `field`, in declaration order.
    pub fn dependencies(&self, field: DependencyField) -> Result<Vec<(String, String)>> {
        let value = match self.raw.get(field.as_str()) {
            None | Some(Value::Null) => return Ok(Vec::new()),
            Some(value) => value,
        };

        let Value::Object(map) = value else {
            return Err(self.invalid_dependencies(field, "expected an object of name to range"));
        };

        let mut pairs = Vec::with_capacity(map.len());

        for (name, range) in map {
            let Some(range) = range.as_str() else {
                return Err(self.invalid_dependencies(
                    field,
                    &format!("range for {} is not a string", name),
                ));
            };
            pairs.push((name.clone(), range.to_string()));
        }

        Ok(pairs)
    }

    fn string_field(&self, key: &str) -> Result<&str> {
        self.raw
            .get(key)
            .and_then(Value::as_str)
            .ok_or_else(|| DeptreeError::ManifestInvalid {
                package: self.describe(),
                reason: format!("missing string field {}", key),
            })
    }

    fn invalid_dependencies(&self, field: DependencyField, reason: &str) -> DeptreeError {
        DeptreeError::InvalidDependencies {
            package: self.describe(),
            field: field.as_str().to_string(),
            reason: reason.to_string(),
        }
    }

    fn describe(&self) -> String {
        let name = self.raw.get("name").and_then(Value::as_str);
        let version = self.raw.get("version").and_then(Value::as_str);

        match (name, version) {
            (Some(name), Some(version)) => format!("{}@{}", name, version),
            (Some(name), None) => name.to_string(),
            _ => "<unnamed manifest>".to_string(),
        }
    }
}

impl From<Value> for Manifest {
    fn from(raw: Value) -> Self {
        Manifest::new(raw)
    }
}

pub(crate) fn lookup_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    if path.is_empty() {
        return Some(value);
    }

    let mut current = value;

    for segment in path.split('.') {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }

    Some(current)
}
