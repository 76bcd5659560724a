use crate::{DeptreeError, Result};
use std::fmt;

/// A package name with an optional version or range. `None` resolves to the
/// provider's default (the `latest` dist-tag).
#[derive(Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct PackageVersion {
    pub name: String,
    pub version: Option<String>,
}

impl PackageVersion {
    pub fn new(name: impl Into<String>, version: Option<impl Into<String>>) -> Self {
        PackageVersion {
            name: name.into(),
            version: version.map(Into::into),
        }
    }

    pub fn latest(name: impl Into<String>) -> Self {
        PackageVersion {
            name: name.into(),
            version: None,
        }
    }

    /// Parses `name`, `name@version`, `@scope/name` or `@scope/name@version`.
    pub fn parse(input: &str) -> Result<Self> {
        let token = input.trim();

        let (scoped, body) = match token.strip_prefix('@') {
            Some(rest) => (true, rest),
            None => (false, token),
        };

        let (name, version) = match body.rfind('@') {
            Some(at) => (&body[..at], Some(&body[at + 1..])),
            None => (body, None),
        };

        if name.is_empty() {
            return Err(DeptreeError::InvalidPackageSpec {
                input: input.to_string(),
                reason: "missing package name".into(),
            });
        }

        if scoped && !name.contains('/') {
            return Err(DeptreeError::InvalidPackageSpec {
                input: input.to_string(),
                reason: "scoped name must look like @scope/name".into(),
            });
        }

        if version.is_some_and(str::is_empty) {
            return Err(DeptreeError::InvalidPackageSpec {
                input: input.to_string(),
                reason: "missing version after '@'".into(),
            });
        }

        let name = if scoped {
            format!("@{}", name)
        } else {
            name.to_string()
        };

        Ok(PackageVersion {
            name,
            version: version.map(str::to_string),
        })
    }

    pub fn full_name(&self) -> String {
        match &self.version {
            Some(version) => format!("{}@{}", self.name, version),
            None => self.name.clone(),
        }
    }
}

impl fmt::Display for PackageVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full_name())
    }
}

/// A declared dependency after alias expansion.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DependencyRequest {
    pub target: PackageVersion,
    /// The declared key when it differs from the fetched package.
    pub alias: Option<String>,
}

/// Expands `"key": "npm:<name>@<range>"` into a request for `<name>` that
/// remembers `key` as the alias. Other ranges pass through unchanged.
pub fn dependency_request(key: &str, range: &str) -> Result<DependencyRequest> {
    let Some(aliased) = range.trim().strip_prefix("npm:") else {
        return Ok(DependencyRequest {
            target: PackageVersion::new(key, Some(range)),
            alias: None,
        });
    };

    let target = PackageVersion::parse(aliased).map_err(|_| DeptreeError::InvalidPackageSpec {
        input: format!("{}@{}", key, range),
        reason: "malformed npm alias".into(),
    })?;

    Ok(DependencyRequest {
        target,
        alias: Some(key.to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_at_last_at() {
        let parsed = PackageVersion::parse("react@18.2.0").unwrap();
        assert_eq!(parsed.name, "react");
        assert_eq!(parsed.version.as_deref(), Some("18.2.0"));
    }

    #[test]
    fn bare_name_has_no_version() {
        let parsed = PackageVersion::parse("lodash").unwrap();
        assert_eq!(parsed, PackageVersion::latest("lodash"));
    }

    #[test]
    fn handles_scoped_names() {
        let parsed = PackageVersion::parse("@types/node@^20.0.0").unwrap();
        assert_eq!(parsed.name, "@types/node");
        assert_eq!(parsed.version.as_deref(), Some("^20.0.0"));

        let bare = PackageVersion::parse("@types/node").unwrap();
        assert_eq!(bare.name, "@types/node");
        assert_eq!(bare.version, None);
    }

    #[test]
    fn rejects_malformed_tokens() {
        for input in ["", "@", "foo@", "@types/node@", "@1.0.0", "@scope"] {
            assert!(
                matches!(
                    PackageVersion::parse(input),
                    Err(DeptreeError::InvalidPackageSpec { .. })
                ),
                "{input:?} should not parse"
            );
        }
    }

    #[test]
    fn full_name_round_trips() {
        let parsed = PackageVersion::parse("@scope/pkg@1.0.0").unwrap();
        assert_eq!(parsed.full_name(), "@scope/pkg@1.0.0");
        assert_eq!(parsed.to_string(), "@scope/pkg@1.0.0");
    }

    #[test]
    fn expands_npm_alias() {
        let request = dependency_request("string-width-cjs", "npm:string-width@^4.2.0").unwrap();
        assert_eq!(request.target.name, "string-width");
        assert_eq!(request.target.version.as_deref(), Some("^4.2.0"));
        assert_eq!(request.alias.as_deref(), Some("string-width-cjs"));

        let scoped = dependency_request("b", "npm:@scope/real").unwrap();
        assert_eq!(scoped.target, PackageVersion::latest("@scope/real"));
    }

    #[test]
    fn plain_range_is_not_an_alias() {
        let request = dependency_request("lib", "^1.0.0").unwrap();
        assert_eq!(request.target, PackageVersion::new("lib", Some("^1.0.0")));
        assert_eq!(request.alias, None);
    }
}
