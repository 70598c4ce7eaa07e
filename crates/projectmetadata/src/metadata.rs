use crate::error::ParseError;
use crate::textproto::{self, Field, Message, Value};
use serde::{Deserialize, Serialize};
use std::fmt;

/// `third_party { ... }` block of a METADATA file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThirdParty {
    pub version: String,
}

/// Parsed METADATA for one project (immutable once published)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectMetadata {
    /// Directory containing the METADATA file
    project: String,
    name: String,
    description: String,
    third_party: Option<ThirdParty>,
}

impl ProjectMetadata {
    pub fn new(
        project: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
        version: Option<&str>,
    ) -> Self {
        Self {
            project: project.into(),
            name: name.into(),
            description: description.into(),
            third_party: version.map(|v| ThirdParty {
                version: v.to_string(),
            }),
        }
    }

    /// Parses a text-format METADATA body. Unknown fields are discarded.
    pub fn parse(project: impl Into<String>, data: &[u8]) -> Result<Self, ParseError> {
        let message = textproto::parse(data)?;
        let mut metadata = Self {
            project: project.into(),
            name: String::new(),
            description: String::new(),
            third_party: None,
        };

        metadata.name = singular_string(&message, "name")?.unwrap_or_default();
        metadata.description = singular_string(&message, "description")?.unwrap_or_default();
        if let Some(tp) = singular_message(&message, "third_party")? {
            metadata.third_party = Some(ThirdParty {
                version: singular_string(tp, "version")?.unwrap_or_default(),
            });
        }

        Ok(metadata)
    }

    pub fn project(&self) -> &str {
        &self.project
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn third_party(&self) -> Option<&ThirdParty> {
        self.third_party.as_ref()
    }

    pub fn version(&self) -> &str {
        self.third_party
            .as_ref()
            .map(|tp| tp.version.as_str())
            .unwrap_or_default()
    }

    /// Name of the project including the version if any, else the description.
    pub fn versioned_name(&self) -> String {
        if self.name.is_empty() {
            return self.description.clone();
        }
        let version = self.version();
        if version.is_empty() {
            return self.name.clone();
        }
        if version.starts_with(['v', 'V']) {
            format!("{}_{}", self.name, version)
        } else {
            format!("{}_v_{}", self.name, version)
        }
    }
}

impl fmt::Display for ProjectMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "project {:?}: ", self.project)?;
        let versioned = self.versioned_name();
        if versioned.is_empty() {
            f.write_str("(unnamed)")
        } else {
            write!(f, "{versioned:?}")
        }
    }
}

fn singular<'a>(message: &'a Message, name: &str) -> Result<Option<&'a Field>, ParseError> {
    let mut fields = message.get_all(name);
    let first = fields.next();
    if let Some(repeated) = fields.next() {
        return Err(ParseError::new(
            repeated.line,
            repeated.column,
            format!("non-repeated field {name:?} is repeated"),
        ));
    }
    Ok(first)
}

fn singular_string(message: &Message, name: &str) -> Result<Option<String>, ParseError> {
    match singular(message, name)? {
        None => Ok(None),
        Some(Field {
            value: Value::Str(s),
            ..
        }) => Ok(Some(s.clone())),
        Some(field) => Err(ParseError::new(
            field.line,
            field.column,
            format!("invalid value for string field {name:?}: {}", field.value.kind()),
        )),
    }
}

fn singular_message<'a>(message: &'a Message, name: &str) -> Result<Option<&'a Message>, ParseError> {
    match singular(message, name)? {
        None => Ok(None),
        Some(Field {
            value: Value::Message(m),
            ..
        }) => Ok(Some(m)),
        Some(field) => Err(ParseError::new(
            field.line,
            field.column,
            format!("invalid value for message field {name:?}: {}", field.value.kind()),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn with(name: &str, description: &str, version: Option<&str>) -> ProjectMetadata {
        ProjectMetadata::new("external/p", name, description, version)
    }

    #[test]
    fn versioned_name_rules() {
        assert_eq!(with("foo", "", Some("1.2")).versioned_name(), "foo_v_1.2");
        assert_eq!(with("foo", "", Some("v1.2")).versioned_name(), "foo_v1.2");
        assert_eq!(with("foo", "", Some("V3")).versioned_name(), "foo_V3");
        assert_eq!(with("foo", "", Some("")).versioned_name(), "foo");
        assert_eq!(with("foo", "d", None).versioned_name(), "foo");
        assert_eq!(with("", "d", Some("1.2")).versioned_name(), "d");
        assert_eq!(with("", "", None).versioned_name(), "");
    }

    #[test]
    fn parse_keeps_known_fields_and_drops_unknown() {
        let body = br#"
name: "lib1"
description: "first library"
identifier { type: "Git" value: "https://example.com/lib1" }
third_party {
  homepage: "https://example.com"
  version: "v2"
  security { tag: "NVD-CPE2.3:cpe:/a:example:lib1:2" }
}
"#;
        let metadata = ProjectMetadata::parse("p1", body).unwrap();
        assert_eq!(metadata.project(), "p1");
        assert_eq!(metadata.name(), "lib1");
        assert_eq!(metadata.description(), "first library");
        assert_eq!(metadata.version(), "v2");
        assert_eq!(metadata.versioned_name(), "lib1_v2");
        assert_eq!(metadata.to_string(), "project \"p1\": \"lib1_v2\"");
    }

    #[test]
    fn empty_body_is_an_empty_record() {
        let metadata = ProjectMetadata::parse("p1", b"").unwrap();
        assert_eq!(metadata.versioned_name(), "");
        assert!(metadata.third_party().is_none());
        assert_eq!(metadata.to_string(), "project \"p1\": (unnamed)");
    }

    #[test]
    fn schema_violations_are_errors() {
        let err = ProjectMetadata::parse("p", b"name: \"a\"\nname: \"b\"").unwrap_err();
        assert_eq!(err.line, 2);
        assert!(err.message.contains("non-repeated field \"name\""));

        let err = ProjectMetadata::parse("p", b"name: 42").unwrap_err();
        assert!(err.message.contains("invalid value for string field \"name\""));

        let err = ProjectMetadata::parse("p", b"third_party: \"x\"").unwrap_err();
        assert!(err.message.contains("message field \"third_party\""));

        let err =
            ProjectMetadata::parse("p", b"third_party { version: \"1\" version: \"2\" }").unwrap_err();
        assert!(err.message.contains("\"version\""));
    }
}
