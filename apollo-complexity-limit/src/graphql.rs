//! The GraphQL error reported when a document is rejected.
use serde::Deserialize;
use serde::Serialize;
use serde_json::Map as JsonMap;
use serde_json::Value;

/// The error location
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    /// The line number
    pub line: u32,
    /// The column number
    pub column: u32,
}

/// A [GraphQL error](https://spec.graphql.org/October2021/#sec-Errors)
/// as may be found in the `errors` field of a GraphQL response.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
#[non_exhaustive]
pub struct Error {
    /// The error message.
    pub message: String,

    /// The locations of the error in the GraphQL document of the originating request.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub locations: Vec<Location>,

    /// The optional GraphQL extensions for this error.
    #[serde(skip_serializing_if = "JsonMap::is_empty")]
    pub extensions: JsonMap<String, Value>,
}

impl Error {
    /// Creates an error with the given message and no location or extensions.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Default::default()
        }
    }

    /// Adds a location.
    pub fn with_location(mut self, line: u32, column: u32) -> Self {
        self.locations.push(Location { line, column });
        self
    }

    /// Sets an entry of the `extensions` map.
    pub fn with_extension(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extensions.insert(key.into(), value.into());
        self
    }

    /// Sets the "code" in the extension map. Ignored if the extensions already have this key.
    pub fn with_extension_code(mut self, code: impl Into<String>) -> Self {
        self.extensions
            .entry("code")
            .or_insert_with(|| Value::String(code.into()));
        self
    }

    /// The "code" extension, if set to a string.
    pub fn extension_code(&self) -> Option<&str> {
        self.extensions.get("code").and_then(Value::as_str)
    }
}
