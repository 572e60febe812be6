//! Tool identity and conversation identifier types.

use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

/// Delimiter joining package and export names into a [`ToolKey`].
pub const KEY_DELIMITER: &str = "::";

/// Environment variables forwarded to the remote executor (API keys and similar).
pub type Env = BTreeMap<String, String>;

/// `(package, export)` pair uniquely identifying a loadable remote tool.
///
/// The version is deliberately not part of the identity: the first version loaded
/// for an identity is the one served for the rest of the process.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawToolIdentity")]
pub struct ToolIdentity {
    package_name: String,
    export_name: String,
}

impl ToolIdentity {
    /// Creates an identity after checking that neither part is blank.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidIdentity`] if the package or export name is empty.
    pub fn new(package_name: impl Into<String>, export_name: impl Into<String>) -> Result<Self> {
        let package_name = package_name.into();
        if package_name.trim().is_empty() {
            return Err(Error::InvalidIdentity {
                reason: "package name cannot be empty".into(),
            });
        }

        let export_name = export_name.into();
        if export_name.trim().is_empty() {
            return Err(Error::InvalidIdentity {
                reason: "export name cannot be empty".into(),
            });
        }

        Ok(Self {
            package_name,
            export_name,
        })
    }

    /// Returns the package name (for example `@acme/search`).
    #[must_use]
    pub fn package_name(&self) -> &str {
        &self.package_name
    }

    /// Returns the exported symbol name inside the package.
    #[must_use]
    pub fn export_name(&self) -> &str {
        &self.export_name
    }

    /// Returns the cache key for this identity.
    #[must_use]
    pub fn key(&self) -> ToolKey {
        ToolKey(format!(
            "{}{KEY_DELIMITER}{}",
            self.package_name, self.export_name
        ))
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawToolIdentity {
    package_name: String,
    export_name: String,
}

impl TryFrom<RawToolIdentity> for ToolIdentity {
    type Error = Error;

    fn try_from(raw: RawToolIdentity) -> Result<Self> {
        Self::new(raw.package_name, raw.export_name)
    }
}

impl Display for ToolIdentity {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}{KEY_DELIMITER}{}", self.package_name, self.export_name)
    }
}

/// Flattened `package::export` form of a [`ToolIdentity`].
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub struct ToolKey(String);

impl ToolKey {
    /// Returns the key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Splits the key back into its identity.
    ///
    /// Scoped packages never contain the delimiter, so the last occurrence is the
    /// package/export boundary.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidKey`] if the delimiter is missing or either side is empty.
    pub fn identity(&self) -> Result<ToolIdentity> {
        let (package, export) =
            self.0
                .rsplit_once(KEY_DELIMITER)
                .ok_or_else(|| Error::InvalidKey {
                    key: self.0.clone(),
                })?;
        ToolIdentity::new(package, export).map_err(|_| Error::InvalidKey {
            key: self.0.clone(),
        })
    }
}

impl Display for ToolKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&ToolIdentity> for ToolKey {
    fn from(value: &ToolIdentity) -> Self {
        value.key()
    }
}

impl FromStr for ToolKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::try_from(s.to_owned())
    }
}

impl TryFrom<String> for ToolKey {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        let key = Self(value);
        key.identity()?;
        Ok(key)
    }
}

impl AsRef<str> for ToolKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Opaque identifier scoping active tools and secrets to one conversation.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub struct ConversationId(String);

impl ConversationId {
    /// Wraps a caller-supplied conversation identifier.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConversationId`] if the identifier is blank.
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(Error::InvalidConversationId {
                reason: "conversation id cannot be empty".into(),
            });
        }
        Ok(Self(id))
    }

    /// Generates a random conversation identifier.
    #[must_use]
    pub fn random() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for ConversationId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for ConversationId {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl FromStr for ConversationId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_joins_package_and_export() {
        let identity = ToolIdentity::new("@acme/search", "webSearch").unwrap();
        assert_eq!(identity.key().as_str(), "@acme/search::webSearch");
        assert_eq!(identity.to_string(), identity.key().to_string());
    }

    #[test]
    fn key_parses_back_into_identity() {
        let key: ToolKey = "@acme/search::webSearch".parse().unwrap();
        let identity = key.identity().unwrap();
        assert_eq!(identity.package_name(), "@acme/search");
        assert_eq!(identity.export_name(), "webSearch");
    }

    #[test]
    fn malformed_keys_are_rejected() {
        assert!(matches!(
            "no-delimiter".parse::<ToolKey>(),
            Err(Error::InvalidKey { .. })
        ));
        assert!(matches!(
            "pkg::".parse::<ToolKey>(),
            Err(Error::InvalidKey { .. })
        ));
    }

    #[test]
    fn blank_identity_parts_error() {
        let err = ToolIdentity::new(" ", "webSearch").expect_err("blank package");
        assert!(matches!(err, Error::InvalidIdentity { .. }));

        let err = ToolIdentity::new("@acme/search", "").expect_err("blank export");
        assert!(matches!(err, Error::InvalidIdentity { .. }));
    }

    #[test]
    fn conversation_ids() {
        assert!(ConversationId::new("").is_err());
        let id = ConversationId::new("c1").unwrap();
        assert_eq!(id.as_str(), "c1");
        assert_ne!(ConversationId::random(), ConversationId::random());
    }

    #[test]
    fn identity_serializes_camel_case() {
        let identity = ToolIdentity::new("@acme/search", "webSearch").unwrap();
        let json = serde_json::to_value(&identity).unwrap();
        assert_eq!(json["packageName"], "@acme/search");
        assert_eq!(json["exportName"], "webSearch");
    }

    #[test]
    fn deserialization_validates_like_constructors() {
        let identity: ToolIdentity =
            serde_json::from_str(r#"{"packageName":"@acme/search","exportName":"webSearch"}"#)
                .unwrap();
        assert_eq!(identity.export_name(), "webSearch");
        assert!(
            serde_json::from_str::<ToolIdentity>(r#"{"packageName":" ","exportName":"x"}"#)
                .is_err()
        );

        let id: ConversationId = serde_json::from_str(r#""c1""#).unwrap();
        assert_eq!(serde_json::to_string(&id).unwrap(), r#""c1""#);
        assert!(serde_json::from_str::<ConversationId>(r#""""#).is_err());

        let key: ToolKey = serde_json::from_str(r#""@acme/search::webSearch""#).unwrap();
        assert_eq!(serde_json::to_string(&key).unwrap(), r#""@acme/search::webSearch""#);
        assert!(serde_json::from_str::<ToolKey>(r#""pkg::""#).is_err());
    }
}
