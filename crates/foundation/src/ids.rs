use serde::{Deserialize, Serialize};

/// Stable identity of one physical vehicle across feed snapshots.
///
/// Identifiers are compared verbatim. Two identifiers that differ only in
/// case or surrounding whitespace are different vehicles.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VehicleId(String);

impl VehicleId {
    pub fn new(id: impl Into<String>) -> Self {
        VehicleId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Display for VehicleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for VehicleId {
    fn from(s: &str) -> Self {
        VehicleId::new(s)
    }
}

impl From<String> for VehicleId {
    fn from(s: String) -> Self {
        VehicleId(s)
    }
}
