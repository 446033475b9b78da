/// The shape of a typed object: its wire class name, the sealed members
/// in declared order, and the two trait flags
///
/// A decoded definition mirrors the wire trait descriptor exactly, so
/// re-encoding a decoded object reproduces the original trait bytes.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ClassDefinition {
    /// The wire class name; empty for anonymous objects
    pub name: String,

    /// The sealed member names, in declaration order
    pub static_properties: Vec<String>,

    /// Instances may carry properties beyond the sealed members
    pub dynamic: bool,

    /// Instances read and write their own body through a registered
    /// external codec
    pub externalizable: bool,
}

impl ClassDefinition {
    /// A sealed trait with the given name and no members
    pub fn sealed(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            static_properties: Vec::new(),
            dynamic: false,
            externalizable: false,
        }
    }

    /// A dynamic trait with the given name and no sealed members
    pub fn dynamic(name: impl Into<String>) -> Self {
        Self {
            dynamic: true,
            ..Self::sealed(name)
        }
    }
}
