//! The host-side contract a script's main function implements.

use sable_core::{DataType, TypeHash};

/// A named, typed value: an entry-point parameter or a member.
#[derive(Debug, Clone, PartialEq)]
pub struct InterfaceValue {
    pub name: String,
    pub ty: DataType,
}

/// The signature the top-level statements of a script must satisfy.
///
/// Parameters become the leading locals of the main function. Members are
/// read-only values the host exposes on the script instance; only the main
/// function sees them.
///
/// ```
/// use sable_compiler::ScriptInterface;
/// use sable_core::DataType;
///
/// let interface = ScriptInterface::new("ScoreScript", DataType::DOUBLE)
///     .param("score", DataType::DOUBLE)
///     .member("weight", DataType::DOUBLE);
/// assert_eq!(interface.method, "execute");
/// assert!(interface.find_member("weight").is_some());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptInterface {
    /// Name of the implemented interface.
    pub name: String,
    /// Name of the entry-point method.
    pub method: String,
    pub params: Vec<InterfaceValue>,
    pub return_type: DataType,
    pub members: Vec<InterfaceValue>,
    /// Whether the last parameter collects trailing arguments.
    pub variadic: bool,
}

impl ScriptInterface {
    pub fn new(name: impl Into<String>, return_type: DataType) -> Self {
        Self {
            name: name.into(),
            method: "execute".to_string(),
            params: Vec::new(),
            return_type,
            members: Vec::new(),
            variadic: false,
        }
    }

    /// The common case: no parameters, a `def` result.
    pub fn generic() -> Self {
        Self::new("Script", DataType::DEF)
    }

    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = method.into();
        self
    }

    pub fn param(mut self, name: impl Into<String>, ty: DataType) -> Self {
        self.params.push(InterfaceValue {
            name: name.into(),
            ty,
        });
        self
    }

    pub fn member(mut self, name: impl Into<String>, ty: DataType) -> Self {
        self.members.push(InterfaceValue {
            name: name.into(),
            ty,
        });
        self
    }

    pub fn variadic(mut self) -> Self {
        self.variadic = true;
        self
    }

    pub fn hash(&self) -> TypeHash {
        TypeHash::from_name(&self.name)
    }

    pub fn find_member(&self, name: &str) -> Option<&InterfaceValue> {
        self.members.iter().find(|m| m.name == name)
    }

    /// Field hash the runtime binds a member to.
    pub fn member_hash(&self, name: &str) -> TypeHash {
        TypeHash::from_field(self.hash(), name)
    }
}

impl Default for ScriptInterface {
    fn default() -> Self {
        Self::generic()
    }
}
