//! Dynamic values exchanged between handlers.

use std::any::{self, Any, TypeId};
use std::fmt;

use crate::errors::HandlerError;

// ============================================================================
// TYPE DESCRIPTORS
// ============================================================================

/// Describes a handler parameter or return type, so handler wiring can be
/// reconciled against the grammar before any tree is analyzed. Two
/// descriptors are assignable exactly when they name the same type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeDesc {
    id: TypeId,
    name: &'static str,
}

impl TypeDesc {
    pub fn of<T: 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: any::type_name::<T>(),
        }
    }

    /// The matched-text type: what named tokens yield by default.
    pub fn text() -> Self {
        Self::of::<String>()
    }

    /// The ordered-sequence type: what constructs without a handler yield.
    pub fn sequence() -> Self {
        Self::of::<Vec<Value>>()
    }

    /// The no-value type; handlers returning it are suppressed.
    pub fn unit() -> Self {
        Self::of::<()>()
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Whether a slot of this type accepts a value described by `other`.
    pub fn accepts(&self, other: &TypeDesc) -> bool {
        self.id == other.id
    }
}

impl fmt::Display for TypeDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

// ============================================================================
// VALUES
// ============================================================================

/// A type-tagged value flowing through semantic analysis. Token handlers
/// produce them from matched text, construct handlers from their children;
/// the default construct value is a sequence (`Vec<Value>`).
pub struct Value {
    desc: TypeDesc,
    boxed: Box<dyn Any>,
}

impl Value {
    pub fn new<T: 'static>(value: T) -> Self {
        Self {
            desc: TypeDesc::of::<T>(),
            boxed: Box::new(value),
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::new(text.into())
    }

    pub fn sequence(items: Vec<Value>) -> Self {
        Self::new(items)
    }

    pub fn desc(&self) -> TypeDesc {
        self.desc
    }

    pub fn is<T: 'static>(&self) -> bool {
        self.boxed.is::<T>()
    }

    /// Moves the value out as `T`.
    pub fn take<T: 'static>(self) -> Result<T, HandlerError> {
        let desc = self.desc;
        match self.boxed.downcast::<T>() {
            Ok(value) => Ok(*value),
            Err(_) => Err(format!("expected {}, found {}", any::type_name::<T>(), desc).into()),
        }
    }

    /// Moves the value out as a sequence, or returns it untouched.
    pub(crate) fn into_sequence(self) -> Result<Vec<Value>, Value> {
        let desc = self.desc;
        match self.boxed.downcast::<Vec<Value>>() {
            Ok(items) => Ok(*items),
            Err(boxed) => Err(Value { desc, boxed }),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Value<{}>", self.desc)
    }
}
