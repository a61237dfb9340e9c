//! Error types for tick resolution.

use std::fmt;
use std::sync::Arc;

/// Errors raised while resolving a tick.
///
/// User errors can be propagated out of a deriver body using the `?`
/// operator, which converts any `Into<anyhow::Error>` type into
/// [`DeriveError::User`].
#[derive(Debug, Clone)]
pub enum DeriveError {
    /// A deriver re-entered itself, directly or transitively, before its
    /// first resolution completed.
    ///
    /// This is a configuration error in the derivation set, not a transient
    /// condition. The tick produces no output.
    Cycle {
        /// Debug representation of the deriver whose slot was re-entered.
        name: String,
    },

    /// A deriver requested a sibling by a name absent from the set.
    UnknownDeriver {
        /// Debug representation of the requested name.
        name: String,
    },

    /// Error raised by a deriver body.
    ///
    /// The engine neither catches nor wraps deriver failures beyond carrying
    /// them in this variant; they abort the tick and reach the caller as-is.
    User(Arc<anyhow::Error>),
}

impl fmt::Display for DeriveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeriveError::Cycle { name } => {
                write!(f, "circular dependency in derived values, {name} was blocked")
            }
            DeriveError::UnknownDeriver { name } => {
                write!(f, "no deriver named {name} in the derivation set")
            }
            DeriveError::User(e) => write!(f, "deriver error: {e}"),
        }
    }
}

// DeriveError must not implement std::error::Error: that impl and this
// blanket conversion cannot coexist.
impl<T: Into<anyhow::Error>> From<T> for DeriveError {
    fn from(err: T) -> Self {
        DeriveError::User(Arc::new(err.into()))
    }
}

impl DeriveError {
    /// Returns a reference to the inner error if this is a `User` variant.
    pub fn user_error(&self) -> Option<&Arc<anyhow::Error>> {
        match self {
            DeriveError::User(e) => Some(e),
            _ => None,
        }
    }

    /// Attempts to downcast the user error to a specific type.
    pub fn downcast_ref<E: std::error::Error + Send + Sync + 'static>(&self) -> Option<&E> {
        self.user_error().and_then(|e| e.downcast_ref::<E>())
    }

    /// Returns `true` if this is a `User` variant holding an error of type `E`.
    pub fn is<E: std::error::Error + Send + Sync + 'static>(&self) -> bool {
        self.downcast_ref::<E>().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_display_names_deriver() {
        let err = DeriveError::Cycle {
            name: format!("{:?}", "baz"),
        };
        assert_eq!(
            err.to_string(),
            "circular dependency in derived values, \"baz\" was blocked"
        );
    }

    #[test]
    fn test_user_error_conversion_and_downcast() {
        fn parse(input: &str) -> Result<i32, DeriveError> {
            Ok(input.parse::<i32>()?)
        }

        assert_eq!(parse("42").unwrap(), 42);
        let err = parse("nope").unwrap_err();
        assert!(err.is::<std::num::ParseIntError>());
        assert!(err.downcast_ref::<std::num::ParseIntError>().is_some());
    }

    #[test]
    fn test_unknown_deriver_display() {
        let err = DeriveError::UnknownDeriver {
            name: format!("{:?}", "ghost"),
        };
        assert!(err.to_string().contains("\"ghost\""));
        assert!(err.user_error().is_none());
    }
}
