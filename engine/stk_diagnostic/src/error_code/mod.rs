//! Error codes for all evaluation diagnostics.
//!
//! Each error code is a unique identifier (e.g., `E2001`) with the first digit
//! indicating the category of problem.

use std::fmt;

/// Error codes for all evaluation diagnostics.
///
/// Format: E#### where first digit indicates category:
/// - E1xxx: Configuration errors
/// - E2xxx: Type conversion errors
/// - E3xxx: Reference cycles
/// - E4xxx: Cancellation
/// - E5xxx: Component provider failures
/// - E9xxx: Internal errors
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub enum ErrorCode {
    // Configuration Errors (E1xxx)
    /// Expression could not be parsed
    E1001,
    /// Malformed reference
    E1002,
    /// Reference to an undeclared symbol
    E1003,
    /// Required input variable has no value
    E1004,
    /// Invalid `for_each` argument
    E1005,
    /// Operator or function applied to unsuitable operands
    E1006,
    /// Attribute or index not available on a value
    E1007,
    /// Call to an unknown function
    E1008,

    // Conversion Errors (E2xxx)
    /// Unsuitable local value
    E2001,
    /// Unsuitable input variable value
    E2002,
    /// Unsuitable output value
    E2003,
    /// Unsuitable component inputs
    E2004,

    // Cycle Errors (E3xxx)
    /// Reference cycle between declarations
    E3001,

    // Cancellation (E4xxx)
    /// Evaluation cancelled before the value was available
    E4001,

    // Provider Errors (E5xxx)
    /// Component provider reported a failure
    E5001,

    // Internal Errors (E9xxx)
    /// A promise was abandoned without a result
    E9001,
    /// Evaluation panicked
    E9002,
}

/// Broad category of an [`ErrorCode`].
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum Category {
    Configuration,
    Conversion,
    Cycle,
    Cancellation,
    Provider,
    Internal,
}

impl ErrorCode {
    /// All error codes.
    pub const ALL: &'static [ErrorCode] = &[
        ErrorCode::E1001,
        ErrorCode::E1002,
        ErrorCode::E1003,
        ErrorCode::E1004,
        ErrorCode::E1005,
        ErrorCode::E1006,
        ErrorCode::E1007,
        ErrorCode::E1008,
        ErrorCode::E2001,
        ErrorCode::E2002,
        ErrorCode::E2003,
        ErrorCode::E2004,
        ErrorCode::E3001,
        ErrorCode::E4001,
        ErrorCode::E5001,
        ErrorCode::E9001,
        ErrorCode::E9002,
    ];

    /// Get the string representation of this error code.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::E1001 => "E1001",
            ErrorCode::E1002 => "E1002",
            ErrorCode::E1003 => "E1003",
            ErrorCode::E1004 => "E1004",
            ErrorCode::E1005 => "E1005",
            ErrorCode::E1006 => "E1006",
            ErrorCode::E1007 => "E1007",
            ErrorCode::E1008 => "E1008",
            ErrorCode::E2001 => "E2001",
            ErrorCode::E2002 => "E2002",
            ErrorCode::E2003 => "E2003",
            ErrorCode::E2004 => "E2004",
            ErrorCode::E3001 => "E3001",
            ErrorCode::E4001 => "E4001",
            ErrorCode::E5001 => "E5001",
            ErrorCode::E9001 => "E9001",
            ErrorCode::E9002 => "E9002",
        }
    }

    pub fn category(&self) -> Category {
        match self {
            ErrorCode::E1001
            | ErrorCode::E1002
            | ErrorCode::E1003
            | ErrorCode::E1004
            | ErrorCode::E1005
            | ErrorCode::E1006
            | ErrorCode::E1007
            | ErrorCode::E1008 => Category::Configuration,
            ErrorCode::E2001 | ErrorCode::E2002 | ErrorCode::E2003 | ErrorCode::E2004 => {
                Category::Conversion
            }
            ErrorCode::E3001 => Category::Cycle,
            ErrorCode::E4001 => Category::Cancellation,
            ErrorCode::E5001 => Category::Provider,
            ErrorCode::E9001 | ErrorCode::E9002 => Category::Internal,
        }
    }

    /// Check if this is a cancellation code (E4xxx range).
    pub fn is_cancellation(&self) -> bool {
        self.category() == Category::Cancellation
    }

    /// Check if this is an internal error (E9xxx range).
    pub fn is_internal_error(&self) -> bool {
        self.category() == Category::Internal
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Parse an error code string like `"E2001"`. Case-insensitive.
impl std::str::FromStr for ErrorCode {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.to_uppercase();
        Self::ALL
            .iter()
            .find(|code| code.as_str() == upper)
            .copied()
            .ok_or(())
    }
}
