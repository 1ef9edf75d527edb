//! Source positions attached to every node.

use crate::ident::Ident;
use serde::{Deserialize, Serialize};

/// A line/column span within a named source file.
///
/// Lines and columns are 1-based; `first_*` is inclusive and `last_*` is
/// inclusive. Compiler-generated nodes use [`Loc::INVALID`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct Loc {
    /// Interned file name, `None` for synthetic locations.
    pub file: Option<Ident>,
    /// Line of the first character.
    pub first_line: u32,
    /// Column of the first character.
    pub first_column: u32,
    /// Line of the last character.
    pub last_line: u32,
    /// Column of the last character.
    pub last_column: u32,
}

impl Loc {
    /// Location used when no source position is available.
    pub const INVALID: Loc = Loc {
        file: None,
        first_line: 0,
        first_column: 0,
        last_line: 0,
        last_column: 0,
    };

    /// Creates a location covering `first_line:first_column` to
    /// `last_line:last_column` in `file`.
    pub fn new(file: Ident, first_line: u32, first_column: u32, last_line: u32, last_column: u32) -> Self {
        Self {
            file: Some(file),
            first_line,
            first_column,
            last_line,
            last_column,
        }
    }
}

impl Default for Loc {
    fn default() -> Self {
        Self::INVALID
    }
}
