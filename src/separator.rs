use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Errors raised when a separator name or role assignment is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SeparatorError {
    /// The name does not belong to the separator palette.
    #[error("Unknown separator: {0}")]
    Unknown(String),

    /// The separator exists but cannot be used in the requested role.
    #[error("Separator {separator} cannot be used as a {role} separator")]
    NotAllowed {
        separator: Separator,
        role: SeparatorRole,
    },
}

/// The two places a separator can be used in a rewritten prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SeparatorRole {
    /// Joins whole tags together.
    Tag,
    /// Replaces spaces inside a single tag.
    Word,
}

impl fmt::Display for SeparatorRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tag => write!(f, "tag"),
            Self::Word => write!(f, "word"),
        }
    }
}

/// A symbol from the fixed separator palette.
///
/// `Unmodified` is a sentinel: it has no literal of its own and resolves to the
/// separator a hand-written prompt already uses (see [`Separator::resolve`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Separator {
    Backslash,
    Comma,
    CommaSpace,
    Dash,
    Equals,
    Plus,
    Slash,
    Space,
    Underscore,
    At,
    Hash,
    Percent,
    Ampersand,
    Asterisk,
    Caret,
    Tilde,
    Empty,
    Break,
    Unmodified,
}

/// One row of the separator palette.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeparatorInfo {
    pub separator: Separator,
    pub name: &'static str,
    pub literal: Option<&'static str>,
    pub allowed_as_tag: bool,
    pub allowed_as_word: bool,
}

const fn row(
    separator: Separator,
    name: &'static str,
    literal: Option<&'static str>,
    allowed_as_tag: bool,
    allowed_as_word: bool,
) -> SeparatorInfo {
    SeparatorInfo {
        separator,
        name,
        literal,
        allowed_as_tag,
        allowed_as_word,
    }
}

/// The palette, in presentation order.
pub const SEPARATORS: &[SeparatorInfo] = &[
    row(Separator::Backslash, "Backslash", Some("\\"), true, true),
    row(Separator::Comma, "Comma", Some(","), true, true),
    row(Separator::CommaSpace, "CommaSpace", Some(", "), true, true),
    row(Separator::Dash, "Dash", Some("-"), true, true),
    row(Separator::Equals, "Equals", Some("="), true, true),
    row(Separator::Plus, "Plus", Some("+"), true, true),
    row(Separator::Slash, "Slash", Some("/"), true, true),
    row(Separator::Space, "Space", Some(" "), true, true),
    row(Separator::Underscore, "Underscore", Some("_"), true, true),
    row(Separator::At, "At", Some("@"), true, true),
    row(Separator::Hash, "Hash", Some("#"), true, true),
    row(Separator::Percent, "Percent", Some("%"), true, true),
    row(Separator::Ampersand, "Ampersand", Some("&"), true, true),
    row(Separator::Asterisk, "Asterisk", Some("*"), true, true),
    row(Separator::Caret, "Caret", Some("^"), true, true),
    row(Separator::Tilde, "Tilde", Some("~"), true, true),
    row(Separator::Empty, "Empty", Some(""), false, true),
    row(Separator::Break, "BREAK", Some(" BREAK "), true, false),
    row(Separator::Unmodified, "Unmodified", None, true, true),
];

/// Literal used to join tags when the tag separator is `Unmodified`.
pub const DEFAULT_TAG_SEPARATOR: &str = ", ";

/// Literal used inside tags when the word separator is `Unmodified`.
pub const DEFAULT_WORD_SEPARATOR: &str = " ";

impl Separator {
    /// Returns the palette row describing this separator.
    pub fn info(self) -> &'static SeparatorInfo {
        // Rows are declared in variant order.
        &SEPARATORS[self as usize]
    }

    /// Iterates over every separator in palette order.
    pub fn all() -> impl Iterator<Item = Separator> {
        SEPARATORS.iter().map(|info| info.separator)
    }

    /// Iterates over the separators usable in `role`.
    pub fn for_role(role: SeparatorRole) -> impl Iterator<Item = Separator> {
        Self::all().filter(move |sep| sep.allows(role))
    }

    /// Returns the palette name, e.g. `"CommaSpace"` or `"BREAK"`.
    pub fn name(self) -> &'static str {
        self.info().name
    }

    /// Returns the literal text, or `None` for the `Unmodified` sentinel.
    pub fn literal(self) -> Option<&'static str> {
        self.info().literal
    }

    /// Returns whether the separator may be used in `role`.
    pub fn allows(self, role: SeparatorRole) -> bool {
        let info = self.info();
        match role {
            SeparatorRole::Tag => info.allowed_as_tag,
            SeparatorRole::Word => info.allowed_as_word,
        }
    }

    /// Returns `self` if it may be used in `role`.
    ///
    /// # Errors
    ///
    /// Returns `SeparatorError::NotAllowed` for `Empty` as a tag separator and
    /// `BREAK` as a word separator.
    pub fn validate_for(self, role: SeparatorRole) -> Result<Self, SeparatorError> {
        if self.allows(role) {
            Ok(self)
        } else {
            Err(SeparatorError::NotAllowed {
                separator: self,
                role,
            })
        }
    }

    /// Resolves the separator to the text actually inserted in `role`.
    ///
    /// # Examples
    ///
    /// ```
    /// use tagsep::{Separator, SeparatorRole};
    ///
    /// assert_eq!(Separator::Dash.resolve(SeparatorRole::Word), "-");
    /// assert_eq!(Separator::Unmodified.resolve(SeparatorRole::Tag), ", ");
    /// assert_eq!(Separator::Unmodified.resolve(SeparatorRole::Word), " ");
    /// ```
    pub fn resolve(self, role: SeparatorRole) -> &'static str {
        match (self.literal(), role) {
            (Some(literal), _) => literal,
            (None, SeparatorRole::Tag) => DEFAULT_TAG_SEPARATOR,
            (None, SeparatorRole::Word) => DEFAULT_WORD_SEPARATOR,
        }
    }
}

impl fmt::Display for Separator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Separator {
    type Err = SeparatorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SEPARATORS
            .iter()
            .find(|info| info.name == s)
            .map(|info| info.separator)
            .ok_or_else(|| SeparatorError::Unknown(s.to_string()))
    }
}

impl Serialize for Separator {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

impl<'de> Deserialize<'de> for Separator {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        name.parse().map_err(serde::de::Error::custom)
    }
}
