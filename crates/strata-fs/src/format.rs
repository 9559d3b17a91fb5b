//! Scalar format descriptors
//!
//! A format string describes one integer on the wire:
//!
//! ```text
//! [<|>][1|2|4|8][i|u]
//! ```
//!
//! `<` is little endian (the default), `>` big endian. The digit is the width
//! in bytes (default 4). `i` is signed (the default), `u` unsigned. Width 1
//! has no byte order, so the endian marker is accepted and ignored.

use std::fmt;

use thiserror::Error;

/// Errors parsing a format string
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    /// The format string was empty
    #[error("invalid empty format")]
    Empty,

    /// A character was left over after the recognised prefix
    #[error("invalid format char '{0}'")]
    InvalidChar(char),
}

/// Byte order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endian {
    /// Least significant byte first
    Little,
    /// Most significant byte first
    Big,
}

impl Endian {
    /// Byte order of the machine we run on
    pub const NATIVE: Endian = if cfg!(target_endian = "little") {
        Endian::Little
    } else {
        Endian::Big
    };
}

/// Signed or unsigned interpretation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signedness {
    /// Two's complement
    Signed,
    /// Raw unsigned
    Unsigned,
}

/// Scalar width
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Width {
    /// 1 byte
    W1,
    /// 2 bytes
    W2,
    /// 4 bytes
    W4,
    /// 8 bytes
    W8,
}

impl Width {
    /// Size in bytes
    pub fn bytes(self) -> usize {
        match self {
            Width::W1 => 1,
            Width::W2 => 2,
            Width::W4 => 4,
            Width::W8 => 8,
        }
    }

    fn from_digit(c: char) -> Option<Width> {
        match c {
            '1' => Some(Width::W1),
            '2' => Some(Width::W2),
            '4' => Some(Width::W4),
            '8' => Some(Width::W8),
            _ => None,
        }
    }
}

/// Parsed format: how to read or write one integer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FormatTag {
    /// Width on the wire
    pub width: Width,
    /// Byte order (always `Little` for width 1)
    pub endian: Endian,
    /// Interpretation on read
    pub signedness: Signedness,
}

impl Default for FormatTag {
    fn default() -> Self {
        FormatTag {
            width: Width::W4,
            endian: Endian::Little,
            signedness: Signedness::Signed,
        }
    }
}

impl FormatTag {
    /// Build a tag, normalising the byte order of single bytes
    pub fn new(width: Width, endian: Endian, signedness: Signedness) -> Self {
        let endian = if width == Width::W1 {
            Endian::Little
        } else {
            endian
        };
        FormatTag {
            width,
            endian,
            signedness,
        }
    }

    /// Parse a format string
    pub fn parse(format: &str) -> Result<Self, FormatError> {
        let mut chars = format.chars().peekable();
        if chars.peek().is_none() {
            return Err(FormatError::Empty);
        }

        let mut endian = Endian::Little;
        match chars.peek() {
            Some('<') => {
                chars.next();
            }
            Some('>') => {
                endian = Endian::Big;
                chars.next();
            }
            _ => {}
        }

        let mut width = Width::W4;
        if let Some(w) = chars.peek().copied().and_then(Width::from_digit) {
            width = w;
            chars.next();
        }

        let mut signedness = Signedness::Signed;
        match chars.peek() {
            Some('i') => {
                chars.next();
            }
            Some('u') => {
                signedness = Signedness::Unsigned;
                chars.next();
            }
            _ => {}
        }

        match chars.next() {
            Some(c) => Err(FormatError::InvalidChar(c)),
            None => Ok(FormatTag::new(width, endian, signedness)),
        }
    }

    /// Size in bytes
    pub fn bytes(&self) -> usize {
        self.width.bytes()
    }

    /// True for signed tags
    pub fn is_signed(&self) -> bool {
        self.signedness == Signedness::Signed
    }
}

impl std::str::FromStr for FormatTag {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FormatTag::parse(s)
    }
}

impl fmt::Display for FormatTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let endian = match self.endian {
            Endian::Little => '<',
            Endian::Big => '>',
        };
        let sign = match self.signedness {
            Signedness::Signed => 'i',
            Signedness::Unsigned => 'u',
        };
        write!(f, "{}{}{}", endian, self.bytes(), sign)
    }
}
