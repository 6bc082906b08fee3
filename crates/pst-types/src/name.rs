use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::TypeError;

/// Symbol alphabet, indexed by symbol value.
const CHARMAP: &[u8; 32] = b".12345abcdefghijklmnopqrstuvwxyz";

/// Maximum number of symbols in a name.
pub const MAX_NAME_LEN: usize = 13;

/// Number of full 5-bit symbol slots; the 13th slot holds only 4 bits.
const WIDE_SLOTS: usize = 12;

/// A 64-bit base-32 ledger name.
///
/// Account identities and object names share this type. Up to 13 symbols
/// from `.12345abcdefghijklmnopqrstuvwxyz` are packed from the most
/// significant end: the first 12 take 5 bits each and the 13th takes the low
/// 4 bits. The `.` symbol has value zero, so unused trailing slots read as
/// dots. Those implicit trailing dots are padding, not delimiters.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct AccountName(u64);

impl AccountName {
    /// The zero name (empty text form).
    pub const ZERO: Self = Self(0);

    /// Parse a name from its text form.
    ///
    /// Rejects unknown characters, names longer than 13 symbols, a 13th
    /// symbol past `j`, and text that is not normalized (trailing dots).
    pub fn parse(s: &str) -> Result<Self, TypeError> {
        let mut value = 0u64;
        for (pos, ch) in s.chars().enumerate() {
            if pos >= MAX_NAME_LEN {
                return Err(TypeError::NameTooLong {
                    name: s.to_string(),
                    max: MAX_NAME_LEN,
                });
            }
            let symbol = symbol_value(ch).ok_or_else(|| TypeError::InvalidNameCharacter {
                name: s.to_string(),
                character: ch,
            })?;
            if pos < WIDE_SLOTS {
                value |= symbol << slot_shift(pos);
            } else {
                if symbol > 0x0f {
                    return Err(TypeError::InvalidThirteenthSymbol {
                        name: s.to_string(),
                        character: ch,
                    });
                }
                value |= symbol;
            }
        }

        let name = Self(value);
        let normalized = name.to_string();
        if normalized != s {
            return Err(TypeError::NameNotNormalized {
                name: s.to_string(),
                normalized,
            });
        }
        Ok(name)
    }

    /// Create from the raw 64-bit encoding. Every `u64` is a valid name.
    pub const fn from_u64(value: u64) -> Self {
        Self(value)
    }

    /// The raw 64-bit encoding.
    pub const fn as_u64(&self) -> u64 {
        self.0
    }

    /// Returns `true` for the zero name.
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Symbol value at `pos` (0-based, `pos < 13`).
    pub fn symbol_at(&self, pos: usize) -> u8 {
        debug_assert!(pos < MAX_NAME_LEN);
        if pos < WIDE_SLOTS {
            ((self.0 >> slot_shift(pos)) & 0x1f) as u8
        } else {
            (self.0 & 0x0f) as u8
        }
    }

    /// Number of symbols up to and including the last non-dot symbol.
    pub fn length(&self) -> usize {
        (0..MAX_NAME_LEN)
            .rev()
            .find(|&pos| self.symbol_at(pos) != 0)
            .map_or(0, |pos| pos + 1)
    }

    /// Whether a `.` appears before the trailing padding.
    ///
    /// `"bob.alice"` and `".alice"` have a visible delimiter; `"alice"`
    /// does not, even though its unused slots decode as dots.
    pub fn has_visible_delimiter(&self) -> bool {
        self.last_visible_delimiter().is_some()
    }

    /// The segment after the last visible delimiter.
    ///
    /// A name without a visible delimiter is its own suffix.
    pub fn suffix(&self) -> Self {
        let Some(dot) = self.last_visible_delimiter() else {
            return *self;
        };
        let mut value = 0u64;
        for (slot, pos) in (dot + 1..self.length()).enumerate() {
            value |= u64::from(self.symbol_at(pos)) << slot_shift(slot);
        }
        Self(value)
    }

    fn last_visible_delimiter(&self) -> Option<usize> {
        (0..self.length()).rev().find(|&pos| self.symbol_at(pos) == 0)
    }
}

/// Bit offset of wide slot `pos`.
fn slot_shift(pos: usize) -> u32 {
    (64 - 5 * (pos + 1)) as u32
}

fn symbol_value(ch: char) -> Option<u64> {
    match ch {
        '.' => Some(0),
        '1'..='5' => Some(u64::from(ch as u8 - b'1') + 1),
        'a'..='z' => Some(u64::from(ch as u8 - b'a') + 6),
        _ => None,
    }
}

impl fmt::Display for AccountName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut text = [b'.'; MAX_NAME_LEN];
        for (pos, slot) in text.iter_mut().enumerate() {
            *slot = CHARMAP[self.symbol_at(pos) as usize];
        }
        let len = self.length();
        // The alphabet is ASCII, so every prefix is valid UTF-8.
        f.write_str(std::str::from_utf8(&text[..len]).map_err(|_| fmt::Error)?)
    }
}

impl fmt::Debug for AccountName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccountName({self})")
    }
}

impl FromStr for AccountName {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for AccountName {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for AccountName {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Self::parse(&text).map_err(serde::de::Error::custom)
    }
}
