// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Version tolerance policy.
//!
//! A small flag set chosen once per deserialization session. Each flag
//! permits one category of drift between the shape a type had when the data
//! was written and the shape it has now:
//!
//! | Flag | Permits |
//! |------|---------|
//! | `ALLOW_MODULE_ID_CHANGE` | a different module build (content id) |
//! | `ALLOW_MODULE_VERSION_CHANGE` | a different module version |
//! | `ALLOW_INHERITANCE_CHAIN_CHANGE` | a different base type |
//! | `ALLOW_FIELD_ADDITION` | fields present now but absent in the data |
//! | `ALLOW_FIELD_REMOVAL` | fields present in the data but gone now |
//!
//! A field whose declared type changed is never tolerated.
//!
//! ```
//! use vtbin::VersionTolerance;
//!
//! let policy = VersionTolerance::ALLOW_MODULE_ID_CHANGE | VersionTolerance::ALLOW_FIELD_REMOVAL;
//! assert!(policy.contains(VersionTolerance::ALLOW_FIELD_REMOVAL));
//! assert!(!policy.contains(VersionTolerance::ALLOW_FIELD_ADDITION));
//! assert_eq!(policy.to_string(), "ALLOW_MODULE_ID_CHANGE|ALLOW_FIELD_REMOVAL");
//! ```

use std::fmt;
use std::ops::{BitOr, BitOrAssign};
use std::str::FromStr;

/// Bit-flag set of permitted structural drift.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "String", into = "String"))]
#[repr(transparent)]
pub struct VersionTolerance(u8);

impl VersionTolerance {
    /// Strict: the stored and current shapes must come from the same build.
    pub const EXACT: Self = Self(0);

    pub const ALLOW_MODULE_ID_CHANGE: Self = Self(0x01);

    pub const ALLOW_MODULE_VERSION_CHANGE: Self = Self(0x02);

    pub const ALLOW_INHERITANCE_CHAIN_CHANGE: Self = Self(0x04);

    pub const ALLOW_FIELD_ADDITION: Self = Self(0x08);

    pub const ALLOW_FIELD_REMOVAL: Self = Self(0x10);

    const NAMED: [(Self, &'static str); 5] = [
        (Self::ALLOW_MODULE_ID_CHANGE, "ALLOW_MODULE_ID_CHANGE"),
        (Self::ALLOW_MODULE_VERSION_CHANGE, "ALLOW_MODULE_VERSION_CHANGE"),
        (Self::ALLOW_INHERITANCE_CHAIN_CHANGE, "ALLOW_INHERITANCE_CHAIN_CHANGE"),
        (Self::ALLOW_FIELD_ADDITION, "ALLOW_FIELD_ADDITION"),
        (Self::ALLOW_FIELD_REMOVAL, "ALLOW_FIELD_REMOVAL"),
    ];

    /// No drift permitted.
    pub const fn empty() -> Self {
        Self::EXACT
    }

    /// Every flag set.
    pub const fn all() -> Self {
        Self(0x1F)
    }

    /// Raw bits.
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Build from raw bits, rejecting unknown flags.
    pub const fn from_bits(bits: u8) -> Option<Self> {
        if bits & !Self::all().0 == 0 {
            Some(Self(bits))
        } else {
            None
        }
    }

    /// Check if every bit of `flag` is set.
    pub const fn contains(self, flag: Self) -> bool {
        (self.0 & flag.0) == flag.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn insert(&mut self, flag: Self) {
        self.0 |= flag.0;
    }

    pub fn remove(&mut self, flag: Self) {
        self.0 &= !flag.0;
    }

    /// Flags in `self` but not in `other`.
    pub const fn difference(self, other: Self) -> Self {
        Self(self.0 & !other.0)
    }
}

impl BitOr for VersionTolerance {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for VersionTolerance {
    fn bitor_assign(&mut self, rhs: Self) {
        self.insert(rhs);
    }
}

impl fmt::Display for VersionTolerance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("EXACT");
        }
        let mut first = true;
        for (flag, name) in Self::NAMED {
            if self.contains(flag) {
                if !first {
                    f.write_str("|")?;
                }
                f.write_str(name)?;
                first = false;
            }
        }
        Ok(())
    }
}

/// Error returned when a policy string names an unknown flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseToleranceError(String);

impl fmt::Display for ParseToleranceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown version tolerance flag '{}'", self.0)
    }
}

impl std::error::Error for ParseToleranceError {}

impl FromStr for VersionTolerance {
    type Err = ParseToleranceError;

    /// Parse a `|`-separated flag list. `EXACT` and the empty string mean no
    /// flags; names are case-insensitive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut policy = Self::EXACT;
        for part in s.split('|').map(str::trim).filter(|p| !p.is_empty()) {
            if part.eq_ignore_ascii_case("EXACT") {
                continue;
            }
            let flag = Self::NAMED
                .iter()
                .find(|(_, name)| name.eq_ignore_ascii_case(part))
                .map(|(flag, _)| *flag)
                .ok_or_else(|| ParseToleranceError(part.to_string()))?;
            policy |= flag;
        }
        Ok(policy)
    }
}

impl TryFrom<String> for VersionTolerance {
    type Error = ParseToleranceError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<VersionTolerance> for String {
    fn from(value: VersionTolerance) -> Self {
        value.to_string()
    }
}
