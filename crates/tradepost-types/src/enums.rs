//! Enumeration types for the Tradepost economy.

use serde::{Deserialize, Serialize};

/// Quality rank attached to an inventory slot.
///
/// Tiers are ordered from worst to best. Two slots only stack when both the
/// item and the tier match, so the tier is part of a slot's identity.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QualityTier {
    /// Ordinal 0.
    Cursed,
    /// Ordinal 1.
    Junk,
    /// Ordinal 2.
    Poor,
    /// Ordinal 3. The natural tier of purchased goods and of money.
    #[default]
    Common,
    /// Ordinal 4.
    Uncommon,
    /// Ordinal 5.
    Rare,
    /// Ordinal 6.
    Epic,
    /// Ordinal 7.
    Legendary,
}

impl QualityTier {
    /// All tiers in ordinal order.
    pub const ALL: [Self; 8] = [
        Self::Cursed,
        Self::Junk,
        Self::Poor,
        Self::Common,
        Self::Uncommon,
        Self::Rare,
        Self::Epic,
        Self::Legendary,
    ];

    /// Highest valid ordinal.
    pub const MAX_ORDINAL: u64 = 7;

    /// Numeric rank used for averaging (`Cursed` = 0 ... `Legendary` = 7).
    pub const fn ordinal(self) -> u64 {
        match self {
            Self::Cursed => 0,
            Self::Junk => 1,
            Self::Poor => 2,
            Self::Common => 3,
            Self::Uncommon => 4,
            Self::Rare => 5,
            Self::Epic => 6,
            Self::Legendary => 7,
        }
    }

    /// Map an ordinal back to its tier, clamping anything above 7 to
    /// [`QualityTier::Legendary`].
    pub const fn from_ordinal(ordinal: u64) -> Self {
        match ordinal {
            0 => Self::Cursed,
            1 => Self::Junk,
            2 => Self::Poor,
            3 => Self::Common,
            4 => Self::Uncommon,
            5 => Self::Rare,
            6 => Self::Epic,
            _ => Self::Legendary,
        }
    }
}

impl core::fmt::Display for QualityTier {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let name = match self {
            Self::Cursed => "cursed",
            Self::Junk => "junk",
            Self::Poor => "poor",
            Self::Common => "common",
            Self::Uncommon => "uncommon",
            Self::Rare => "rare",
            Self::Epic => "epic",
            Self::Legendary => "legendary",
        };
        f.write_str(name)
    }
}
