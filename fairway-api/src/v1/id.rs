use std::fmt::{self, Display, Formatter};
use std::num::ParseIntError;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The unique identifier of a tournament.
///
/// Uniqueness is a convention of the seed data, it is not enforced anywhere.
#[derive(
    Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[repr(transparent)]
#[serde(transparent)]
pub struct TournamentId(pub u64);

impl Display for TournamentId {
    #[inline]
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl AsRef<u64> for TournamentId {
    #[inline]
    fn as_ref(&self) -> &u64 {
        &self.0
    }
}

impl From<u64> for TournamentId {
    #[inline]
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl PartialEq<u64> for TournamentId {
    #[inline]
    fn eq(&self, other: &u64) -> bool {
        self.0 == *other
    }
}

impl FromStr for TournamentId {
    type Err = ParseIntError;

    #[inline]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}
