//! Sort direction and its integer codes.

use std::cmp::Ordering;
use std::fmt;

use crate::error::ChainError;

/// Sort direction for the natural-order sorts.
///
/// Integer codes are accepted through [`TryFrom<i64>`]: `4` is ascending and
/// `3` is descending. Any other code is rejected before a single element is
/// looked at.
///
/// # Examples
///
/// ```rust
/// use chainars::Direction;
///
/// assert_eq!(Direction::try_from(4_i64), Ok(Direction::Ascending));
/// assert_eq!(Direction::try_from(3_i64), Ok(Direction::Descending));
/// assert!(Direction::try_from(10_i64).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Direction {
    /// Smallest first.
    #[default]
    Ascending,
    /// Largest first.
    Descending,
}

impl Direction {
    /// Integer code of [`Direction::Ascending`].
    pub const ASCENDING_CODE: i64 = 4;
    /// Integer code of [`Direction::Descending`].
    pub const DESCENDING_CODE: i64 = 3;

    /// Orients an ascending comparison result.
    #[inline]
    pub const fn orient(self, ordering: Ordering) -> Ordering {
        match self {
            Self::Ascending => ordering,
            Self::Descending => ordering.reverse(),
        }
    }
}

impl TryFrom<i64> for Direction {
    type Error = ChainError;

    fn try_from(code: i64) -> Result<Self, Self::Error> {
        match code {
            Self::ASCENDING_CODE => Ok(Self::Ascending),
            Self::DESCENDING_CODE => Ok(Self::Descending),
            other => Err(ChainError::InvalidArgument(format!(
                "Invalid sort direction \"{other}\". Available codes are: [{} (ascending), {} (descending)]",
                Self::ASCENDING_CODE,
                Self::DESCENDING_CODE
            ))),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ascending => formatter.write_str("ascending"),
            Self::Descending => formatter.write_str("descending"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Direction::Ascending, Ordering::Less, Ordering::Less)]
    #[case(Direction::Descending, Ordering::Less, Ordering::Greater)]
    #[case(Direction::Descending, Ordering::Equal, Ordering::Equal)]
    fn test_orient(
        #[case] direction: Direction,
        #[case] ordering: Ordering,
        #[case] expected: Ordering,
    ) {
        assert_eq!(direction.orient(ordering), expected);
    }

    #[rstest]
    fn test_invalid_code_names_the_code() {
        let error = Direction::try_from(10_i64).unwrap_err();
        assert!(matches!(error, ChainError::InvalidArgument(message) if message.contains("\"10\"")));
    }
}
