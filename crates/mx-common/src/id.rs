//! Image and object identity types.
//!
//! `Per_Image` rows are keyed by image number; `Per_Object` rows by the
//! (image number, object number) pair. Both numbers are 1-based.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Most objects a single image set may report. Larger `Count` values are
/// treated as corrupt input rather than allocated.
pub const MAX_OBJECT_COUNT: usize = 1 << 24;

/// Image number wrapper with display formatting.
///
/// The image number of an image set is its index plus the run's
/// image-set start number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageNumber(pub u64);

impl ImageNumber {
    /// Largest image number an `INTEGER` key column can hold.
    pub const MAX: u64 = i64::MAX as u64;

    /// Image number for the image set at `index` in a run starting at `start`.
    pub fn from_index(start: u64, index: usize) -> Result<Self> {
        u64::try_from(index)
            .ok()
            .and_then(|offset| start.checked_add(offset))
            .filter(|n| *n <= Self::MAX)
            .map(ImageNumber)
            .ok_or(Error::ImageNumberOverflow { start, index })
    }

    /// Key cell value. Numbers from [`from_index`](Self::from_index) always
    /// fit; anything larger saturates.
    pub fn as_key(self) -> i64 {
        i64::try_from(self.0).unwrap_or(i64::MAX)
    }
}

impl fmt::Display for ImageNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for ImageNumber {
    fn from(n: u64) -> Self {
        ImageNumber(n)
    }
}

/// Object number within one image set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectNumber(pub u64);

impl ObjectNumber {
    /// Object number for the zero-based object slot `slot`.
    pub fn from_slot(slot: usize) -> Self {
        ObjectNumber(slot as u64 + 1)
    }

    /// Key cell value. Slots are bounded by [`MAX_OBJECT_COUNT`].
    pub fn as_key(self) -> i64 {
        i64::try_from(self.0).unwrap_or(i64::MAX)
    }
}

impl fmt::Display for ObjectNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_number_offsets_by_start() {
        assert_eq!(ImageNumber::from_index(1, 0).unwrap(), ImageNumber(1));
        assert_eq!(ImageNumber::from_index(10, 4).unwrap(), ImageNumber(14));
    }

    #[test]
    fn image_number_past_key_range_is_an_error() {
        let last = ImageNumber::from_index(ImageNumber::MAX - 2, 2).unwrap();
        assert_eq!(last.as_key(), i64::MAX);
        assert!(matches!(
            ImageNumber::from_index(ImageNumber::MAX, 1),
            Err(Error::ImageNumberOverflow { index: 1, .. })
        ));
        assert!(ImageNumber::from_index(u64::MAX, 1).is_err());
    }

    #[test]
    fn object_numbers_are_one_based() {
        assert_eq!(ObjectNumber::from_slot(0), ObjectNumber(1));
        assert_eq!(ObjectNumber::from_slot(2).to_string(), "3");
    }

    #[test]
    fn serializes_transparently() {
        let json = serde_json::to_string(&ImageNumber(7)).unwrap();
        assert_eq!(json, "7");
    }
}
