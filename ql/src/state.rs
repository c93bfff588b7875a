use std::fmt::{Display, Formatter};
use std::ops::RangeInclusive;
use std::str::FromStr;

use itertools::{iproduct, Itertools};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use crate::prelude::{Observation, QlError};

/// Discrete state: bucketed horizontal distance, bucketed vertical distance and the exact velocity.
///
/// Textual form (also used as key in the value store file): `<x>_<y>_<velocity>`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StateKey {
    pub x_bucket: i32,
    pub y_bucket: i32,
    pub velocity: i32,
}

impl StateKey {
    pub const fn new(x_bucket: i32, y_bucket: i32, velocity: i32) -> Self {
        Self { x_bucket, y_bucket, velocity }
    }
}

impl Display for StateKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}_{}_{}", self.x_bucket, self.y_bucket, self.velocity)
    }
}

impl FromStr for StateKey {
    type Err = QlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || QlError::InvalidStateKey(s.to_string());
        let (x, y, v) = s.split('_')
            .map(|e| e.parse::<i32>())
            .collect_tuple()
            .ok_or_else(invalid)?;
        Ok(StateKey::new(
            x.map_err(|_| invalid())?,
            y.map_err(|_| invalid())?,
            v.map_err(|_| invalid())?,
        ))
    }
}

impl Serialize for StateKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for StateKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

/// Maps raw observations to a [StateKey].
///
/// Distances are truncated toward zero first, then floored to the enclosing bucket:
/// `bucket(v) = v - v.rem_euclid(width)`. With width 5: `38 -> 35`, `-38 -> -40`, `-40 -> -40`.
/// Distances beyond the `i32` range saturate and end up outside of every [StateSpace].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StateMapper {
    bucket_width: i32,
}

impl StateMapper {
    pub fn new(bucket_width: i32) -> Result<Self, QlError> {
        if bucket_width > 0 {
            Ok(Self { bucket_width })
        } else {
            Err(QlError::InvalidBucketWidth(bucket_width))
        }
    }

    pub fn bucket(&self, value: i32) -> i32 {
        value.saturating_sub(value.rem_euclid(self.bucket_width))
    }

    pub fn map(&self, x_distance: f32, y_distance: f32, velocity: i32) -> StateKey {
        // `as` truncates toward zero (and saturates on overflow)
        StateKey::new(
            self.bucket(x_distance as i32),
            self.bucket(y_distance as i32),
            velocity,
        )
    }

    pub fn map_observation(&self, observation: &Observation) -> StateKey {
        let state = self.map(observation.x_distance, observation.y_distance, observation.velocity);
        log::trace!("{:?} -> state {}", observation, state);
        state
    }
}

/// The discretized world: bucket width plus the value ranges the game is expected to produce.
///
/// This is the single source of truth for both the [StateMapper] and the offline seeding of the value store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StateSpace {
    bucket_width: i32,
    x_range: RangeInclusive<i32>,
    y_range: RangeInclusive<i32>,
    velocity_range: RangeInclusive<i32>,
}

impl Default for StateSpace {
    fn default() -> Self {
        Self {
            bucket_width: 10,
            x_range: -40..=500,
            y_range: -300..=790,
            velocity_range: -10..=8,
        }
    }
}

impl StateSpace {
    pub fn new(
        bucket_width: i32,
        x_range: RangeInclusive<i32>,
        y_range: RangeInclusive<i32>,
        velocity_range: RangeInclusive<i32>,
    ) -> Result<Self, QlError> {
        StateMapper::new(bucket_width)?;
        Ok(Self {
            bucket_width,
            x_range,
            y_range,
            velocity_range,
        })
    }

    /// Default ranges with another bucket width
    pub fn with_bucket_width(bucket_width: i32) -> Result<Self, QlError> {
        let default = Self::default();
        Self::new(bucket_width, default.x_range, default.y_range, default.velocity_range)
    }

    pub fn bucket_width(&self) -> i32 {
        self.bucket_width
    }

    pub fn mapper(&self) -> StateMapper {
        StateMapper { bucket_width: self.bucket_width }
    }

    fn buckets(&self, range: &RangeInclusive<i32>) -> impl Iterator<Item = i32> + Clone {
        let mapper = self.mapper();
        (mapper.bucket(*range.start())..=*range.end()).step_by(self.bucket_width as usize)
    }

    /// All keys of the cross product (x buckets × y buckets × velocities)
    pub fn keys(&self) -> impl Iterator<Item = StateKey> + '_ {
        iproduct!(
            self.buckets(&self.x_range),
            self.buckets(&self.y_range),
            self.velocity_range.clone()
        )
            .map(|(x, y, v)| StateKey::new(x, y, v))
    }

    pub fn len(&self) -> usize {
        self.buckets(&self.x_range).count()
            * self.buckets(&self.y_range).count()
            * self.velocity_range.clone().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, key: &StateKey) -> bool {
        let mapper = self.mapper();
        let within = |range: &RangeInclusive<i32>, bucket: i32| {
            mapper.bucket(bucket) == bucket
                && bucket >= mapper.bucket(*range.start())
                && bucket <= *range.end()
        };
        within(&self.x_range, key.x_bucket)
            && within(&self.y_range, key.y_bucket)
            && self.velocity_range.contains(&key.velocity)
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(5, 0, 0)]
    #[case(5, 4, 0)]
    #[case(5, 5, 5)]
    #[case(5, 38, 35)]
    #[case(5, -1, -5)]
    #[case(5, -5, -5)]
    #[case(5, -38, -40)]
    #[case(5, -40, -40)]
    #[case(10, 487, 480)]
    #[case(10, -29, -30)]
    #[case(10, -300, -300)]
    fn test_bucket(#[case] width: i32, #[case] value: i32, #[case] expected: i32) {
        assert_eq!(StateMapper::new(width).unwrap().bucket(value), expected);
    }

    #[test]
    fn test_map_truncates_before_bucketing() {
        let mapper = StateMapper::new(5).unwrap();
        // -0.9 truncates to 0, not to -1
        assert_eq!(mapper.map(-0.9, 4.99, 3), StateKey::new(0, 0, 3));
        assert_eq!(mapper.map(-38.7, 38.7, -10), StateKey::new(-40, 35, -10));
    }

    #[test]
    fn test_map_is_deterministic() {
        let mapper = StateMapper::new(10).unwrap();
        let observation = Observation::new(123.4, -56.7, -9);
        let first = mapper.map_observation(&observation);
        for _ in 0..10 {
            assert_eq!(mapper.map_observation(&observation), first);
        }
        assert_eq!(first.to_string(), "120_-60_-9");
    }

    #[rstest]
    #[case("500_280_0", StateKey::new(500, 280, 0))]
    #[case("-40_-300_-10", StateKey::new(-40, -300, -10))]
    #[case("0_0_8", StateKey::new(0, 0, 8))]
    fn test_parse_state_key(#[case] text: &str, #[case] expected: StateKey) {
        assert_eq!(text.parse::<StateKey>().unwrap(), expected);
        assert_eq!(expected.to_string(), text);
    }

    #[rstest]
    #[case("")]
    #[case("1_2")]
    #[case("1_2_3_4")]
    #[case("a_2_3")]
    #[case("1__3")]
    fn test_parse_invalid_state_key(#[case] text: &str) {
        assert!(matches!(text.parse::<StateKey>(), Err(QlError::InvalidStateKey(_))));
    }

    #[test]
    fn test_state_space_enumeration() {
        let space = StateSpace::default();
        // 55 x buckets, 110 y buckets, 19 velocities
        assert_eq!(space.len(), 55 * 110 * 19);

        let keys = space.keys().collect::<Vec<_>>();
        assert_eq!(keys.len(), space.len());
        assert_eq!(keys.iter().unique().count(), keys.len());
        assert!(keys.contains(&StateKey::new(500, 280, 0)));
        assert!(keys.contains(&StateKey::new(-40, -300, -10)));
        assert!(keys.contains(&StateKey::new(500, 790, 8)));
        assert!(keys.iter().all(|k| space.contains(k)));

        assert!(!space.contains(&StateKey::new(505, 280, 0)));
        assert!(!space.contains(&StateKey::new(500, 280, 9)));
        assert!(!space.contains(&StateKey::new(510, 280, 0)));
    }

    #[test]
    fn test_state_space_covers_mapper_output() {
        let space = StateSpace::with_bucket_width(5).unwrap();
        let mapper = space.mapper();
        for x in [-38.0, 0.0, 499.0] {
            for y in [-299.5, 12.0, 794.0] {
                assert!(space.contains(&mapper.map(x, y, 0)), "{} {}", x, y);
            }
        }
    }

    #[rstest]
    #[case(0)]
    #[case(-5)]
    fn test_reject_non_positive_bucket_width(#[case] width: i32) {
        assert!(matches!(StateMapper::new(width), Err(QlError::InvalidBucketWidth(w)) if w == width));
        assert!(matches!(StateSpace::with_bucket_width(width), Err(QlError::InvalidBucketWidth(_))));
        assert!(StateSpace::new(width, 0..=10, 0..=10, 0..=0).is_err());
    }

    #[test]
    fn test_map_saturates_far_away_distances() {
        let space = StateSpace::default();
        let mapper = space.mapper();
        let key = mapper.map(-3e9, 3e9, 0);
        assert_eq!(key, StateKey::new(i32::MIN, 2_147_483_640, 0));
        assert!(!space.contains(&key));
        assert_eq!(mapper.bucket(i32::MIN + 1), i32::MIN);
    }
}
