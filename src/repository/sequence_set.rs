use std::{
    collections::HashSet,
    fmt::{Display, Formatter, Result},
};

use thiserror::Error;

use crate::repository::Uid;

#[derive(Debug, PartialEq)]
struct SequenceRange {
    start: Uid,
    end: Option<Uid>,
}

impl SequenceRange {
    fn single(uid: Uid) -> Self {
        Self {
            start: uid,
            end: None,
        }
    }

    fn range(start: Uid, end: Uid) -> Self {
        debug_assert!(start < end);
        Self {
            start,
            end: Some(end),
        }
    }

    fn end(&self) -> Uid {
        self.end.unwrap_or(self.start)
    }
}

impl Display for SequenceRange {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        if let Some(to) = self.end {
            write!(f, "{}:{}", self.start, to)
        } else {
            write!(f, "{}", self.start)
        }
    }
}

#[derive(Debug, Error, Default)]
#[error("No numbers in sequence set")]
pub struct EmptySetError {}

#[derive(Default, Debug)]
struct SequenceSetBuilder {
    nums: HashSet<Uid>,
}

impl SequenceSetBuilder {
    fn add(&mut self, uid: Uid) {
        self.nums.insert(uid);
    }

    fn build(mut self) -> std::result::Result<SequenceSet, EmptySetError> {
        let mut sorted_nums: Vec<Uid> = self.nums.drain().collect();
        sorted_nums.sort_unstable();
        let mut sorted_nums = sorted_nums.into_iter();

        if let Some(first_num) = sorted_nums.next() {
            let mut ranges = Vec::new();
            let mut current_range = SequenceRange::single(first_num);

            for num in sorted_nums {
                if num == current_range.end() + 1 {
                    current_range.end = Some(num);
                } else {
                    ranges.push(current_range);
                    current_range = SequenceRange::single(num);
                }
            }

            ranges.push(current_range);

            Ok(SequenceSet { ranges })
        } else {
            Err(EmptySetError {})
        }
    }
}

#[derive(Debug, PartialEq)]
pub struct SequenceSet {
    ranges: Vec<SequenceRange>,
}

impl SequenceSet {
    pub fn all() -> Self {
        Self {
            ranges: vec![SequenceRange::range(
                1u32.try_into().expect("1 should be nonzero"),
                Uid::MAX,
            )],
        }
    }
}

impl Display for SequenceSet {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        if let Some(string) =
            self.ranges
                .iter()
                .map(ToString::to_string)
                .reduce(|mut acc, range| {
                    acc.push(',');
                    acc + &range
                })
        {
            write!(f, "{string}")
        } else {
            write!(f, "")
        }
    }
}

impl TryFrom<&[Uid]> for SequenceSet {
    type Error = EmptySetError;

    fn try_from(value: &[Uid]) -> std::result::Result<Self, Self::Error> {
        value
            .iter()
            .fold(SequenceSetBuilder::default(), |mut builder, uid| {
                builder.add(*uid);
                builder
            })
            .build()
    }
}

#[cfg(test)]
mod tests {
    use assertables::*;
    use rstest::*;

    use super::*;

    fn uids(nums: &[u32]) -> Vec<Uid> {
        nums.iter()
            .map(|num| assert_ok!(Uid::try_from(num)))
            .collect()
    }

    #[rstest]
    #[case("4", &[4])]
    #[case("3:5", &[3, 4, 5])]
    #[case("3:5,12,14:15", &[3, 4, 5, 12, 14, 15])]
    #[case("1:4", &[4, 2, 3, 1, 2])]
    fn test_sequence_set_collapses_uids_into_ranges(#[case] expected: &str, #[case] nums: &[u32]) {
        let set = assert_ok!(SequenceSet::try_from(uids(nums).as_slice()));
        assert_eq!(expected, set.to_string());
    }

    #[rstest]
    fn test_sequence_set_errors_on_empty_set() {
        let result = assert_err!(SequenceSet::try_from(Vec::new().as_slice()));
        assert_matches!(result, EmptySetError {});
    }

    #[rstest]
    fn test_sequence_set_all_spans_the_full_uid_range() {
        assert_eq!("1:4294967295", SequenceSet::all().to_string());
    }
}
