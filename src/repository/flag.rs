use std::fmt::Write as _;
use std::{borrow::Cow, fmt::Display, str::FromStr};

use enumflags2::{BitFlags, bitflags};
use log::trace;
use thiserror::Error;

#[bitflags]
#[repr(u8)]
#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq)]
// todo: support keywords https://datatracker.ietf.org/doc/html/rfc3501#section-2.3.2
// DO NOT REORDER! The bitflags representation is stored in archive databases.
pub enum Flag {
    Draft,
    Flagged,
    Answered,
    Seen,
    Deleted,
    Recent,
}

impl Flag {
    pub fn into_bitflags(flags: &[Cow<'_, str>]) -> BitFlags<Self, u8> {
        flags
            .iter()
            .filter_map(|flag| Flag::from_str(flag).ok())
            .collect()
    }

    pub fn format(flags: BitFlags<Self>) -> Option<String> {
        flags
            .iter()
            .map(|flag| flag.to_string())
            .reduce(|mut acc, flag| {
                write!(acc, " {flag}").expect("writing flag to formatting buffer should succeed");
                acc
            })
    }
}

impl Display for Flag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Flag::Seen => write!(f, r"\Seen"),
            Flag::Answered => write!(f, r"\Answered"),
            Flag::Flagged => write!(f, r"\Flagged"),
            Flag::Deleted => write!(f, r"\Deleted"),
            Flag::Draft => write!(f, r"\Draft"),
            Flag::Recent => write!(f, r"\Recent"),
        }
    }
}

#[derive(Error, Debug)]
#[error("unknown flag {flag}")]
pub struct UnknownFlagError {
    flag: String,
}

impl FromStr for Flag {
    type Err = UnknownFlagError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            r"\Seen" => Ok(Flag::Seen),
            r"\Answered" => Ok(Flag::Answered),
            r"\Flagged" => Ok(Flag::Flagged),
            r"\Deleted" => Ok(Flag::Deleted),
            r"\Draft" => Ok(Flag::Draft),
            r"\Recent" => {
                trace!(r"\Recent flag handled by server. skipping...");
                Err(Self::Err {
                    flag: value.to_string(),
                })
            }
            _ => {
                trace!("Encountered unhandled Flag {value}");
                Err(Self::Err {
                    flag: value.to_string(),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use assertables::*;
    use rstest::*;

    use super::*;

    #[rstest]
    #[case(r"\Seen", Flag::Seen)]
    #[case(r"\Answered", Flag::Answered)]
    #[case(r"\Flagged", Flag::Flagged)]
    #[case(r"\Deleted", Flag::Deleted)]
    #[case(r"\Draft", Flag::Draft)]
    fn test_flag_parse_and_display_roundtrip(#[case] name: &str, #[case] flag: Flag) {
        assert_eq!(flag, assert_ok!(Flag::from_str(name)));
        assert_eq!(name, flag.to_string());
    }

    #[rstest]
    fn test_recent_is_not_parsed_from_server_responses() {
        assert_err!(Flag::from_str(r"\Recent"));
    }

    #[rstest]
    fn test_into_bitflags_drops_recent_and_unknown_flags() {
        let flags = vec![
            Cow::Borrowed(r"\Seen"),
            Cow::Borrowed(r"\Recent"),
            Cow::Borrowed(r"\X-Custom"),
            Cow::Borrowed(r"\Flagged"),
        ];
        assert_eq!(Flag::Seen | Flag::Flagged, Flag::into_bitflags(&flags));
    }

    #[rstest]
    fn test_format_joins_flags_with_spaces() {
        let formatted = assert_some!(Flag::format(Flag::Draft | Flag::Seen));
        assert_eq!(r"\Draft \Seen", formatted);
        assert_none!(Flag::format(BitFlags::empty()));
    }
}
