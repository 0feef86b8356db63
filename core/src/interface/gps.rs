use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

const NS_PER_SEC: i64 = 1_000_000_000;

/// GPS time split into whole seconds and a nanosecond remainder in
/// `[0, 1e9)`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LigoTimeGps {
    pub gps_seconds: i32,
    pub gps_nanoseconds: i32,
}

impl LigoTimeGps {
    pub fn new(gps_seconds: i32, gps_nanoseconds: i32) -> Self {
        Self {
            gps_seconds,
            gps_nanoseconds,
        }
    }

    pub fn to_ns(&self) -> i64 {
        self.gps_seconds as i64 * NS_PER_SEC + self.gps_nanoseconds as i64
    }

    /// Splits an integer nanosecond count, rounding the seconds towards
    /// negative infinity. Returns `None` when the seconds overflow `i32`.
    pub fn from_ns(ns: i64) -> Option<Self> {
        let seconds = i32::try_from(ns.div_euclid(NS_PER_SEC)).ok()?;
        let nanoseconds = ns.rem_euclid(NS_PER_SEC) as i32;
        Some(Self::new(seconds, nanoseconds))
    }

    pub fn checked_add_ns(&self, ns: i64) -> Option<Self> {
        Self::from_ns(self.to_ns().checked_add(ns)?)
    }
}

impl fmt::Display for LigoTimeGps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ns = self.to_ns();
        let sign = if ns < 0 { "-" } else { "" };
        let magnitude = ns.unsigned_abs();
        write!(
            f,
            "{}{}.{:09}",
            sign,
            magnitude / NS_PER_SEC as u64,
            magnitude % NS_PER_SEC as u64
        )
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum GpsParseError {
    #[error("no digits in GPS time {0:?}")]
    NoDigits(String),
    #[error("unexpected character {found:?} at offset {offset}")]
    UnexpectedChar { found: char, offset: usize },
    #[error("GPS time {0:?} is out of range")]
    OutOfRange(String),
}

impl FromStr for LigoTimeGps {
    type Err = GpsParseError;

    /// Parses `[+-]digits[.digits]`; fractions beyond nanosecond precision
    /// are rounded half-up on the tenth digit.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let out_of_range = || GpsParseError::OutOfRange(s.to_string());

        let (negative, body) = match s.as_bytes().first() {
            Some(b'-') => (true, &s[1..]),
            Some(b'+') => (false, &s[1..]),
            _ => (false, s),
        };
        let offset = s.len() - body.len();

        let (int_part, frac_part) = match body.find('.') {
            Some(dot) => (&body[..dot], Some(&body[dot + 1..])),
            None => (body, None),
        };
        if int_part.is_empty() && frac_part.map_or(true, str::is_empty) {
            return Err(GpsParseError::NoDigits(s.to_string()));
        }

        let mut seconds: i64 = 0;
        for (i, c) in int_part.char_indices() {
            let digit = c
                .to_digit(10)
                .ok_or(GpsParseError::UnexpectedChar {
                    found: c,
                    offset: offset + i,
                })? as i64;
            seconds = seconds
                .checked_mul(10)
                .and_then(|v| v.checked_add(digit))
                .ok_or_else(out_of_range)?;
        }

        let mut nanoseconds: i64 = 0;
        if let Some(frac) = frac_part {
            let frac_offset = offset + int_part.len() + 1;
            let mut scale = NS_PER_SEC / 10;
            for (i, c) in frac.char_indices() {
                let digit = c.to_digit(10).ok_or(GpsParseError::UnexpectedChar {
                    found: c,
                    offset: frac_offset + i,
                })? as i64;
                if i < 9 {
                    nanoseconds += digit * scale;
                    scale /= 10;
                } else if i == 9 && digit >= 5 {
                    nanoseconds += 1;
                }
            }
        }

        let total = seconds
            .checked_mul(NS_PER_SEC)
            .and_then(|v| v.checked_add(nanoseconds))
            .ok_or_else(out_of_range)?;
        let total = if negative { -total } else { total };
        Self::from_ns(total).ok_or_else(out_of_range)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(s: &str) -> (i32, i32) {
        let gps: LigoTimeGps = s.parse().unwrap();
        (gps.gps_seconds, gps.gps_nanoseconds)
    }

    #[test]
    fn parses_plain_and_fractional_times() {
        assert_eq!(parse("1234.5"), (1234, 500_000_000));
        assert_eq!(parse("712345678"), (712_345_678, 0));
        assert_eq!(parse("00000000712346678"), (712_346_678, 0));
        assert_eq!(parse("722345678."), (722_345_678, 0));
        assert_eq!(parse("752345678.000861"), (752_345_678, 861_000));
        assert_eq!(parse(".5244"), (0, 524_400_000));
        assert_eq!(parse("+2000000000"), (2_000_000_000, 0));
    }

    #[test]
    fn rounds_sub_nanosecond_digits() {
        assert_eq!(parse("772345678.0008635474"), (772_345_678, 863_547));
        assert_eq!(parse("792345678.000865547687287"), (792_345_678, 865_548));
        assert_eq!(parse("702345678.9999999994"), (702_345_678, 999_999_999));
        assert_eq!(parse("722345678.9999999996"), (722_345_679, 0));
    }

    #[test]
    fn normalises_negative_times() {
        assert_eq!(parse("-722345678.5133"), (-722_345_679, 486_700_000));
        assert_eq!(parse("-742345678.000000625"), (-742_345_679, 999_999_375));
        assert_eq!(parse("-.5244"), (-1, 475_600_000));
        assert_eq!(parse("-752345678.9999999996"), (-752_345_679, 0));
    }

    #[test]
    fn rejects_malformed_and_out_of_range_input() {
        assert!(matches!(
            "7323456785".parse::<LigoTimeGps>(),
            Err(GpsParseError::OutOfRange(_))
        ));
        assert!(matches!(
            "-73234567800.5233".parse::<LigoTimeGps>(),
            Err(GpsParseError::OutOfRange(_))
        ));
        assert_eq!(
            "43d".parse::<LigoTimeGps>(),
            Err(GpsParseError::UnexpectedChar {
                found: 'd',
                offset: 2
            })
        );
        assert!(matches!("-".parse::<LigoTimeGps>(), Err(GpsParseError::NoDigits(_))));
        assert!(matches!(".".parse::<LigoTimeGps>(), Err(GpsParseError::NoDigits(_))));
    }

    #[test]
    fn nanosecond_round_trip_and_display() {
        let gps = LigoTimeGps::new(1_000_000_000, 500_000_000);
        assert_eq!(gps.to_ns(), 1_000_000_000_500_000_000);
        assert_eq!(LigoTimeGps::from_ns(gps.to_ns()), Some(gps));
        assert_eq!(gps.to_string(), "1000000000.500000000");
        assert_eq!(LigoTimeGps::new(-1, 500_000_000).to_string(), "-0.500000000");
        assert_eq!(
            gps.checked_add_ns(1_562_500_000),
            Some(LigoTimeGps::new(1_000_000_002, 62_500_000))
        );
        assert_eq!(LigoTimeGps::from_ns(i64::MAX), None);
    }
}
