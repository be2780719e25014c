// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! ASN.1 primitives related to time types.
//!
//! Only the `Z` suffixed forms without fractional seconds are accepted, which
//! is what RFC 5280 mandates for certificates and what CMS signers emit for
//! `signingTime`.

use {
    bcder::{
        decode::{Constructed, DecodeError, Primitive, Source},
        Tag,
    },
    chrono::{DateTime, NaiveDate, TimeZone, Utc},
    std::str::FromStr,
};

fn digits<T: FromStr>(data: &[u8]) -> Option<T> {
    if data.is_empty() || !data.iter().all(|b| b.is_ascii_digit()) {
        return None;
    }

    T::from_str(std::str::from_utf8(data).ok()?).ok()
}

fn assemble(
    year: i32,
    month: u32,
    day: u32,
    hour: u32,
    minute: u32,
    second: u32,
) -> Option<DateTime<Utc>> {
    let naive = NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(hour, minute, second)?;

    Some(Utc.from_utc_datetime(&naive))
}

/// Parse the content octets of a GeneralizedTime (`YYYYMMDDHHMMSSZ`).
pub fn parse_generalized_time(data: &[u8]) -> Option<DateTime<Utc>> {
    if data.len() != "YYYYMMDDHHMMSSZ".len() || data[14] != b'Z' {
        return None;
    }

    assemble(
        digits(&data[0..4])?,
        digits(&data[4..6])?,
        digits(&data[6..8])?,
        digits(&data[8..10])?,
        digits(&data[10..12])?,
        digits(&data[12..14])?,
    )
}

/// Parse the content octets of a UTCTime (`YYMMDDHHMMSSZ`).
///
/// Two digit years of 50 and above land in the 1900s.
pub fn parse_utc_time(data: &[u8]) -> Option<DateTime<Utc>> {
    if data.len() != "YYMMDDHHMMSSZ".len() || data[12] != b'Z' {
        return None;
    }

    let year: i32 = digits(&data[0..2])?;
    let year = if year >= 50 { year + 1900 } else { year + 2000 };

    assemble(
        year,
        digits(&data[2..4])?,
        digits(&data[4..6])?,
        digits(&data[6..8])?,
        digits(&data[8..10])?,
        digits(&data[10..12])?,
    )
}

/// Decode an X.509 `Time`, which is either a UTCTime or a GeneralizedTime.
pub fn take_time<S: Source>(
    cons: &mut Constructed<S>,
) -> Result<DateTime<Utc>, DecodeError<S::Error>> {
    cons.take_primitive(|tag, prim| match tag {
        Tag::UTC_TIME => utc_time_from_primitive(prim),
        Tag::GENERALIZED_TIME => generalized_time_from_primitive(prim),
        _ => Err(prim.content_err("expected UTCTime or GeneralizedTime")),
    })
}

pub fn generalized_time_from_primitive<S: Source>(
    prim: &mut Primitive<S>,
) -> Result<DateTime<Utc>, DecodeError<S::Error>> {
    let data = prim.take_all()?;

    parse_generalized_time(&data).ok_or_else(|| prim.content_err("invalid GeneralizedTime"))
}

pub fn utc_time_from_primitive<S: Source>(
    prim: &mut Primitive<S>,
) -> Result<DateTime<Utc>, DecodeError<S::Error>> {
    let data = prim.take_all()?;

    parse_utc_time(&data).ok_or_else(|| prim.content_err("invalid UTCTime"))
}

#[cfg(test)]
mod tests {
    use {super::*, bcder::Mode};

    #[test]
    fn generalized_time() {
        assert_eq!(
            parse_generalized_time(b"20491231235959Z"),
            Some(Utc.with_ymd_and_hms(2049, 12, 31, 23, 59, 59).unwrap())
        );
        assert!(parse_generalized_time(b"20491231235959").is_none());
        assert!(parse_generalized_time(b"20491331235959Z").is_none());
        assert!(parse_generalized_time(b"2049123123595+Z").is_none());
        assert!(parse_generalized_time(b"20491231235959.5Z").is_none());
    }

    #[test]
    fn utc_time_century() {
        assert_eq!(
            parse_utc_time(b"500101000000Z"),
            Some(Utc.with_ymd_and_hms(1950, 1, 1, 0, 0, 0).unwrap())
        );
        assert_eq!(
            parse_utc_time(b"491231235959Z"),
            Some(Utc.with_ymd_and_hms(2049, 12, 31, 23, 59, 59).unwrap())
        );
        assert!(parse_utc_time(b"490230000000Z").is_none());
        assert!(parse_utc_time(b"4912312359590").is_none());
    }

    #[test]
    fn time_choice() {
        let time = Mode::Der
            .decode(&b"\x17\x0d060425214036Z"[..], |cons| take_time(cons))
            .unwrap();
        assert_eq!(time, Utc.with_ymd_and_hms(2006, 4, 25, 21, 40, 36).unwrap());

        let time = Mode::Der
            .decode(&b"\x18\x0f20350209214036Z"[..], |cons| take_time(cons))
            .unwrap();
        assert_eq!(time, Utc.with_ymd_and_hms(2035, 2, 9, 21, 40, 36).unwrap());

        assert!(Mode::Der
            .decode(&b"\x17\x0d060425214036X"[..], |cons| take_time(cons))
            .is_err());
        assert!(Mode::Der
            .decode(&b"\x04\x00"[..], |cons| take_time(cons))
            .is_err());
    }
}
