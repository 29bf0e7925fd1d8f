// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! ASN.1 primitives shared by the other modules.

use {
    bcder::{
        decode::{Constructed, DecodeError, Primitive, Source},
        encode::{PrimitiveContent, Values},
        Captured, Mode, Tag,
    },
    bytes::Bytes,
    chrono::{DateTime, Datelike, NaiveDate, TimeZone, Timelike, Utc},
    std::{
        convert::Infallible,
        fmt::{Debug, Formatter},
        io::Write,
        ops::Deref,
    },
};

/// Parse a run of ASCII digits.
fn parse_digits(data: &[u8]) -> Option<u32> {
    if data.is_empty() || !data.iter().all(u8::is_ascii_digit) {
        return None;
    }

    data.iter()
        .try_fold(0u32, |acc, b| acc.checked_mul(10)?.checked_add((b - b'0') as u32))
}

fn make_datetime(
    year: i32,
    month: u32,
    day: u32,
    hour: u32,
    minute: u32,
    second: u32,
    nanos: u32,
) -> Option<DateTime<Utc>> {
    let naive = NaiveDate::from_ymd_opt(year, month, day)?
        .and_hms_nano_opt(hour, minute, second, nanos)?;

    Some(Utc.from_utc_datetime(&naive))
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Time {
    UtcTime(UtcTime),
    GeneralTime(GeneralizedTime),
}

impl Time {
    pub fn take_from<S: Source>(cons: &mut Constructed<S>) -> Result<Self, DecodeError<S::Error>> {
        cons.take_primitive(|tag, prim| match tag {
            Tag::UTC_TIME => Ok(Self::UtcTime(UtcTime::from_primitive(prim)?)),
            Tag::GENERALIZED_TIME => Ok(Self::GeneralTime(GeneralizedTime::from_primitive(prim)?)),
            _ => Err(prim.content_err("expected UTCTime or GeneralizedTime")),
        })
    }

    pub fn take_opt_from<S: Source>(
        cons: &mut Constructed<S>,
    ) -> Result<Option<Self>, DecodeError<S::Error>> {
        if let Some(utc) =
            cons.take_opt_primitive_if(Tag::UTC_TIME, |prim| UtcTime::from_primitive(prim))?
        {
            Ok(Some(Self::UtcTime(utc)))
        } else {
            Ok(cons
                .take_opt_primitive_if(Tag::GENERALIZED_TIME, |prim| {
                    GeneralizedTime::from_primitive(prim)
                })?
                .map(Self::GeneralTime))
        }
    }

    pub fn encode_ref(&self) -> impl Values + '_ {
        match self {
            Self::UtcTime(utc) => (Some(utc.encode_ref()), None),
            Self::GeneralTime(gt) => (None, Some(gt.encode_ref())),
        }
    }
}

impl AsRef<DateTime<Utc>> for Time {
    fn as_ref(&self) -> &DateTime<Utc> {
        match self {
            Self::UtcTime(dt) => dt.deref(),
            Self::GeneralTime(dt) => dt.deref(),
        }
    }
}

impl From<DateTime<Utc>> for Time {
    /// Years 1950 through 2049 are expressed as UTCTime, everything else as GeneralizedTime.
    fn from(t: DateTime<Utc>) -> Self {
        if (1950..2050).contains(&t.year()) {
            Self::UtcTime(UtcTime::from(t))
        } else {
            Self::GeneralTime(GeneralizedTime::from(t))
        }
    }
}

/// A `GeneralizedTime`.
///
/// Fractional seconds are accepted on decode, as time-stamp authorities
/// commonly emit them in `genTime`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct GeneralizedTime(DateTime<Utc>);

impl Deref for GeneralizedTime {
    type Target = DateTime<Utc>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<DateTime<Utc>> for GeneralizedTime {
    fn from(t: DateTime<Utc>) -> Self {
        Self(t)
    }
}

impl GeneralizedTime {
    pub fn take_from<S: Source>(cons: &mut Constructed<S>) -> Result<Self, DecodeError<S::Error>> {
        cons.take_primitive_if(Tag::GENERALIZED_TIME, |prim| Self::from_primitive(prim))
    }

    pub fn from_primitive<S: Source>(
        prim: &mut Primitive<S>,
    ) -> Result<Self, DecodeError<S::Error>> {
        let data = prim.take_all()?;

        Self::parse(&data)
            .map(Self)
            .ok_or_else(|| prim.content_err("invalid GeneralizedTime"))
    }

    /// Parse `YYYYMMDDHHMMSS[.f+]Z`.
    fn parse(data: &[u8]) -> Option<DateTime<Utc>> {
        if data.len() < "YYYYMMDDHHMMSSZ".len() || data.last() != Some(&b'Z') {
            return None;
        }

        let nanos = match &data[14..data.len() - 1] {
            [] => 0,
            [b'.', fraction @ ..] if !fraction.is_empty() && fraction.len() <= 9 => {
                parse_digits(fraction)? * 10u32.pow(9 - fraction.len() as u32)
            }
            _ => return None,
        };

        make_datetime(
            parse_digits(&data[0..4])? as i32,
            parse_digits(&data[4..6])?,
            parse_digits(&data[6..8])?,
            parse_digits(&data[8..10])?,
            parse_digits(&data[10..12])?,
            parse_digits(&data[12..14])?,
            nanos,
        )
    }
}

impl ToString for GeneralizedTime {
    fn to_string(&self) -> String {
        let mut s = format!(
            "{:04}{:02}{:02}{:02}{:02}{:02}",
            self.0.year(),
            self.0.month(),
            self.0.day(),
            self.0.hour(),
            self.0.minute(),
            self.0.second()
        );

        // DER forbids trailing zeros in the fraction.
        let nanos = self.0.nanosecond() % 1_000_000_000;
        if nanos != 0 {
            let fraction = format!("{:09}", nanos);
            s.push('.');
            s.push_str(fraction.trim_end_matches('0'));
        }

        s.push('Z');
        s
    }
}

impl PrimitiveContent for GeneralizedTime {
    const TAG: Tag = Tag::GENERALIZED_TIME;

    fn encoded_len(&self, _: Mode) -> usize {
        self.to_string().len()
    }

    fn write_encoded<W: Write>(&self, _: Mode, target: &mut W) -> Result<(), std::io::Error> {
        target.write_all(self.to_string().as_bytes())
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct UtcTime(DateTime<Utc>);

impl UtcTime {
    /// Obtain a new instance with now as the time.
    pub fn now() -> Self {
        Self(Utc::now())
    }

    pub fn take_from<S: Source>(cons: &mut Constructed<S>) -> Result<Self, DecodeError<S::Error>> {
        cons.take_primitive_if(Tag::UTC_TIME, |prim| Self::from_primitive(prim))
    }

    pub fn from_primitive<S: Source>(
        prim: &mut Primitive<S>,
    ) -> Result<Self, DecodeError<S::Error>> {
        let data = prim.take_all()?;

        Self::parse(&data)
            .map(Self)
            .ok_or_else(|| prim.content_err("invalid UTCTime"))
    }

    fn parse(data: &[u8]) -> Option<DateTime<Utc>> {
        if data.len() != "YYMMDDHHMMSSZ".len() || data[12] != b'Z' {
            return None;
        }

        let year = parse_digits(&data[0..2])? as i32;
        let year = if year >= 50 { year + 1900 } else { year + 2000 };

        make_datetime(
            year,
            parse_digits(&data[2..4])?,
            parse_digits(&data[4..6])?,
            parse_digits(&data[6..8])?,
            parse_digits(&data[8..10])?,
            parse_digits(&data[10..12])?,
            0,
        )
    }
}

impl From<DateTime<Utc>> for UtcTime {
    fn from(t: DateTime<Utc>) -> Self {
        Self(t)
    }
}

impl ToString for UtcTime {
    fn to_string(&self) -> String {
        format!(
            "{:02}{:02}{:02}{:02}{:02}{:02}Z",
            self.0.year() % 100,
            self.0.month(),
            self.0.day(),
            self.0.hour(),
            self.0.minute(),
            self.0.second()
        )
    }
}

impl Deref for UtcTime {
    type Target = DateTime<Utc>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl PrimitiveContent for UtcTime {
    const TAG: Tag = Tag::UTC_TIME;

    fn encoded_len(&self, _: Mode) -> usize {
        self.to_string().len()
    }

    fn write_encoded<W: Write>(&self, _: Mode, target: &mut W) -> Result<(), std::io::Error> {
        target.write_all(self.to_string().as_bytes())
    }
}

/// A `UTF8String` value.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Utf8Value(String);

impl Utf8Value {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn take_from<S: Source>(cons: &mut Constructed<S>) -> Result<Self, DecodeError<S::Error>> {
        cons.take_primitive_if(Tag::UTF8_STRING, |prim| Self::from_primitive(prim))
    }

    pub fn from_primitive<S: Source>(
        prim: &mut Primitive<S>,
    ) -> Result<Self, DecodeError<S::Error>> {
        let data = prim.take_all()?;

        String::from_utf8(data.to_vec())
            .map(Self)
            .map_err(|_| prim.content_err("invalid UTF8String"))
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl Deref for Utf8Value {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl PrimitiveContent for Utf8Value {
    const TAG: Tag = Tag::UTF8_STRING;

    fn encoded_len(&self, _: Mode) -> usize {
        self.0.len()
    }

    fn write_encoded<W: Write>(&self, _: Mode, target: &mut W) -> Result<(), std::io::Error> {
        target.write_all(self.0.as_bytes())
    }
}

/// A single ASN.1 value retained as its exact encoding.
///
/// Certificates, CRLs, names and attribute values travel through the CAdES
/// machinery as these so that re-serialization never perturbs bytes that
/// digests or signatures were computed over.
#[derive(Clone, Eq, Hash, PartialEq)]
pub struct RawValue(Bytes);

impl RawValue {
    /// Construct an instance from the encoding of exactly one value.
    pub fn from_der(data: &[u8]) -> Result<Self, DecodeError<Infallible>> {
        Constructed::decode(data, Mode::Der, |cons| {
            let captured = cons.capture_one()?;

            if captured.as_slice().len() == data.len() {
                Ok(Self::from_captured(&captured))
            } else {
                Err(cons.content_err("trailing data after value"))
            }
        })
    }

    /// Construct an instance by DER encoding `values`.
    pub fn from_values<V: Values>(values: V) -> Self {
        Self::from_captured(&Captured::from_values(Mode::Der, values))
    }

    fn from_captured(captured: &Captured) -> Self {
        Self(Bytes::copy_from_slice(captured.as_slice()))
    }

    pub fn take_from<S: Source>(cons: &mut Constructed<S>) -> Result<Self, DecodeError<S::Error>> {
        Ok(Self::from_captured(&cons.capture_one()?))
    }

    /// Take the next value in `cons`, if there is one.
    pub fn take_opt_from<S: Source>(
        cons: &mut Constructed<S>,
    ) -> Result<Option<Self>, DecodeError<S::Error>> {
        let mut present = false;
        let captured = cons.capture(|cons| {
            present = cons.skip_opt(|_, _, _| Ok(()))?.is_some();
            Ok(())
        })?;

        Ok(if present {
            Some(Self::from_captured(&captured))
        } else {
            None
        })
    }

    /// Take every remaining value in `cons`, one instance per value.
    pub fn take_all_from<S: Source>(
        cons: &mut Constructed<S>,
    ) -> Result<Vec<Self>, DecodeError<S::Error>> {
        let mut values = Vec::new();
        while let Some(value) = Self::take_opt_from(cons)? {
            values.push(value);
        }

        Ok(values)
    }

    pub fn as_slice(&self) -> &[u8] {
        self.0.as_ref()
    }

    pub fn to_bytes(&self) -> Bytes {
        self.0.clone()
    }

    /// The first identifier octet of the value.
    pub fn tag_byte(&self) -> u8 {
        self.0.first().copied().unwrap_or_default()
    }
}

impl AsRef<[u8]> for RawValue {
    fn as_ref(&self) -> &[u8] {
        self.0.as_ref()
    }
}

impl Debug for RawValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_fmt(format_args!("RawValue({})", hex::encode(&self.0)))
    }
}

impl Values for RawValue {
    fn encoded_len(&self, _: Mode) -> usize {
        self.0.len()
    }

    fn write_encoded<W: Write>(&self, _: Mode, target: &mut W) -> Result<(), std::io::Error> {
        target.write_all(&self.0)
    }
}
