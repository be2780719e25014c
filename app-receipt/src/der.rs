// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Strict DER decoding on top of [bcder].
//!
//! Structures are decoded with bcder in [Mode::Der], which rejects indefinite
//! and non-minimal lengths as well as constructed string encodings. [Reader]
//! walks a [Bytes] buffer one element at a time and remembers where each
//! element sits in the original input, because receipt attributes and
//! signatures must be reported (and tampered with, in tests) by absolute
//! offset. [Reader::decode_next] hands the next element to any bcder
//! decoder.
//!
//! SET OF ordering is not enforced.

use {
    crate::asn1time,
    bcder::{
        decode::{BytesSource, Constructed, Content, DecodeError, Pos, Primitive, Source},
        BitString, Ia5String, Integer, Mode, OctetString, Oid, PrintableString, Tag, Utf8String,
    },
    bytes::Bytes,
    chrono::{DateTime, Utc},
    std::{
        convert::Infallible,
        fmt::{Display, Formatter},
    },
};

/// A DER decoding failure.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MalformedDer {
    /// Offset of the offending element relative to the start of the input.
    pub offset: usize,
    pub reason: String,
}

impl MalformedDer {
    pub fn new(offset: usize, reason: impl Into<String>) -> Self {
        Self {
            offset,
            reason: reason.into(),
        }
    }

    /// Wrap an error bcder raised while decoding the element at `offset`.
    pub(crate) fn from_decode(offset: usize, err: DecodeError<Infallible>) -> Self {
        Self::new(offset, err.to_string())
    }
}

impl Display for MalformedDer {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "malformed DER at offset {}: {}", self.offset, self.reason)
    }
}

impl std::error::Error for MalformedDer {}

pub type DerResult<T> = Result<T, MalformedDer>;

/// Decode exactly one element spanning all of `data`.
///
/// `base` is the offset of `data` within the original input.
pub fn decode_der<F, T>(data: Bytes, base: usize, op: F) -> DerResult<T>
where
    F: FnOnce(&mut Constructed<&mut BytesSource>) -> Result<T, DecodeError<Infallible>>,
{
    let mut reader = Reader::with_offset(data, base);
    let value = reader.decode_next(op)?;
    reader.finish()?;

    Ok(value)
}

/// Decode exactly one element spanning all of `data` from within another
/// bcder decoder, such as the content of an OCTET STRING.
pub fn decode_exact<F, T>(data: Bytes, op: F) -> Result<T, DecodeError<Infallible>>
where
    F: FnOnce(&mut Constructed<&mut BytesSource>) -> Result<T, DecodeError<Infallible>>,
{
    let mut source = BytesSource::new(data);
    let value = Mode::Der.decode(&mut source, op)?;

    if source.is_empty() {
        Ok(value)
    } else {
        Err(DecodeError::content(
            "trailing data after element",
            source.pos(),
        ))
    }
}

/// Decode an OBJECT IDENTIFIER whose subidentifiers are minimally encoded.
///
/// bcder only checks that the last subidentifier is terminated.
pub fn take_oid<S: Source>(cons: &mut Constructed<S>) -> Result<Oid, DecodeError<S::Error>> {
    cons.take_primitive_if(Tag::OID, oid_from_primitive)
}

pub fn oid_from_primitive<S: Source>(
    prim: &mut Primitive<S>,
) -> Result<Oid, DecodeError<S::Error>> {
    let oid = Oid::from_primitive(prim)?;

    let mut at_start = true;
    for octet in oid.0.iter() {
        if at_start && *octet == 0x80 {
            return Err(prim.content_err("non-minimal object identifier"));
        }
        at_start = octet & 0x80 == 0;
    }

    Ok(oid)
}

/// Decode any of the character string types found in names and receipts.
pub fn take_string<S: Source>(cons: &mut Constructed<S>) -> Result<String, DecodeError<S::Error>> {
    cons.take_value(string_from_content)
}

pub fn string_from_content<S: Source>(
    tag: Tag,
    content: &mut Content<S>,
) -> Result<String, DecodeError<S::Error>> {
    match tag {
        Tag::UTF8_STRING => Ok(Utf8String::from_content(content)?.to_string()),
        Tag::IA5_STRING => Ok(Ia5String::from_content(content)?.to_string()),
        Tag::PRINTABLE_STRING => Ok(PrintableString::from_content(content)?.to_string()),
        Tag::VISIBLE_STRING => {
            let data = content.as_primitive()?.take_all()?;

            if data.is_ascii() {
                Ok(data.iter().map(|b| char::from(*b)).collect())
            } else {
                Err(content.content_err("non-ASCII character in VisibleString"))
            }
        }
        // Treated as Latin-1, which is how it is used in practice.
        Tag::TELETEX_STRING => {
            let data = content.as_primitive()?.take_all()?;

            Ok(data.iter().map(|b| char::from(*b)).collect())
        }
        Tag::BMP_STRING => {
            let data = content.as_primitive()?.take_all()?;

            if data.len() % 2 != 0 {
                return Err(content.content_err("odd length BMPString"));
            }

            let units = data
                .chunks_exact(2)
                .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
                .collect::<Vec<_>>();

            String::from_utf16(&units).map_err(|_| content.content_err("invalid BMPString"))
        }
        _ => Err(content.content_err("expected character string")),
    }
}

/// A single element located by a [Reader].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Tlv {
    tag: Tag,
    constructed: bool,
    offset: usize,
    header_len: usize,
    encoded: Bytes,
}

impl Tlv {
    /// Locate exactly one element spanning all of `data`.
    pub fn from_der(data: impl Into<Bytes>) -> DerResult<Self> {
        let mut reader = Reader::new(data);
        let tlv = reader.read_tlv()?;
        reader.finish()?;

        Ok(tlv)
    }

    pub fn tag(&self) -> Tag {
        self.tag
    }

    pub fn is_constructed(&self) -> bool {
        self.constructed
    }

    /// Offset of the identifier octet relative to the start of the input.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Offset of the first content octet relative to the start of the input.
    pub fn value_offset(&self) -> usize {
        self.offset + self.header_len
    }

    /// The complete encoding, identifier and length octets included.
    pub fn encoded(&self) -> &Bytes {
        &self.encoded
    }

    /// The content octets.
    pub fn value(&self) -> Bytes {
        self.encoded.slice(self.header_len..)
    }

    /// Obtain a reader over the content octets.
    pub fn reader(&self) -> Reader {
        Reader::with_offset(self.value(), self.value_offset())
    }

    /// Decode this element with a bcder decoder.
    pub fn decode<F, T>(&self, op: F) -> DerResult<T>
    where
        F: FnOnce(&mut Constructed<&mut BytesSource>) -> Result<T, DecodeError<Infallible>>,
    {
        decode_der(self.encoded.clone(), self.offset, op)
    }
}

/// A cursor over DER encoded elements.
#[derive(Clone, Debug)]
pub struct Reader {
    data: Bytes,
    pos: usize,
    base: usize,
}

impl Reader {
    /// Construct a reader over a complete input buffer.
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self::with_offset(data.into(), 0)
    }

    /// Construct a reader over a buffer that starts `base` octets into the
    /// original input, so errors report absolute offsets.
    pub fn with_offset(data: Bytes, base: usize) -> Self {
        Self { data, pos: 0, base }
    }

    /// Absolute offset of the next element.
    pub fn offset(&self) -> usize {
        self.base + self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.pos >= self.data.len()
    }

    /// Produce an error at the current position.
    pub fn error(&self, reason: impl Into<String>) -> MalformedDer {
        MalformedDer::new(self.offset(), reason)
    }

    /// Fail if any octets remain.
    pub fn finish(self) -> DerResult<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self.error("trailing data after element"))
        }
    }

    fn source(&self) -> BytesSource {
        BytesSource::with_offset(self.data.slice(self.pos..), Pos::from(self.offset()))
    }

    /// Decode the next element with a bcder decoder and step over it.
    ///
    /// `op` must consume exactly one element.
    pub fn decode_next<F, T>(&mut self, op: F) -> DerResult<T>
    where
        F: FnOnce(&mut Constructed<&mut BytesSource>) -> Result<T, DecodeError<Infallible>>,
    {
        let offset = self.offset();
        let mut source = self.source();
        let available = source.len();

        let value = Mode::Der
            .decode(&mut source, op)
            .map_err(|e| MalformedDer::from_decode(offset, e))?;

        self.pos += available - source.len();

        Ok(value)
    }

    /// Look at the tag of the next element without consuming it.
    ///
    /// Returns `None` once the reader is exhausted.
    pub fn peek_tag(&self) -> DerResult<Option<Tag>> {
        if self.is_empty() {
            return Ok(None);
        }

        Tag::take_from(&mut self.source())
            .map(|(tag, _)| Some(tag))
            .map_err(|e| MalformedDer::from_decode(self.offset(), e))
    }

    /// Consume the next element, whatever its tag.
    pub fn read_tlv(&mut self) -> DerResult<Tlv> {
        if self.is_empty() {
            return Err(self.error("unexpected end of data"));
        }

        let start = self.pos;
        let offset = self.offset();

        let (tag, constructed, value) = self.decode_next(|cons| {
            cons.take_value(|tag, content| {
                let constructed = content.is_constructed();
                let value = match content {
                    Content::Primitive(prim) => prim.take_all()?,
                    Content::Constructed(inner) => inner.capture_all()?.into_bytes(),
                };

                Ok((tag, constructed, value))
            })
        })?;

        let encoded = self.data.slice(start..self.pos);

        Ok(Tlv {
            tag,
            constructed,
            offset,
            header_len: encoded.len() - value.len(),
            encoded,
        })
    }

    /// Consume the next element, requiring a specific tag.
    pub fn read_element(&mut self, tag: Tag) -> DerResult<Tlv> {
        match self.peek_tag()? {
            Some(actual) if actual == tag => self.read_tlv(),
            Some(actual) => Err(self.error(format!("expected {}, found {}", tag, actual))),
            None => Err(self.error("unexpected end of data")),
        }
    }

    /// Consume the next element only if it carries `tag`.
    pub fn read_optional(&mut self, tag: Tag) -> DerResult<Option<Tlv>> {
        if self.peek_tag()? == Some(tag) {
            self.read_tlv().map(Some)
        } else {
            Ok(None)
        }
    }

    /// Consume a constructed element and return a reader over its content.
    pub fn read_constructed(&mut self, tag: Tag) -> DerResult<Reader> {
        let tlv = self.read_element(tag)?;

        if tlv.is_constructed() {
            Ok(tlv.reader())
        } else {
            Err(MalformedDer::new(tlv.offset(), "expected constructed encoding"))
        }
    }

    pub fn read_sequence(&mut self) -> DerResult<Reader> {
        self.read_constructed(Tag::SEQUENCE)
    }

    pub fn read_set(&mut self) -> DerResult<Reader> {
        self.read_constructed(Tag::SET)
    }

    pub fn read_boolean(&mut self) -> DerResult<bool> {
        self.decode_next(|cons| cons.take_bool())
    }

    pub fn read_null(&mut self) -> DerResult<()> {
        self.decode_next(|cons| cons.take_null())
    }

    pub fn read_integer(&mut self) -> DerResult<Integer> {
        self.decode_next(|cons| Integer::take_from(cons))
    }

    /// Read an INTEGER that must fit in an `i64`.
    pub fn read_small_integer(&mut self) -> DerResult<i64> {
        self.decode_next(|cons| cons.take_primitive_if(Tag::INTEGER, |prim| prim.to_i64()))
    }

    pub fn read_oid(&mut self) -> DerResult<Oid> {
        self.decode_next(|cons| take_oid(cons))
    }

    pub fn read_octet_string(&mut self) -> DerResult<Bytes> {
        self.decode_next(|cons| OctetString::take_from(cons))
            .map(|s| s.into_bytes())
    }

    pub fn read_bit_string(&mut self) -> DerResult<BitString> {
        self.decode_next(|cons| BitString::take_from(cons))
    }

    pub fn read_utf8_string(&mut self) -> DerResult<String> {
        self.decode_next(|cons| Utf8String::take_from(cons))
            .map(|s| s.to_string())
    }

    pub fn read_ia5_string(&mut self) -> DerResult<String> {
        self.decode_next(|cons| Ia5String::take_from(cons))
            .map(|s| s.to_string())
    }

    /// Read any of the character string types found in names and receipts.
    pub fn read_string(&mut self) -> DerResult<String> {
        self.decode_next(|cons| take_string(cons))
    }

    pub fn read_generalized_time(&mut self) -> DerResult<DateTime<Utc>> {
        self.decode_next(|cons| {
            cons.take_primitive_if(
                Tag::GENERALIZED_TIME,
                asn1time::generalized_time_from_primitive,
            )
        })
    }

    pub fn read_utc_time(&mut self) -> DerResult<DateTime<Utc>> {
        self.decode_next(|cons| {
            cons.take_primitive_if(Tag::UTC_TIME, asn1time::utc_time_from_primitive)
        })
    }

    /// Read an X.509 `Time`, which is either a UTCTime or a GeneralizedTime.
    pub fn read_time(&mut self) -> DerResult<DateTime<Utc>> {
        self.decode_next(|cons| asn1time::take_time(cons))
    }
}

#[cfg(test)]
mod tests {
    use {super::*, chrono::TimeZone, std::convert::TryFrom};

    fn single(data: &'static [u8]) -> Reader {
        Reader::new(Bytes::from_static(data))
    }

    #[test]
    fn short_and_long_lengths() {
        let mut reader = single(&[0x04, 0x02, 0xaa, 0xbb]);
        assert_eq!(reader.read_octet_string().unwrap().as_ref(), &[0xaa, 0xbb]);
        reader.finish().unwrap();

        let mut data = vec![0x04, 0x81, 0x80];
        data.extend(std::iter::repeat(0x42).take(0x80));
        let mut reader = Reader::new(data);
        assert_eq!(reader.read_octet_string().unwrap().len(), 0x80);
        assert!(reader.is_empty());
    }

    #[test]
    fn tlv_geometry() {
        // A NULL followed by a SEQUENCE of 64 NULLs.
        let mut data = vec![0x05, 0x00, 0x30, 0x81, 0x80];
        for _ in 0..64 {
            data.extend_from_slice(&[0x05, 0x00]);
        }
        let mut reader = Reader::new(data);
        reader.read_null().unwrap();

        let tlv = reader.read_tlv().unwrap();
        assert_eq!(tlv.tag(), Tag::SEQUENCE);
        assert!(tlv.is_constructed());
        assert_eq!(tlv.offset(), 2);
        assert_eq!(tlv.value_offset(), 5);
        assert_eq!(tlv.value().len(), 0x80);
        assert_eq!(tlv.encoded().len(), 0x83);
        assert!(reader.is_empty());
    }

    #[test]
    fn rejects_indefinite_length() {
        let mut reader = single(&[0x30, 0x80, 0x00, 0x00]);
        let err = reader.read_sequence().unwrap_err();
        assert_eq!(err.offset, 0);
        assert!(reader.read_tlv().is_err());
    }

    #[test]
    fn rejects_non_minimal_lengths() {
        assert!(single(&[0x04, 0x81, 0x01, 0x00]).read_octet_string().is_err());
        assert!(single(&[0x04, 0x82, 0x00, 0x81]).read_octet_string().is_err());
    }

    #[test]
    fn rejects_length_past_end() {
        assert!(single(&[0x30, 0x05, 0x02, 0x01, 0x00]).read_sequence().is_err());
        assert!(single(&[0x30, 0x84, 0xff, 0xff, 0xff, 0xff]).read_sequence().is_err());
        assert!(single(&[0x30, 0x89, 0x01, 0, 0, 0, 0, 0, 0, 0, 0])
            .read_sequence()
            .is_err());
    }

    #[test]
    fn truncated_headers() {
        assert!(single(&[0x30]).read_tlv().is_err());
        assert!(single(&[0x30, 0x82, 0x01]).read_tlv().is_err());
        assert!(single(&[0x1f]).read_tlv().is_err());
        assert_eq!(
            single(&[]).read_tlv().unwrap_err().reason,
            "unexpected end of data"
        );
    }

    #[test]
    fn rejects_trailing_data() {
        let tlv = Tlv::from_der(Bytes::from_static(&[0x05, 0x00, 0x00]));
        assert_eq!(
            tlv.unwrap_err(),
            MalformedDer::new(2, "trailing data after element")
        );

        let err = decode_der(Bytes::from_static(&[0x05, 0x00, 0x05, 0x00]), 10, |cons| {
            cons.take_null()
        })
        .unwrap_err();
        assert_eq!(err.offset, 12);

        assert!(decode_exact(Bytes::from_static(&[0x05, 0x00]), |cons| cons.take_null()).is_ok());
        assert!(
            decode_exact(Bytes::from_static(&[0x05, 0x00, 0x00]), |cons| cons.take_null())
                .is_err()
        );
    }

    #[test]
    fn nested_reader_is_bounded() {
        // The inner OCTET STRING claims 4 octets but its parent only holds 2.
        let mut reader = single(&[0x30, 0x04, 0x04, 0x04, 0xaa, 0xbb, 0xcc, 0xdd]);
        let mut inner = reader.read_sequence().unwrap();
        let err = inner.read_octet_string().unwrap_err();
        assert_eq!(err.offset, 2);
    }

    #[test]
    fn nested_offsets_are_absolute() {
        let mut reader = single(&[0x30, 0x06, 0x02, 0x01, 0x05, 0x04, 0x01, 0x00]);
        let mut inner = reader.read_sequence().unwrap();
        assert_eq!(inner.offset(), 2);
        assert_eq!(inner.read_small_integer().unwrap(), 5);
        let err = inner.read_oid().unwrap_err();
        assert_eq!(err.offset, 5);
        assert!(err.to_string().starts_with("malformed DER at offset 5: "));
    }

    #[test]
    fn high_tag_numbers() {
        let mut reader = single(&[0x9f, 0x81, 0x00, 0x00]);
        let tlv = reader.read_tlv().unwrap();
        assert!(tlv.tag().is_context_specific());
        assert!(!tlv.is_constructed());
        assert_eq!(tlv.value_offset(), 4);
    }

    #[test]
    fn unexpected_tag() {
        let mut reader = single(&[0x61, 0x00]);
        assert!(reader.read_sequence().is_err());
        assert!(reader.peek_tag().unwrap().unwrap().is_application());
    }

    #[test]
    fn primitive_sequence_rejected() {
        // SEQUENCE with the constructed bit clear.
        let err = single(&[0x10, 0x00]).read_sequence().unwrap_err();
        assert_eq!(err.reason, "expected constructed encoding");
    }

    #[test]
    fn optional_elements() {
        let mut reader = single(&[0xa0, 0x03, 0x02, 0x01, 0x02, 0x02, 0x01, 0x07]);
        let version = reader.read_optional(Tag::CTX_0).unwrap().unwrap();
        assert_eq!(version.value_offset(), 2);
        assert!(reader.read_optional(Tag::CTX_1).unwrap().is_none());
        assert_eq!(reader.read_small_integer().unwrap(), 7);
        assert!(reader.read_optional(Tag::CTX_0).unwrap().is_none());
    }

    #[test]
    fn integers() {
        let int = |data: &'static [u8]| {
            i64::try_from(&single(data).read_integer().unwrap()).ok()
        };

        assert_eq!(int(&[0x02, 0x01, 0x00]), Some(0));
        assert_eq!(int(&[0x02, 0x01, 0x7f]), Some(127));
        assert_eq!(int(&[0x02, 0x02, 0x00, 0x80]), Some(128));
        assert_eq!(int(&[0x02, 0x01, 0xff]), Some(-1));
        assert_eq!(int(&[0x02, 0x02, 0xff, 0x7f]), Some(-129));
        assert_eq!(
            int(&[0x02, 0x07, 0x03, 0x8d, 0x7e, 0xa8, 0x16, 0x35, 0xe3]),
            Some(1_000_000_055_555_555)
        );
        assert_eq!(int(&[0x02, 0x09, 0x01, 0, 0, 0, 0, 0, 0, 0, 0]), None);

        assert!(single(&[0x02, 0x00]).read_integer().is_err());
        // Redundant leading octet.
        assert!(single(&[0x02, 0x02, 0x00, 0x05]).read_integer().is_err());
        assert!(single(&[0x02, 0x09, 0x01, 0, 0, 0, 0, 0, 0, 0, 0])
            .read_small_integer()
            .is_err());
    }

    #[test]
    fn object_identifiers() {
        let oid = single(&[0x06, 0x09, 0x2a, 0x86, 0x48, 0x86, 0xf7, 0x0d, 0x01, 0x07, 0x02])
            .read_oid()
            .unwrap();
        assert_eq!(oid.to_string(), "1.2.840.113549.1.7.2");

        assert!(single(&[0x06, 0x00]).read_oid().is_err());
        assert!(single(&[0x06, 0x02, 0x2a, 0x86]).read_oid().is_err());
        assert!(single(&[0x06, 0x03, 0x2a, 0x80, 0x01]).read_oid().is_err());
    }

    #[test]
    fn bit_strings() {
        let bits = single(&[0x03, 0x02, 0x01, 0x86]).read_bit_string().unwrap();
        assert_eq!(bits.unused(), 1);
        assert!(bits.bit(0));
        assert!(!bits.bit(1));
        assert!(bits.bit(5));
        assert!(bits.bit(6));
        assert!(!bits.bit(7));
        assert!(!bits.bit(64));

        assert!(single(&[0x03, 0x00]).read_bit_string().is_err());
        assert!(single(&[0x03, 0x01, 0x01]).read_bit_string().is_err());
        assert!(single(&[0x03, 0x02, 0x08, 0x00]).read_bit_string().is_err());
    }

    #[test]
    fn booleans() {
        assert!(single(&[0x01, 0x01, 0xff]).read_boolean().unwrap());
        assert!(!single(&[0x01, 0x01, 0x00]).read_boolean().unwrap());
        assert!(single(&[0x01, 0x01, 0x01]).read_boolean().is_err());
        assert!(single(&[0x01, 0x02, 0xff, 0xff]).read_boolean().is_err());
    }

    #[test]
    fn strings() {
        assert_eq!(
            single(b"\x0c\x06h\xc3\xa9llo").read_utf8_string().unwrap(),
            "h\u{e9}llo"
        );
        assert!(single(b"\x0c\x01\xff").read_utf8_string().is_err());
        assert_eq!(single(b"\x16\x03abc").read_ia5_string().unwrap(), "abc");
        assert!(single(b"\x16\x01\xe9").read_ia5_string().is_err());
        assert_eq!(single(b"\x13\x02US").read_string().unwrap(), "US");
        assert_eq!(single(b"\x14\x02\xe9t").read_string().unwrap(), "\u{e9}t");
        assert_eq!(
            single(b"\x1e\x04\x00h\x00i").read_string().unwrap(),
            "hi"
        );
        assert!(single(b"\x1e\x03\x00h\x00").read_string().is_err());
        assert!(single(b"\x02\x01\x01").read_string().is_err());
        // Constructed string encodings are not DER.
        assert!(single(b"\x2c\x03\x0c\x01a").read_string().is_err());
    }

    #[test]
    fn times() {
        assert_eq!(
            single(b"\x17\x0d060425214036Z").read_time().unwrap(),
            Utc.with_ymd_and_hms(2006, 4, 25, 21, 40, 36).unwrap()
        );
        assert_eq!(
            single(b"\x18\x0f20350209214036Z")
                .read_generalized_time()
                .unwrap(),
            Utc.with_ymd_and_hms(2035, 2, 9, 21, 40, 36).unwrap()
        );
        assert!(single(b"\x17\x0d060425214036X").read_utc_time().is_err());
        assert!(single(b"\x18\x0f20350209214036Z").read_utc_time().is_err());
        assert!(single(b"\x04\x00").read_time().is_err());
    }

    #[test]
    fn decode_next_advances() {
        let mut reader = single(&[0x02, 0x01, 0x05, 0x30, 0x03, 0x01, 0x01, 0xff]);

        let value = reader
            .decode_next(|cons| cons.take_primitive_if(Tag::INTEGER, |prim| prim.to_i64()))
            .unwrap();
        assert_eq!(value, 5);
        assert_eq!(reader.offset(), 3);

        let flag = reader
            .decode_next(|cons| cons.take_sequence(|cons| cons.take_bool()))
            .unwrap();
        assert!(flag);
        reader.finish().unwrap();
    }
}
