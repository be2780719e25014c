// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Receipt payload decoding.
//!
//! The signed content of a receipt is a `SET OF ReceiptAttribute`:
//!
//! ```asn1
//! ReceiptAttribute ::= SEQUENCE {
//!     type    INTEGER,
//!     version INTEGER,
//!     value   OCTET STRING }
//! ```
//!
//! The `value` octets hold a further DER element whose form depends on
//! `type`. In-app purchase receipts (type 17) nest another attribute set.

use {
    crate::{
        der::{MalformedDer, Reader},
        device::DeviceIdentifier,
        error::ReceiptError,
        pkcs7::SignedData,
    },
    bcder::Tag,
    bytes::Bytes,
    chrono::{DateTime, Utc},
    log::warn,
    ring::{constant_time, digest},
    std::{
        collections::BTreeMap,
        fmt::{Display, Formatter},
    },
};

const ENVIRONMENT: i64 = 0;
const BUNDLE_IDENTIFIER: i64 = 2;
const APPLICATION_VERSION: i64 = 3;
const OPAQUE_VALUE: i64 = 4;
const SHA1_HASH: i64 = 5;
const CREATION_DATE: i64 = 12;
const IN_APP_PURCHASE: i64 = 17;
const ORIGINAL_APPLICATION_VERSION: i64 = 19;
const EXPIRATION_DATE: i64 = 21;

/// Top-level attribute types documented by Apple.
const DOCUMENTED_TYPES: &[i64] = &[
    BUNDLE_IDENTIFIER,
    APPLICATION_VERSION,
    OPAQUE_VALUE,
    SHA1_HASH,
    CREATION_DATE,
    IN_APP_PURCHASE,
    ORIGINAL_APPLICATION_VERSION,
    EXPIRATION_DATE,
];

const IAP_QUANTITY: i64 = 1701;
const IAP_PRODUCT_IDENTIFIER: i64 = 1702;
const IAP_TRANSACTION_IDENTIFIER: i64 = 1703;
const IAP_PURCHASE_DATE: i64 = 1704;
const IAP_ORIGINAL_TRANSACTION_IDENTIFIER: i64 = 1705;
const IAP_ORIGINAL_PURCHASE_DATE: i64 = 1706;
const IAP_SUBSCRIPTION_EXPIRATION_DATE: i64 = 1708;
const IAP_WEB_ORDER_LINE_ITEM_ID: i64 = 1711;
const IAP_CANCELLATION_DATE: i64 = 1712;

/// Length of the SHA-1 receipt hash.
pub const SHA1_HASH_LENGTH: usize = 20;

/// A single `ReceiptAttribute` as found in a receipt payload.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ReceiptAttribute {
    pub attribute_type: i64,
    pub version: i64,
    /// Content octets of the `value` OCTET STRING.
    pub value: Bytes,
    /// Absolute offset of `value` within the outermost input.
    pub offset: usize,
}

impl ReceiptAttribute {
    fn take_from(reader: &mut Reader) -> Result<Self, MalformedDer> {
        let mut seq = reader.read_sequence()?;

        let attribute_type = seq.read_small_integer()?;
        let version = seq.read_small_integer()?;
        let tlv = seq.read_element(Tag::OCTET_STRING)?;
        seq.finish()?;

        Ok(Self {
            attribute_type,
            version,
            value: tlv.value(),
            offset: tlv.value_offset(),
        })
    }

    fn reader(&self) -> Reader {
        Reader::with_offset(self.value.clone(), self.offset)
    }

    fn malformed(&self, detail: impl Display) -> ReceiptError {
        ReceiptError::MalformedAttribute {
            attribute: self.attribute_type,
            detail: detail.to_string(),
        }
    }

    /// Decode the value as a UTF8String or IA5String.
    pub fn decode_string(&self) -> Result<String, ReceiptError> {
        let mut reader = self.reader();

        let value = match reader.peek_tag().map_err(|e| self.malformed(e))? {
            Some(Tag::UTF8_STRING) => reader.read_utf8_string(),
            Some(Tag::IA5_STRING) => reader.read_ia5_string(),
            _ => return Err(self.malformed("expected UTF8String or IA5String")),
        }
        .map_err(|e| self.malformed(e))?;

        reader.finish().map_err(|e| self.malformed(e))?;

        Ok(value)
    }

    pub fn decode_integer(&self) -> Result<i64, ReceiptError> {
        let mut reader = self.reader();

        let value = reader.read_small_integer().map_err(|e| self.malformed(e))?;
        reader.finish().map_err(|e| self.malformed(e))?;

        Ok(value)
    }

    /// Decode an RFC 3339 date.
    ///
    /// An empty string means the date is not set.
    pub fn decode_date(&self) -> Result<Option<DateTime<Utc>>, ReceiptError> {
        let value = self.decode_string()?;

        if value.is_empty() {
            return Ok(None);
        }

        DateTime::parse_from_rfc3339(&value)
            .map(|dt| Some(dt.with_timezone(&Utc)))
            .map_err(|e| self.malformed(format!("invalid date {:?}: {}", value, e)))
    }

    /// Parse the value as a nested attribute set.
    fn decode_set(&self) -> Result<Vec<ReceiptAttribute>, ReceiptError> {
        parse_attribute_set(self.value.clone(), self.offset).map_err(|e| self.malformed(e))
    }
}

fn parse_attribute_set(data: Bytes, base: usize) -> Result<Vec<ReceiptAttribute>, MalformedDer> {
    let mut outer = Reader::with_offset(data, base);
    let mut set = outer.read_set()?;
    outer.finish()?;

    let mut attributes = vec![];
    while !set.is_empty() {
        attributes.push(ReceiptAttribute::take_from(&mut set)?);
    }

    Ok(attributes)
}

/// Attributes grouped by type, in encoded order within each type.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
struct AttributeMap(BTreeMap<i64, Vec<ReceiptAttribute>>);

impl AttributeMap {
    fn new(attributes: Vec<ReceiptAttribute>) -> Self {
        let mut map = BTreeMap::<i64, Vec<ReceiptAttribute>>::new();

        for attribute in attributes {
            map.entry(attribute.attribute_type)
                .or_default()
                .push(attribute);
        }

        Self(map)
    }

    /// The attribute of a single-valued type. Repeats are ignored.
    fn single(&self, attribute_type: i64) -> Option<&ReceiptAttribute> {
        let values = self.0.get(&attribute_type)?;

        if values.len() > 1 {
            warn!(
                "receipt attribute {} occurs {} times; using the first",
                attribute_type,
                values.len()
            );
        }

        values.first()
    }

    fn all(&self, attribute_type: i64) -> &[ReceiptAttribute] {
        self.0
            .get(&attribute_type)
            .map(|v| v.as_slice())
            .unwrap_or_default()
    }

    fn string(&self, attribute_type: i64) -> Result<Option<String>, ReceiptError> {
        self.single(attribute_type)
            .map(|a| a.decode_string())
            .transpose()
    }

    fn integer(&self, attribute_type: i64) -> Result<Option<i64>, ReceiptError> {
        self.single(attribute_type)
            .map(|a| a.decode_integer())
            .transpose()
    }

    fn date(&self, attribute_type: i64) -> Result<Option<DateTime<Utc>>, ReceiptError> {
        Ok(self
            .single(attribute_type)
            .map(|a| a.decode_date())
            .transpose()?
            .flatten())
    }

    fn iter(&self) -> impl Iterator<Item = &ReceiptAttribute> {
        self.0.values().flatten()
    }
}

/// A decoded App Store receipt payload.
///
/// Instances hold decoded values only. Whether the receipt is authentic is
/// established by [crate::validation::validate].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Receipt {
    attributes: AttributeMap,
    environment: Option<String>,
    bundle_identifier: String,
    bundle_identifier_data: Bytes,
    application_version: String,
    opaque_value: Bytes,
    sha1_hash: Bytes,
    creation_date: Option<DateTime<Utc>>,
    expiration_date: Option<DateTime<Utc>>,
    original_application_version: Option<String>,
    in_app_purchases: Vec<InAppPurchase>,
}

impl Receipt {
    /// Decode a receipt payload, the content of the PKCS#7 envelope.
    pub fn from_content(data: impl Into<Bytes>) -> Result<Self, ReceiptError> {
        Self::decode(data.into(), 0)
    }

    /// Extract and decode the payload of a PKCS#7 receipt.
    ///
    /// Only structural checks are performed. Nothing about the signature or
    /// the certificates is verified.
    pub fn from_pkcs7_der(data: impl Into<Bytes>) -> Result<Self, ReceiptError> {
        let signed_data = SignedData::from_der(data)?;

        Self::decode(
            signed_data.signed_content().clone(),
            signed_data.content_offset(),
        )
    }

    /// Decode a payload that starts `base` octets into the original input.
    pub(crate) fn decode(content: Bytes, base: usize) -> Result<Self, ReceiptError> {
        let attributes = AttributeMap::new(parse_attribute_set(content, base)?);

        let bundle = attributes
            .single(BUNDLE_IDENTIFIER)
            .ok_or(ReceiptError::MissingField("bundle identifier"))?;
        let bundle_identifier = bundle.decode_string()?;
        let bundle_identifier_data = bundle.value.clone();

        let application_version = attributes
            .string(APPLICATION_VERSION)?
            .ok_or(ReceiptError::MissingField("application version"))?;

        let opaque_value = attributes
            .single(OPAQUE_VALUE)
            .ok_or(ReceiptError::MissingField("opaque value"))?
            .value
            .clone();

        let hash = attributes
            .single(SHA1_HASH)
            .ok_or(ReceiptError::MissingField("SHA-1 hash"))?;
        if hash.value.len() != SHA1_HASH_LENGTH {
            return Err(hash.malformed(format!(
                "expected {} octets, got {}",
                SHA1_HASH_LENGTH,
                hash.value.len()
            )));
        }
        let sha1_hash = hash.value.clone();

        // Undocumented, so a value we cannot read is not fatal.
        let environment = attributes
            .single(ENVIRONMENT)
            .and_then(|a| a.decode_string().ok());

        let in_app_purchases = attributes
            .all(IN_APP_PURCHASE)
            .iter()
            .map(InAppPurchase::decode)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            environment,
            bundle_identifier,
            bundle_identifier_data,
            application_version,
            opaque_value,
            sha1_hash,
            creation_date: attributes.date(CREATION_DATE)?,
            expiration_date: attributes.date(EXPIRATION_DATE)?,
            original_application_version: attributes.string(ORIGINAL_APPLICATION_VERSION)?,
            in_app_purchases,
            attributes,
        })
    }

    /// The store environment, such as `Production` or `Sandbox`.
    pub fn environment(&self) -> Option<&str> {
        self.environment.as_deref()
    }

    pub fn bundle_identifier(&self) -> &str {
        &self.bundle_identifier
    }

    /// The encoded bundle identifier as stored in the receipt.
    ///
    /// This is the DER `UTF8String` element, header included. It is one of
    /// the inputs of the receipt hash.
    pub fn bundle_identifier_data(&self) -> &[u8] {
        &self.bundle_identifier_data
    }

    /// `CFBundleVersion` on iOS, `CFBundleShortVersionString` on macOS.
    pub fn application_version(&self) -> &str {
        &self.application_version
    }

    pub fn opaque_value(&self) -> &[u8] {
        &self.opaque_value
    }

    pub fn sha1_hash(&self) -> &[u8] {
        &self.sha1_hash
    }

    pub fn creation_date(&self) -> Option<DateTime<Utc>> {
        self.creation_date
    }

    /// Only receipts of Volume Purchase Program apps expire.
    pub fn expiration_date(&self) -> Option<DateTime<Utc>> {
        self.expiration_date
    }

    /// The application version originally purchased.
    ///
    /// Always `1.0` in the sandbox.
    pub fn original_application_version(&self) -> Option<&str> {
        self.original_application_version.as_deref()
    }

    pub fn in_app_purchases(&self) -> &[InAppPurchase] {
        &self.in_app_purchases
    }

    /// Every attribute of the payload, ordered by type.
    pub fn attributes(&self) -> impl Iterator<Item = &ReceiptAttribute> {
        self.attributes.iter()
    }

    /// Compute the receipt hash for a device.
    ///
    /// This is `SHA1(device || opaque value || bundle identifier data)`.
    pub fn compute_hash(&self, device: &DeviceIdentifier) -> digest::Digest {
        let mut context = digest::Context::new(&digest::SHA1_FOR_LEGACY_USE_ONLY);
        context.update(device.as_bytes());
        context.update(&self.opaque_value);
        context.update(&self.bundle_identifier_data);

        context.finish()
    }

    /// Verify the receipt was issued to `device`.
    pub fn verify_hash(&self, device: &DeviceIdentifier) -> Result<(), ReceiptError> {
        let computed = self.compute_hash(device);

        constant_time::verify_slices_are_equal(computed.as_ref(), &self.sha1_hash)
            .map_err(|_| ReceiptError::HashMismatch)
    }

    /// Attributes Apple does not document, sorted with recognized ones first.
    pub fn unofficial_attributes(&self) -> Vec<UnofficialAttribute> {
        let mut result = self
            .attributes
            .0
            .iter()
            .filter(|(typ, _)| !DOCUMENTED_TYPES.contains(*typ))
            .flat_map(|(_, values)| values.iter().map(UnofficialAttribute::from_attribute))
            .collect::<Vec<_>>();

        result.sort_by_key(|a| (a.kind.is_none(), a.attribute_type));

        result
    }
}

/// An in-app purchase receipt.
///
/// Fields absent from the receipt, or set to an empty date, are `None`.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct InAppPurchase {
    pub quantity: Option<i64>,
    pub product_identifier: Option<String>,
    pub transaction_identifier: Option<String>,
    pub original_transaction_identifier: Option<String>,
    pub purchase_date: Option<DateTime<Utc>>,
    pub original_purchase_date: Option<DateTime<Utc>>,
    pub subscription_expiration_date: Option<DateTime<Utc>>,
    pub cancellation_date: Option<DateTime<Utc>>,
    pub web_order_line_item_id: Option<i64>,
    pub attributes: Vec<ReceiptAttribute>,
}

impl InAppPurchase {
    fn decode(attribute: &ReceiptAttribute) -> Result<Self, ReceiptError> {
        let attributes = attribute.decode_set()?;
        let map = AttributeMap::new(attributes.clone());

        Ok(Self {
            quantity: map.integer(IAP_QUANTITY)?,
            product_identifier: map.string(IAP_PRODUCT_IDENTIFIER)?,
            transaction_identifier: map.string(IAP_TRANSACTION_IDENTIFIER)?,
            original_transaction_identifier: map.string(IAP_ORIGINAL_TRANSACTION_IDENTIFIER)?,
            purchase_date: map.date(IAP_PURCHASE_DATE)?,
            original_purchase_date: map.date(IAP_ORIGINAL_PURCHASE_DATE)?,
            subscription_expiration_date: map.date(IAP_SUBSCRIPTION_EXPIRATION_DATE)?,
            cancellation_date: map.date(IAP_CANCELLATION_DATE)?,
            web_order_line_item_id: map.integer(IAP_WEB_ORDER_LINE_ITEM_ID)?,
            attributes,
        })
    }

    /// Whether the purchase was refunded or otherwise cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.cancellation_date.is_some()
    }
}

/// Meaning of an undocumented attribute type seen in real receipts.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum UnofficialAttributeKind {
    /// Type 0: `Production`, `ProductionSandbox`, `Sandbox`, ...
    ProvisioningType,
    /// Types 8, 18 and 22.
    UndocumentedDate,
    /// Type 10.
    AgeRating,
    /// Type 23.
    ClientName,
}

impl UnofficialAttributeKind {
    pub fn from_type(attribute_type: i64) -> Option<Self> {
        match attribute_type {
            0 => Some(Self::ProvisioningType),
            8 | 18 | 22 => Some(Self::UndocumentedDate),
            10 => Some(Self::AgeRating),
            23 => Some(Self::ClientName),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ProvisioningType => "provisioning type",
            Self::UndocumentedDate => "date",
            Self::AgeRating => "age rating",
            Self::ClientName => "client name",
        }
    }
}

/// Best-effort decoding of an undocumented attribute value.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum UnofficialValue {
    String(String),
    Date(DateTime<Utc>),
    Bytes(Bytes),
}

impl Display for UnofficialValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::String(s) => write!(f, "{:?}", s),
            Self::Date(dt) => f.write_str(&dt.to_rfc3339()),
            Self::Bytes(data) => write!(f, "0x{}", hex::encode(data)),
        }
    }
}

/// An attribute Apple does not document.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct UnofficialAttribute {
    pub attribute_type: i64,
    pub kind: Option<UnofficialAttributeKind>,
    pub value: UnofficialValue,
}

impl UnofficialAttribute {
    fn from_attribute(attribute: &ReceiptAttribute) -> Self {
        let kind = UnofficialAttributeKind::from_type(attribute.attribute_type);

        let value = match (kind, attribute.decode_string()) {
            (Some(UnofficialAttributeKind::UndocumentedDate), Ok(s)) => {
                match DateTime::parse_from_rfc3339(&s) {
                    Ok(dt) => UnofficialValue::Date(dt.with_timezone(&Utc)),
                    Err(_) => UnofficialValue::String(s),
                }
            }
            (_, Ok(s)) => UnofficialValue::String(s),
            (_, Err(_)) => UnofficialValue::Bytes(attribute.value.clone()),
        };

        Self {
            attribute_type: attribute.attribute_type,
            kind,
            value,
        }
    }
}

impl Display for UnofficialAttribute {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.kind {
            Some(kind) => write!(f, "{} ({}): {}", self.attribute_type, kind.as_str(), self.value),
            None => write!(f, "{}: {}", self.attribute_type, self.value),
        }
    }
}
