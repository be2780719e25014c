// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device identifiers.
//!
//! Receipts are bound to the device they were issued to. On iOS and its
//! derivatives the identifier is `identifierForVendor`, a UUID. On macOS it
//! is the MAC address of the primary network interface.

use {
    crate::error::ReceiptError,
    std::fmt::{Debug, Formatter},
    uuid::Uuid,
};

/// Length of a MAC address.
const MAC_ADDRESS_LENGTH: usize = 6;

/// Raw device identifier bytes as fed to the receipt hash.
#[derive(Clone, Eq, Hash, PartialEq)]
pub struct DeviceIdentifier(Vec<u8>);

impl DeviceIdentifier {
    pub fn from_bytes(data: impl AsRef<[u8]>) -> Self {
        Self(data.as_ref().to_vec())
    }

    pub fn from_uuid(uuid: &Uuid) -> Self {
        Self(uuid.as_bytes().to_vec())
    }

    /// Parse a UUID string such as `E621E1F8-C36C-495A-93FC-0C247A3E6E5F`.
    pub fn parse_uuid(s: &str) -> Result<Self, ReceiptError> {
        let uuid = Uuid::parse_str(s)
            .map_err(|e| ReceiptError::InvalidDeviceIdentifier(format!("{}: {}", s, e)))?;

        Ok(Self::from_uuid(&uuid))
    }

    /// Parse a MAC address whose octets are delimited by `separator`.
    ///
    /// An empty separator accepts 12 contiguous hex digits.
    pub fn from_mac_address(s: &str, separator: &str) -> Result<Self, ReceiptError> {
        let invalid = || ReceiptError::InvalidDeviceIdentifier(format!("invalid MAC address {:?}", s));

        let data = if separator.is_empty() {
            hex::decode(s).map_err(|_| invalid())?
        } else {
            s.split(separator)
                .map(|octet| match octet.len() {
                    2 => u8::from_str_radix(octet, 16).map_err(|_| invalid()),
                    _ => Err(invalid()),
                })
                .collect::<Result<Vec<_>, _>>()?
        };

        if data.len() != MAC_ADDRESS_LENGTH {
            return Err(invalid());
        }

        Ok(Self(data))
    }

    pub fn from_base64(s: &str) -> Result<Self, ReceiptError> {
        base64::decode(s.trim())
            .map(Self)
            .map_err(|e| ReceiptError::InvalidDeviceIdentifier(format!("{}: {}", s, e)))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl Debug for DeviceIdentifier {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "DeviceIdentifier({})", hex::encode(&self.0))
    }
}

impl From<Uuid> for DeviceIdentifier {
    fn from(uuid: Uuid) -> Self {
        Self::from_uuid(&uuid)
    }
}

#[cfg(test)]
mod tests {
    use {super::*, crate::ErrorKind};

    #[test]
    fn uuid() {
        let device = DeviceIdentifier::parse_uuid("e0b0a1c2-d3e4-4f56-8789-0a1b2c3d4e5f").unwrap();
        assert_eq!(
            hex::encode(device.as_bytes()),
            "e0b0a1c2d3e44f5687890a1b2c3d4e5f"
        );

        let upper = DeviceIdentifier::parse_uuid("E0B0A1C2-D3E4-4F56-8789-0A1B2C3D4E5F").unwrap();
        assert_eq!(device, upper);

        assert_eq!(
            DeviceIdentifier::parse_uuid("e0b0a1c2")
                .unwrap_err()
                .kind(),
            ErrorKind::MalformedInput
        );
    }

    #[test]
    fn mac_address() {
        let colon = DeviceIdentifier::from_mac_address("6c:40:08:b5:94:5e", ":").unwrap();
        assert_eq!(colon.as_bytes(), &[0x6c, 0x40, 0x08, 0xb5, 0x94, 0x5e]);

        let dash = DeviceIdentifier::from_mac_address("6C-40-08-B5-94-5E", "-").unwrap();
        assert_eq!(colon, dash);

        let bare = DeviceIdentifier::from_mac_address("6c4008b5945e", "").unwrap();
        assert_eq!(colon, bare);

        for bad in [
            "6c:40:08:b5:94",
            "6c:40:08:b5:94:5e:00",
            "6c:40:08:b5:94:5",
            "6c:40:08:b5:94:zz",
            "6c-40-08-b5-94-5e",
        ] {
            assert!(
                DeviceIdentifier::from_mac_address(bad, ":").is_err(),
                "{}",
                bad
            );
        }
    }

    #[test]
    fn base64() {
        let device = DeviceIdentifier::from_base64("bEAItZRe").unwrap();
        assert_eq!(
            device,
            DeviceIdentifier::from_mac_address("6c:40:08:b5:94:5e", ":").unwrap()
        );
        assert_eq!(format!("{:?}", device), "DeviceIdentifier(6c4008b5945e)");

        assert!(DeviceIdentifier::from_base64("not base64!").is_err());
    }
}
