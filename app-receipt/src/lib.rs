// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Offline validation of Apple App Store receipts in pure Rust

An App Store receipt is a PKCS #7 `SignedData` message. Its payload is a
DER encoded set of attributes describing the application and its in-app
purchases. The signer's certificate chains to the Apple Inc. Root CA.

This crate parses receipts and verifies them without any network access:

* The certificate chain of the signer must terminate at a pinned trust
  anchor, by default the Apple Inc. Root CA embedded in this crate. Every
  certificate in the chain must be valid at the verification time.
* The signer's signature must verify and the message digest must match
  the payload.
* The payload must carry the expected bundle identifier, and its SHA-1
  hash must bind it to the caller's device identifier.

```no_run
use app_receipt::{validate, DeviceIdentifier, Expectations};

let data = std::fs::read("receipt")?;
let device = DeviceIdentifier::parse_uuid("E621E1F8-C36C-495A-93FC-0C247A3E6E5F")?;

let receipt = validate(&data, &Expectations::new("com.example.app", device))?;
for purchase in receipt.in_app_purchases() {
    println!("{:?}", purchase.product_identifier);
}
# Ok::<(), Box<dyn std::error::Error>>(())
```

# Technical Notes

Receipts can be inspected with OpenSSL:

   $ openssl pkcs7 -inform DER -in <filename> -print_certs
   $ openssl asn1parse -inform DER -in <filename>
*/

pub mod algorithm;
pub mod anchor;
pub mod asn1time;
pub mod certificate;
pub mod chain;
pub mod der;
pub mod device;
mod error;
pub mod pkcs7;
pub mod receipt;
#[cfg(test)]
mod testutil;
pub mod validation;

pub use {
    anchor::TrustAnchor,
    bytes::Bytes,
    certificate::Certificate,
    chain::CertificateChain,
    der::MalformedDer,
    device::DeviceIdentifier,
    error::{ErrorKind, ReceiptError},
    pkcs7::SignedData,
    receipt::{
        InAppPurchase, Receipt, ReceiptAttribute, UnofficialAttribute, UnofficialAttributeKind,
        UnofficialValue,
    },
    validation::{validate, Expectations, ValidationStage, VerifiedReceipt},
};
