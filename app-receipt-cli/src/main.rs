// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use {
    app_receipt::{
        validate, Certificate, DeviceIdentifier, Expectations, Receipt, ReceiptError,
        SignedData, TrustAnchor,
    },
    chrono::{DateTime, Utc},
    clap::{Arg, ArgGroup, ArgMatches, Command},
    log::LevelFilter,
    thiserror::Error,
};

const VERIFY_ABOUT: &str = "\
Verify an App Store receipt.

The receipt's certificate chain must terminate at the Apple Inc. Root CA
(or the certificate given by --anchor), the signature must verify, and the
receipt must be for the given bundle identifier and device.

The device is the identifierForVendor UUID on iOS and the MAC address of
the primary network interface on macOS.

On success the decoded receipt is printed. On failure the verdict kind is
printed and the process exits with status 1.
";

#[derive(Debug, Error)]
enum CliError {
    #[error("{0}")]
    Receipt(#[from] ReceiptError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("bad argument: {0}")]
    BadArgument(String),

    #[error("unknown command")]
    UnknownCommand,
}

fn read_path(args: &ArgMatches, name: &str) -> Result<Vec<u8>, CliError> {
    let path = args
        .value_of(name)
        .ok_or_else(|| CliError::BadArgument(format!("{} is required", name)))?;

    Ok(std::fs::read(path)?)
}

fn device_from_args(args: &ArgMatches) -> Result<DeviceIdentifier, CliError> {
    if let Some(uuid) = args.value_of("device_uuid") {
        Ok(DeviceIdentifier::parse_uuid(uuid)?)
    } else if let Some(mac) = args.value_of("device_mac") {
        let separator = args.value_of("mac_separator").unwrap_or(":");
        Ok(DeviceIdentifier::from_mac_address(mac, separator)?)
    } else if let Some(encoded) = args.value_of("device_base64") {
        Ok(DeviceIdentifier::from_base64(encoded)?)
    } else if args.is_present("skip_hash") {
        Ok(DeviceIdentifier::from_bytes(Vec::<u8>::new()))
    } else {
        Err(CliError::BadArgument(
            "a device identifier is required unless --skip-hash is given".into(),
        ))
    }
}

fn anchor_from_path(path: &str) -> Result<TrustAnchor, CliError> {
    let data = std::fs::read(path)?;

    if data.starts_with(b"-----BEGIN") {
        Ok(TrustAnchor::from_pem(data)?)
    } else {
        Ok(TrustAnchor::from_der(data)?)
    }
}

fn expectations_from_args(args: &ArgMatches) -> Result<Expectations, CliError> {
    let bundle_identifier = args
        .value_of("bundle_id")
        .ok_or_else(|| CliError::BadArgument("--bundle-id is required".into()))?;

    let mut expectations = Expectations::new(bundle_identifier, device_from_args(args)?);

    if let Some(version) = args.value_of("bundle_version") {
        expectations = expectations.with_bundle_version(version);
    }
    if let Some(version) = args.value_of("original_version") {
        expectations = expectations.with_original_application_version(version);
    }
    if let Some(path) = args.value_of("anchor") {
        expectations = expectations.with_anchor(anchor_from_path(path)?);
    }
    if let Some(time) = args.value_of("at") {
        let time = DateTime::parse_from_rfc3339(time)
            .map_err(|e| CliError::BadArgument(format!("--at: {}", e)))?;
        expectations = expectations.at(time.with_timezone(&Utc));
    }
    if args.is_present("skip_signature") {
        expectations = expectations.skip_signature_validation();
    }
    if args.is_present("skip_hash") {
        expectations = expectations.skip_hash_validation();
    }

    Ok(expectations)
}

fn format_date(date: Option<DateTime<Utc>>) -> String {
    date.map(|d| d.to_rfc3339())
        .unwrap_or_else(|| "<none>".to_string())
}

fn print_receipt(receipt: &Receipt) {
    println!(
        "Environment:                  {}",
        receipt.environment().unwrap_or("<none>")
    );
    println!("Bundle Identifier:            {}", receipt.bundle_identifier());
    println!("Application Version:          {}", receipt.application_version());
    println!(
        "Original Application Version: {}",
        receipt.original_application_version().unwrap_or("<none>")
    );
    println!(
        "Creation Date:                {}",
        format_date(receipt.creation_date())
    );
    println!(
        "Expiration Date:              {}",
        format_date(receipt.expiration_date())
    );
    println!(
        "Opaque Value:                 {}",
        hex::encode(receipt.opaque_value())
    );
    println!(
        "SHA-1 Hash:                   {}",
        hex::encode(receipt.sha1_hash())
    );

    for (i, purchase) in receipt.in_app_purchases().iter().enumerate() {
        println!();
        println!("# In-App Purchase {}", i);
        println!();
        println!(
            "Product Identifier:           {}",
            purchase.product_identifier.as_deref().unwrap_or("<none>")
        );
        println!(
            "Quantity:                     {}",
            purchase
                .quantity
                .map(|q| q.to_string())
                .unwrap_or_else(|| "<none>".to_string())
        );
        println!(
            "Transaction Identifier:       {}",
            purchase.transaction_identifier.as_deref().unwrap_or("<none>")
        );
        println!(
            "Original Transaction ID:      {}",
            purchase
                .original_transaction_identifier
                .as_deref()
                .unwrap_or("<none>")
        );
        println!(
            "Purchase Date:                {}",
            format_date(purchase.purchase_date)
        );
        println!(
            "Original Purchase Date:       {}",
            format_date(purchase.original_purchase_date)
        );
        println!(
            "Subscription Expiration Date: {}",
            format_date(purchase.subscription_expiration_date)
        );
        println!(
            "Cancellation Date:            {}",
            format_date(purchase.cancellation_date)
        );
        if let Some(id) = purchase.web_order_line_item_id {
            println!("Web Order Line Item ID:       {}", id);
        }
    }

    let unofficial = receipt.unofficial_attributes();
    if !unofficial.is_empty() {
        println!();
        println!("# Unofficial Attributes");
        println!();
        for attribute in unofficial {
            println!("{}", attribute);
        }
    }
}

fn print_certificate(cert: &Certificate) -> Result<(), CliError> {
    println!("Subject:                      {}", cert.subject_display());
    println!("Issuer:                       {}", cert.issuer_name());
    println!(
        "Serial Number:                {}",
        hex::encode(cert.serial_number().as_slice())
    );
    println!(
        "Not Before:                   {}",
        cert.validity_not_before().to_rfc3339()
    );
    println!(
        "Not After:                    {}",
        cert.validity_not_after().to_rfc3339()
    );
    println!("Certificate Authority?:       {}", cert.is_ca());
    println!("Subject is Issuer?:           {}", cert.subject_is_issuer());
    println!("Key Algorithm:                {}", cert.key_algorithm()?);
    println!("Signature Algorithm:          {}", cert.signature_algorithm()?);
    println!(
        "SHA-256 fingerprint:          {}",
        hex::encode(cert.sha256_fingerprint())
    );

    Ok(())
}

fn command_verify(args: &ArgMatches) -> Result<(), CliError> {
    let data = read_path(args, "path")?;
    let expectations = expectations_from_args(args)?;

    match validate(&data, &expectations) {
        Ok(receipt) => {
            println!("Verdict:                      OK");
            if let Some(cert) = receipt.signer_certificate() {
                println!("Signer:                       {}", cert.subject_display());
            }
            println!();
            print_receipt(&receipt);

            Ok(())
        }
        Err(e) => {
            println!("Verdict:                      {}", e.kind());
            Err(e.into())
        }
    }
}

fn command_print(args: &ArgMatches) -> Result<(), CliError> {
    let data = read_path(args, "path")?;

    print_receipt(&Receipt::from_pkcs7_der(data)?);

    Ok(())
}

fn command_print_certificates(args: &ArgMatches) -> Result<(), CliError> {
    let data = read_path(args, "path")?;
    let signed_data = SignedData::from_der(data)?;

    for (i, embedded) in signed_data.certificates().iter().enumerate() {
        println!("# Certificate {}", i);
        println!();
        print_certificate(embedded.certificate()?)?;
        println!();
    }

    Ok(())
}

fn path_arg() -> Arg<'static> {
    Arg::new("path")
        .required(true)
        .help("Path to a DER encoded receipt")
}

fn main_impl() -> Result<(), CliError> {
    let app = Command::new("App Store receipt validation in pure Rust")
        .version(env!("CARGO_PKG_VERSION"))
        .author("Gregory Szorc <gregory.szorc@gmail.com>")
        .about("Inspect and validate Apple App Store receipts offline")
        .arg_required_else_help(true)
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .global(true)
                .multiple_occurrences(true)
                .help("Increase logging verbosity. Can be specified multiple times."),
        );

    let app = app.subcommand(
        Command::new("verify")
            .about("Verify a receipt")
            .long_about(VERIFY_ABOUT)
            .arg(path_arg())
            .arg(
                Arg::new("bundle_id")
                    .long("bundle-id")
                    .takes_value(true)
                    .required(true)
                    .help("Expected bundle identifier"),
            )
            .arg(
                Arg::new("device_uuid")
                    .long("device-uuid")
                    .takes_value(true)
                    .help("Device identifier as a UUID"),
            )
            .arg(
                Arg::new("device_mac")
                    .long("device-mac")
                    .takes_value(true)
                    .help("Device identifier as a MAC address"),
            )
            .arg(
                Arg::new("mac_separator")
                    .long("mac-separator")
                    .takes_value(true)
                    .default_value(":")
                    .help("Octet separator of --device-mac"),
            )
            .arg(
                Arg::new("device_base64")
                    .long("device-base64")
                    .takes_value(true)
                    .help("Device identifier as base64 encoded bytes"),
            )
            .group(ArgGroup::new("device").args(&["device_uuid", "device_mac", "device_base64"]))
            .arg(
                Arg::new("bundle_version")
                    .long("bundle-version")
                    .takes_value(true)
                    .help("Expected application version"),
            )
            .arg(
                Arg::new("original_version")
                    .long("original-version")
                    .takes_value(true)
                    .help("Expected original application version"),
            )
            .arg(
                Arg::new("anchor")
                    .long("anchor")
                    .takes_value(true)
                    .help("DER or PEM certificate to trust instead of the Apple Inc. Root CA"),
            )
            .arg(
                Arg::new("at")
                    .long("at")
                    .takes_value(true)
                    .help("RFC 3339 time to validate at instead of now"),
            )
            .arg(
                Arg::new("skip_signature")
                    .long("skip-signature")
                    .help("Do not verify certificates and signatures"),
            )
            .arg(
                Arg::new("skip_hash")
                    .long("skip-hash")
                    .help("Do not verify the receipt belongs to the device"),
            ),
    );

    let app = app.subcommand(
        Command::new("print")
            .about("Print the contents of a receipt without validating it")
            .arg(path_arg()),
    );

    let app = app.subcommand(
        Command::new("print-certificates")
            .about("Print the certificates embedded in a receipt")
            .arg(path_arg()),
    );

    let matches = app.get_matches();

    let log_level = match matches.occurrences_of("verbose") {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };

    let mut builder = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(log_level.as_str()),
    );

    // Disable log context except at higher log levels.
    if log_level <= LevelFilter::Info {
        builder
            .format_timestamp(None)
            .format_level(false)
            .format_target(false);
    }

    builder.init();

    match matches.subcommand() {
        Some(("verify", args)) => command_verify(args),
        Some(("print", args)) => command_print(args),
        Some(("print-certificates", args)) => command_print_certificates(args),
        _ => Err(CliError::UnknownCommand),
    }
}

fn main() {
    let exit_code = match main_impl() {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("Error: {}", err);
            1
        }
    };

    std::process::exit(exit_code)
}
