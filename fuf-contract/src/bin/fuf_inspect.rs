use std::env;
use std::fs;
use std::process;

use fuf_contract::{
    decode_records, verify_checksum, ChecksumLayout, ContractError, FufHeader, Record, HEADER_LEN,
};
use serde::Serialize;

#[derive(Serialize)]
struct Report<'a> {
    path: &'a str,
    size: usize,
    header: FufHeader,
    checksum: ChecksumReport,
    records: Vec<Record>,
}

#[derive(Serialize)]
struct ChecksumReport {
    layout: ChecksumLayout,
    stored: u32,
    valid: bool,
}

fn usage() -> ! {
    eprintln!("Usage: fuf-inspect <file.fuf> [--layout corrected|legacy] [--hex]");
    process::exit(1);
}

fn main() {
    let mut path = None;
    let mut layout = ChecksumLayout::default();
    let mut hex_dump = false;

    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--hex" => hex_dump = true,
            "--layout" => {
                let value = args.next().unwrap_or_else(|| usage());
                layout = value.parse().unwrap_or_else(|err: ContractError| {
                    eprintln!("{}", err);
                    process::exit(1);
                });
            }
            _ if path.is_none() => path = Some(arg),
            _ => usage(),
        }
    }
    let path = path.unwrap_or_else(|| usage());

    let image = fs::read(&path).unwrap_or_else(|err| {
        eprintln!("Failed to read {}: {}", path, err);
        process::exit(1);
    });

    // Malformed files are rejected in both output modes.
    let (header, records) = decode(&image).unwrap_or_else(|err| {
        eprintln!("{}: {}", path, err);
        process::exit(1);
    });

    if hex_dump {
        for line in hex_lines(&image) {
            println!("{}", line);
        }
        return;
    }

    let stored = layout.stored(&image).unwrap_or_else(|err| {
        eprintln!("{}: {}", path, err);
        process::exit(1);
    });
    let valid = verify_checksum(&image, layout).is_ok();
    let report = Report {
        path: &path,
        size: image.len(),
        header,
        checksum: ChecksumReport {
            layout,
            stored,
            valid,
        },
        records,
    };

    match serde_json::to_string_pretty(&report) {
        Ok(json) => println!("{}", json),
        Err(err) => {
            eprintln!("Failed to serialize report: {}", err);
            process::exit(1);
        }
    }

    if !valid {
        process::exit(2);
    }
}

/// Validates the header and walks every record.
fn decode(image: &[u8]) -> Result<(FufHeader, Vec<Record>), ContractError> {
    let header = FufHeader::from_bytes(image)?;
    let records = decode_records(image)?;
    Ok((header, records))
}

fn hex_lines(image: &[u8]) -> Vec<String> {
    let split = HEADER_LEN.min(image.len());
    let mut lines = vec![format!("header  {}", hex::encode(&image[..split]))];
    for (row, chunk) in image[split..].chunks(16).enumerate() {
        lines.push(format!("{:06x}  {}", split + row * 16, hex::encode(chunk)));
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image() -> Vec<u8> {
        let mut header = FufHeader::new(256);
        header.sensor_count = 1;
        let mut image = header.to_bytes().to_vec();
        Record::Sensor {
            id: 1,
            name: "imu_pitch".into(),
        }
        .encode_into(&mut image);
        image
    }

    #[test]
    fn non_fuf_files_are_rejected() {
        assert_eq!(
            decode(b"#!/bin/sh\necho not bytecode at all\n").map(|_| ()),
            Err(ContractError::InvalidMagic)
        );
        assert_eq!(decode(b"FUF").map(|_| ()), Err(ContractError::InvalidLength));

        let mut truncated = image();
        truncated.pop();
        assert!(decode(&truncated).is_err());
    }

    #[test]
    fn hex_dump_splits_header_from_records() {
        let image = image();
        let (header, records) = decode(&image).unwrap();
        assert_eq!(header.sensor_count, 1);
        assert_eq!(records.len(), 1);

        let lines = hex_lines(&image);
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("header  46554600"));
        assert_eq!(lines[1], "000018  01696d755f706974636800");
    }
}
