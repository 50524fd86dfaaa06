//! XMODEM receiver tests against a scripted sender

mod common;

use std::io::{self, Write};

use common::ScriptedLink;
use sipkip_firmware::xmodem::{
    checksum, crc16_ccitt, receive, XmodemConfig, XmodemError, ACK, CAN, CRC_REQUEST, EOT, NAK, SOH, STX,
};

#[derive(Clone, Copy)]
enum Check {
    Crc,
    Sum,
    BadCrc,
}

fn block(number: u8, data: &[u8], check: Check) -> Vec<Option<u8>> {
    let header = if data.len() == 1024 { STX } else { SOH };
    let mut bytes = vec![header, number, !number];
    bytes.extend_from_slice(data);
    match check {
        Check::Crc => bytes.extend_from_slice(&crc16_ccitt(data).to_be_bytes()),
        Check::BadCrc => bytes.extend_from_slice(&(crc16_ccitt(data) ^ 1).to_be_bytes()),
        Check::Sum => bytes.push(checksum(data)),
    }
    bytes.into_iter().map(Some).collect()
}

fn payload(fill: u8) -> Vec<u8> {
    (0..128).map(|i| fill.wrapping_add(i as u8)).collect()
}

fn run(script: Vec<Option<u8>>) -> (Result<u64, XmodemError>, Vec<u8>, Vec<u8>) {
    run_with(script, &XmodemConfig::DEFAULT)
}

fn run_with(script: Vec<Option<u8>>, config: &XmodemConfig) -> (Result<u64, XmodemError>, Vec<u8>, Vec<u8>) {
    let mut link = ScriptedLink::new(script);
    let mut file = Vec::new();
    let result = receive(&mut link, &mut file, config);
    (result, file, link.output)
}

#[test]
fn test_crc_transfer() {
    let a = payload(0);
    let b = payload(100);
    let mut script = block(1, &a, Check::Crc);
    script.extend(block(2, &b, Check::Crc));
    script.push(Some(EOT));

    let (result, file, sent) = run(script);

    assert_eq!(result.unwrap(), 256);
    assert_eq!(file, [a, b].concat());
    assert_eq!(sent, vec![CRC_REQUEST, ACK, ACK, ACK]);
}

#[test]
fn test_one_k_blocks() {
    let data: Vec<u8> = (0..1024).map(|i| (i % 251) as u8).collect();
    let mut script = block(1, &data, Check::Crc);
    script.push(Some(EOT));

    let (result, file, _) = run(script);

    assert_eq!(result.unwrap(), 1024);
    assert_eq!(file, data);
}

#[test]
fn test_checksum_fallback_after_silent_crc_requests() {
    let data = payload(7);
    let mut script = vec![None; 16];
    script.extend(block(1, &data, Check::Sum));
    script.push(Some(EOT));

    let (result, file, sent) = run(script);

    assert_eq!(result.unwrap(), 128);
    assert_eq!(file, data);
    let mut expected = vec![CRC_REQUEST; 16];
    expected.extend([NAK, ACK, ACK]);
    assert_eq!(sent, expected);
}

#[test]
fn test_duplicate_block_acked_not_stored() {
    let a = payload(1);
    let b = payload(2);
    let mut script = block(1, &a, Check::Crc);
    script.extend(block(1, &a, Check::Crc));
    script.extend(block(2, &b, Check::Crc));
    script.push(Some(EOT));

    let (result, file, sent) = run(script);

    assert_eq!(result.unwrap(), 256);
    assert_eq!(file, [a, b].concat());
    assert_eq!(sent, vec![CRC_REQUEST, ACK, ACK, ACK, ACK]);
}

#[test]
fn test_bad_crc_is_nakked_then_retried() {
    let data = payload(9);
    let mut script = block(1, &data, Check::BadCrc);
    // Line goes quiet before the retransmission
    script.push(None);
    script.extend(block(1, &data, Check::Crc));
    script.push(Some(EOT));

    let (result, file, sent) = run(script);

    assert_eq!(result.unwrap(), 128);
    assert_eq!(file, data);
    assert_eq!(sent, vec![CRC_REQUEST, NAK, ACK, ACK]);
}

#[test]
fn test_out_of_sequence_block_rejected() {
    let data = payload(3);
    let mut script = block(3, &data, Check::Crc);
    script.push(None);
    script.extend(block(1, &data, Check::Crc));
    script.push(Some(EOT));

    let (result, file, sent) = run(script);

    assert_eq!(result.unwrap(), 128);
    assert_eq!(file, data);
    assert_eq!(sent, vec![CRC_REQUEST, NAK, ACK, ACK]);
}

#[test]
fn test_sender_cancel() {
    let mut script = block(1, &payload(0), Check::Crc);
    script.extend([Some(CAN), Some(CAN)]);

    let (result, _, sent) = run(script);

    assert!(matches!(result, Err(XmodemError::Cancelled)));
    assert_eq!(sent, vec![CRC_REQUEST, ACK, ACK]);
}

#[test]
fn test_silent_sender_is_sync_error() {
    let (result, file, sent) = run(Vec::new());

    assert!(matches!(result, Err(XmodemError::Sync)));
    assert!(file.is_empty());
    let mut expected = vec![CRC_REQUEST; 16];
    expected.extend([NAK; 16]);
    expected.extend([CAN; 3]);
    assert_eq!(sent, expected);
}

#[test]
fn test_block_size_change_aborts() {
    let mut script = block(1, &payload(0), Check::Crc);
    script.extend(block(2, &[5u8; 1024], Check::Crc));

    let (result, file, sent) = run(script);

    assert!(matches!(result, Err(XmodemError::BlockSizeChanged)));
    assert_eq!(file.len(), 128);
    assert!(sent.ends_with(&[CAN, CAN, CAN]));
}

#[test]
fn test_endless_duplicates_give_up() {
    let config = XmodemConfig {
        max_retransmit: 3,
        ..XmodemConfig::DEFAULT
    };
    let data = payload(0);
    let mut script = Vec::new();
    for _ in 0..4 {
        script.extend(block(1, &data, Check::Crc));
    }

    let (result, file, sent) = run_with(script, &config);

    assert!(matches!(result, Err(XmodemError::TooManyRetries)));
    assert_eq!(file, data);
    assert_eq!(sent, vec![CRC_REQUEST, ACK, ACK, ACK, CAN, CAN, CAN]);
}

#[test]
fn test_zero_retransmit_limit_allows_one_block() {
    let config = XmodemConfig {
        max_retransmit: 0,
        ..XmodemConfig::DEFAULT
    };
    let data = payload(0);
    let mut script = block(1, &data, Check::Crc);
    script.extend(block(1, &data, Check::Crc));

    let (result, file, sent) = run_with(script, &config);

    assert!(matches!(result, Err(XmodemError::TooManyRetries)));
    assert_eq!(file, data);
    assert_eq!(sent, vec![CRC_REQUEST, ACK, CAN, CAN, CAN]);
}

#[test]
fn test_zero_retransmit_limit_with_repeat_of_block_zero() {
    let config = XmodemConfig {
        max_retransmit: 0,
        ..XmodemConfig::DEFAULT
    };
    // Block 0 reads as a repeat of the block before the first one
    let (result, file, sent) = run_with(block(0, &payload(0), Check::Crc), &config);

    assert!(matches!(result, Err(XmodemError::TooManyRetries)));
    assert!(file.is_empty());
    assert_eq!(sent, vec![CRC_REQUEST, CAN, CAN, CAN]);
}

struct FullDisk;

impl Write for FullDisk {
    fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
        Err(io::Error::new(io::ErrorKind::Other, "no space left"))
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[test]
fn test_store_failure_reported() {
    let mut link = ScriptedLink::new(block(1, &payload(0), Check::Crc));
    let result = receive(&mut link, &mut FullDisk, &XmodemConfig::DEFAULT);
    assert!(matches!(result, Err(XmodemError::Store(_))));
}
