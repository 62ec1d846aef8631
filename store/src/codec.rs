// Copyright 2019-2020 PolkaX Authors. Licensed under GPL-3.0.

//! MessagePack framing helpers shared by the persistent collection payloads.
//!
//! Readers work over a `&mut &[u8]` cursor so that callers can check for
//! trailing bytes once the payload is fully decoded.

use rmp::decode;
use rmp::encode;

use crate::error::CodecError;

/// Encode a list of byte strings as one MessagePack array of bins.
pub fn encode_bin_array(items: &[Vec<u8>]) -> Vec<u8> {
    let mut buf = Vec::new();
    encode::write_array_len(&mut buf, items.len() as u32).unwrap();
    for item in items {
        encode::write_bin(&mut buf, item).unwrap();
    }
    buf
}

/// Decode a MessagePack array of bins, rejecting trailing bytes.
pub fn decode_bin_array(payload: &[u8]) -> Result<Vec<Vec<u8>>, CodecError> {
    let mut rd = payload;
    let len = read_array_len(&mut rd)?;
    let mut items = Vec::with_capacity(len);
    for _ in 0..len {
        items.push(read_bin(&mut rd)?);
    }
    expect_end(rd)?;
    Ok(items)
}

/// Read an array header.
pub fn read_array_len(rd: &mut &[u8]) -> Result<usize, CodecError> {
    let len = decode::read_array_len(rd).map_err(|e| CodecError::Read(e.to_string()))?;
    Ok(len as usize)
}

/// Read a map header.
pub fn read_map_len(rd: &mut &[u8]) -> Result<usize, CodecError> {
    let len = decode::read_map_len(rd).map_err(|e| CodecError::Read(e.to_string()))?;
    Ok(len as usize)
}

/// Read one bin item.
pub fn read_bin(rd: &mut &[u8]) -> Result<Vec<u8>, CodecError> {
    let len = decode::read_bin_len(rd).map_err(|e| CodecError::Read(e.to_string()))?;
    read_raw(rd, len as usize)
}

/// Read one str item.
pub fn read_str(rd: &mut &[u8]) -> Result<String, CodecError> {
    let len = decode::read_str_len(rd).map_err(|e| CodecError::Read(e.to_string()))?;
    let raw = read_raw(rd, len as usize)?;
    String::from_utf8(raw).map_err(|e| CodecError::Read(e.to_string()))
}

/// Read one unsigned integer item.
pub fn read_uint(rd: &mut &[u8]) -> Result<u64, CodecError> {
    decode::read_int(rd).map_err(|e| CodecError::Read(e.to_string()))
}

/// Take `len` raw bytes off the cursor.
pub fn read_raw(rd: &mut &[u8], len: usize) -> Result<Vec<u8>, CodecError> {
    if rd.len() < len {
        return Err(CodecError::Read(format!(
            "truncated input: need {} bytes, have {}",
            len,
            rd.len()
        )));
    }
    let (head, tail) = rd.split_at(len);
    let out = head.to_vec();
    *rd = tail;
    Ok(out)
}

/// Fail if any bytes are left on the cursor.
pub fn expect_end(rd: &[u8]) -> Result<(), CodecError> {
    if rd.is_empty() {
        Ok(())
    } else {
        Err(CodecError::TrailingBytes(rd.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bin_array_bytes() {
        // fixarray(2), bin8(1) 0xab, bin8(0)
        let encoded = encode_bin_array(&[vec![0xab], vec![]]);
        assert_eq!(encoded, vec![0x92, 0xc4, 0x01, 0xab, 0xc4, 0x00]);
        let decoded = decode_bin_array(&encoded).unwrap();
        assert_eq!(decoded, vec![vec![0xab], vec![]]);
    }

    #[test]
    fn test_empty_bin_array() {
        let encoded = encode_bin_array(&[]);
        assert_eq!(encoded, vec![0x90]);
        assert!(decode_bin_array(&encoded).unwrap().is_empty());
    }

    #[test]
    fn test_trailing_bytes_rejected() {
        let mut encoded = encode_bin_array(&[vec![1, 2]]);
        encoded.push(0x00);
        match decode_bin_array(&encoded) {
            Err(CodecError::TrailingBytes(1)) => {}
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_truncated_input_rejected() {
        let encoded = encode_bin_array(&[vec![1, 2, 3]]);
        assert!(decode_bin_array(&encoded[..encoded.len() - 1]).is_err());
    }

    #[test]
    fn test_wrong_header_kind_rejected() {
        // A map header where an array is expected.
        assert!(decode_bin_array(&[0x81, 0x00, 0x00]).is_err());
    }

    #[test]
    fn test_str_and_uint_roundtrip() {
        let mut buf = Vec::new();
        rmp::encode::write_str(&mut buf, "Size").unwrap();
        rmp::encode::write_uint(&mut buf, 300).unwrap();
        let mut rd = buf.as_slice();
        assert_eq!(read_str(&mut rd).unwrap(), "Size");
        assert_eq!(read_uint(&mut rd).unwrap(), 300);
        expect_end(rd).unwrap();
    }
}
