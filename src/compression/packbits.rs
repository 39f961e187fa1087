//! PackBits compression
//!
//! PackBits is a simple run-length encoding scheme used in TIFF files.

use crate::error::{Error, Result};

/// Longest run or literal a single header byte can describe
const MAX_RUN: usize = 128;

/// Compresses data with PackBits
///
/// Runs of two or more equal bytes become a repeat record; everything else is
/// emitted as literal records of up to 128 bytes.
pub fn compress(data: &[u8]) -> Vec<u8> {
    let mut output = Vec::with_capacity(data.len() + data.len() / MAX_RUN + 1);
    let mut pos = 0;

    while pos < data.len() {
        let mut run = 1;
        while pos + run < data.len() && run < MAX_RUN && data[pos + run] == data[pos] {
            run += 1;
        }

        if run >= 2 {
            output.push((1 - run as isize) as i8 as u8);
            output.push(data[pos]);
            pos += run;
            continue;
        }

        let start = pos;
        pos += 1;
        while pos < data.len() && pos - start < MAX_RUN {
            if pos + 1 < data.len() && data[pos] == data[pos + 1] {
                break;
            }
            pos += 1;
        }
        output.push((pos - start - 1) as u8);
        output.extend_from_slice(&data[start..pos]);
    }

    output
}

/// Decompresses PackBits compressed data
///
/// PackBits encoding:
/// - If header >= 0: copy next (header + 1) literal bytes
/// - If header < 0 and != -128: repeat next byte (1 - header) times
/// - If header == -128: no operation (skip)
pub fn decompress(data: &[u8]) -> Result<Vec<u8>> {
    let mut output = Vec::new();
    let mut pos = 0;

    while pos < data.len() {
        let header = data[pos] as i8;
        pos += 1;

        match header {
            -128 => continue,

            0..=127 => {
                let count = (header as usize) + 1;

                if pos + count > data.len() {
                    return Err(Error::InvalidFormat(
                        "PackBits: Insufficient literal bytes".to_string()
                    ));
                }

                output.extend_from_slice(&data[pos..pos + count]);
                pos += count;
            }

            -127..=-1 => {
                if pos >= data.len() {
                    return Err(Error::InvalidFormat(
                        "PackBits: Missing run byte".to_string()
                    ));
                }

                let count = (1 - header as isize) as usize;
                output.resize(output.len() + count, data[pos]);
                pos += 1;
            }
        }
    }

    Ok(output)
}
