//! LZW compression
//!
//! TIFF flavour of LZW: codes are packed most significant bit first, start at
//! 9 bits and grow to 12, and the code width changes one code early. Code 256
//! clears the table and 257 ends the stream.

use std::collections::HashMap;

use crate::error::{Error, Result};

const CLEAR_CODE: u16 = 256;
const EOI_CODE: u16 = 257;
const FIRST_CODE: u16 = 258;
const MIN_BITS: u8 = 9;
const MAX_BITS: u8 = 12;
/// Once the next free code reaches this value the encoder clears the table
const TABLE_FULL: u16 = 4094;

/// Compresses data with TIFF LZW
pub fn compress(data: &[u8]) -> Vec<u8> {
    LzwEncoder::new().encode(data)
}

/// Decompresses LZW compressed data
pub fn decompress(data: &[u8]) -> Result<Vec<u8>> {
    LzwDecoder::new().decode(data)
}

struct LzwEncoder {
    table: HashMap<(u16, u8), u16>,
    next_code: u16,
    code_size: u8,
    writer: BitWriter,
}

impl LzwEncoder {
    fn new() -> Self {
        Self {
            table: HashMap::new(),
            next_code: FIRST_CODE,
            code_size: MIN_BITS,
            writer: BitWriter::new(),
        }
    }

    fn encode(mut self, data: &[u8]) -> Vec<u8> {
        self.writer.write(CLEAR_CODE, self.code_size);

        let mut iter = data.iter();
        let Some(&first) = iter.next() else {
            self.writer.write(EOI_CODE, self.code_size);
            return self.writer.finish();
        };

        let mut prefix = first as u16;
        for &byte in iter {
            if let Some(&code) = self.table.get(&(prefix, byte)) {
                prefix = code;
                continue;
            }
            self.writer.write(prefix, self.code_size);
            self.table.insert((prefix, byte), self.next_code);
            self.advance();
            prefix = byte as u16;
        }

        self.writer.write(prefix, self.code_size);
        self.advance();
        self.writer.write(EOI_CODE, self.code_size);
        self.writer.finish()
    }

    /// Counts one more table entry, growing the code width or clearing the
    /// table as needed
    fn advance(&mut self) {
        self.next_code += 1;
        if self.next_code == TABLE_FULL {
            self.writer.write(CLEAR_CODE, self.code_size);
            self.table.clear();
            self.next_code = FIRST_CODE;
            self.code_size = MIN_BITS;
        } else if self.next_code == 1 << self.code_size && self.code_size < MAX_BITS {
            self.code_size += 1;
        }
    }
}

/// LZW decoder
struct LzwDecoder {
    dictionary: Vec<Vec<u8>>,
}

impl LzwDecoder {
    fn new() -> Self {
        let mut dictionary = Vec::with_capacity(4096);
        for i in 0..256 {
            dictionary.push(vec![i as u8]);
        }
        // clear and end-of-information never hold data
        dictionary.push(Vec::new());
        dictionary.push(Vec::new());
        Self { dictionary }
    }

    fn next_code(&self) -> usize {
        self.dictionary.len()
    }

    fn decode(&mut self, data: &[u8]) -> Result<Vec<u8>> {
        let mut output = Vec::new();
        let mut reader = BitReader::new(data);
        let mut code_size = MIN_BITS;
        let mut previous_code: Option<u16> = None;

        while let Some(code) = reader.read_bits(code_size) {
            if code == EOI_CODE {
                break;
            }

            if code == CLEAR_CODE {
                self.reset();
                code_size = MIN_BITS;
                previous_code = None;
                continue;
            }

            let entry = self.get_entry(code as usize, previous_code)?;
            output.extend_from_slice(&entry);

            if let Some(prev) = previous_code {
                self.add_entry(prev as usize, entry[0]);
                if self.next_code() + 1 == 1 << code_size && code_size < MAX_BITS {
                    code_size += 1;
                }
            }

            previous_code = Some(code);
        }

        Ok(output)
    }

    fn get_entry(&self, code: usize, previous: Option<u16>) -> Result<Vec<u8>> {
        if code < self.next_code() && code != CLEAR_CODE as usize && code != EOI_CODE as usize {
            Ok(self.dictionary[code].clone())
        } else if code == self.next_code() {
            match previous {
                Some(prev) => {
                    let mut entry = self.dictionary[prev as usize].clone();
                    entry.push(entry[0]);
                    Ok(entry)
                }
                None => Err(Error::InvalidFormat("Invalid LZW sequence".to_string())),
            }
        } else {
            Err(Error::InvalidFormat(format!("Invalid LZW code: {}", code)))
        }
    }

    fn add_entry(&mut self, previous_code: usize, first_byte: u8) {
        if self.next_code() < 4096 {
            let mut entry = self.dictionary[previous_code].clone();
            entry.push(first_byte);
            self.dictionary.push(entry);
        }
    }

    fn reset(&mut self) {
        self.dictionary.truncate(FIRST_CODE as usize);
    }
}

/// Packs variable-length codes, most significant bit first
struct BitWriter {
    out: Vec<u8>,
    acc: u32,
    bits: u8,
}

impl BitWriter {
    fn new() -> Self {
        Self {
            out: Vec::new(),
            acc: 0,
            bits: 0,
        }
    }

    fn write(&mut self, code: u16, width: u8) {
        self.acc = (self.acc << width) | code as u32;
        self.bits += width;
        while self.bits >= 8 {
            self.bits -= 8;
            self.out.push((self.acc >> self.bits) as u8);
        }
        self.acc &= (1 << self.bits) - 1;
    }

    fn finish(mut self) -> Vec<u8> {
        if self.bits > 0 {
            self.out.push((self.acc << (8 - self.bits)) as u8);
        }
        self.out
    }
}

/// Reads variable-length codes, most significant bit first
struct BitReader<'a> {
    data: &'a [u8],
    byte_index: usize,
    bit_offset: u8,
}

impl<'a> BitReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            byte_index: 0,
            bit_offset: 0,
        }
    }

    fn read_bits(&mut self, count: u8) -> Option<u16> {
        if count > 16 || count == 0 {
            return None;
        }

        let mut result = 0u16;
        let mut bits_read = 0u8;

        while bits_read < count {
            if self.byte_index >= self.data.len() {
                return None;
            }

            let available_bits = 8 - self.bit_offset;
            let bits_to_read = available_bits.min(count - bits_read);
            let shift = available_bits - bits_to_read;
            let mask = ((1u16 << bits_to_read) - 1) as u8;
            let bits = (self.data[self.byte_index] >> shift) & mask;

            result = (result << bits_to_read) | bits as u16;
            bits_read += bits_to_read;
            self.bit_offset += bits_to_read;

            if self.bit_offset >= 8 {
                self.bit_offset = 0;
                self.byte_index += 1;
            }
        }

        Some(result)
    }
}
