// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Pair kerning from the legacy `kern` table.
//!
//! Only horizontal format 0 subtables of the OpenType (version 0) layout are
//! read. Apple's version 1 layout and GPOS kerning are not.

use hashbrown::HashMap;

/// Kerning adjustments in design units, keyed by `(left, right)` glyph.
#[derive(Clone, Debug, Default)]
pub(crate) struct KernPairs {
    pairs: HashMap<(u16, u16), i16>,
}

impl KernPairs {
    /// Reads the pairs in `data`, the raw `kern` table. Malformed subtables
    /// end the scan; pairs read before them are kept.
    pub(crate) fn parse(data: &[u8]) -> Self {
        let mut pairs = HashMap::new();
        let mut reader = Reader { data, pos: 0 };
        let (Some(0), Some(count)) = (reader.u16(), reader.u16()) else {
            return Self { pairs };
        };
        for _ in 0..count {
            let start = reader.pos;
            let (Some(_version), Some(length), Some(coverage)) =
                (reader.u16(), reader.u16(), reader.u16())
            else {
                break;
            };
            let horizontal = coverage & 0x1 != 0;
            let minimum = coverage & 0x2 != 0;
            let cross_stream = coverage & 0x4 != 0;
            if coverage >> 8 == 0 && horizontal && !minimum && !cross_stream {
                let Some(n) = reader.u16() else { break };
                reader.pos += 6;
                for _ in 0..n {
                    let (Some(left), Some(right), Some(value)) =
                        (reader.u16(), reader.u16(), reader.i16())
                    else {
                        break;
                    };
                    pairs.insert((left, right), value);
                }
            }
            reader.pos = start + usize::from(length);
        }
        Self { pairs }
    }

    pub(crate) fn get(&self, left: u16, right: u16) -> i16 {
        self.pairs.get(&(left, right)).copied().unwrap_or(0)
    }

    pub(crate) fn len(&self) -> usize {
        self.pairs.len()
    }
}

struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl Reader<'_> {
    fn u16(&mut self) -> Option<u16> {
        let bytes = self.data.get(self.pos..self.pos + 2)?;
        self.pos += 2;
        Some(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    fn i16(&mut self) -> Option<i16> {
        self.u16().map(|v| i16::from_be_bytes(v.to_be_bytes()))
    }
}
