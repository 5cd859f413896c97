//! Bit-string genotypes and their decoding into node layouts.
//!
//! A genotype is read strictly left to right in fixed-width chunks: for
//! every free node, one chunk for x followed by one chunk for y. Each chunk
//! is an unsigned integer stored least-significant bit first, mapped into
//! the configured coordinate interval by [`normalize`].

use std::fmt;
use std::str::FromStr;

use rand::Rng;

use crate::config::{Interval, TrussConfig};
use crate::error::{Result, TrussError};
use crate::types::Point;

/// Fixed-length bit string encoding the free-node positions of a truss.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Genotype {
    bits: Vec<bool>,
}

impl Genotype {
    pub fn new(bits: Vec<bool>) -> Self {
        Self { bits }
    }

    /// All-zero genotype of the given length.
    pub fn zeros(len: usize) -> Self {
        Self {
            bits: vec![false; len],
        }
    }

    /// Uniformly random genotype, e.g. for seeding a population.
    pub fn random<R: Rng + ?Sized>(len: usize, rng: &mut R) -> Self {
        Self {
            bits: (0..len).map(|_| rng.gen::<bool>()).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.bits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    pub fn as_bits(&self) -> &[bool] {
        &self.bits
    }

    pub fn into_bits(self) -> Vec<bool> {
        self.bits
    }
}

impl From<Vec<bool>> for Genotype {
    fn from(bits: Vec<bool>) -> Self {
        Self::new(bits)
    }
}

impl FromStr for Genotype {
    type Err = TrussError;

    /// Parse a `0`/`1` string where the first character is bit 0.
    fn from_str(s: &str) -> Result<Self> {
        s.trim()
            .chars()
            .enumerate()
            .map(|(i, c)| match c {
                '0' => Ok(false),
                '1' => Ok(true),
                other => Err(TrussError::InvalidGenotype(format!(
                    "unexpected character {other:?} at position {i}"
                ))),
            })
            .collect::<Result<Vec<bool>>>()
            .map(Self::new)
    }
}

impl fmt::Display for Genotype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &bit in &self.bits {
            f.write_str(if bit { "1" } else { "0" })?;
        }
        Ok(())
    }
}

/// Read `width` bits starting at `start` as an LSB-first unsigned integer.
///
/// # Panics
/// Panics if the chunk runs past the end of `bits` or `width` exceeds 64.
pub fn decode_bits(bits: &[bool], start: usize, width: u32) -> u64 {
    assert!(width <= u64::BITS, "chunk width {width} exceeds 64 bits");
    let end = start + width as usize;
    assert!(
        end <= bits.len(),
        "chunk [{start}, {end}) runs past the {}-bit genotype",
        bits.len()
    );
    bits[start..end]
        .iter()
        .enumerate()
        .fold(0u64, |acc, (k, &bit)| acc | (u64::from(bit) << k))
}

/// Map a `width`-bit integer into `[lo, hi]` as `lo + raw / 2^width * (hi - lo)`.
pub fn normalize(raw: u64, width: u32, bounds: Interval) -> f64 {
    let scale = raw as f64 / 2f64.powi(width as i32);
    bounds.lo + scale * bounds.width()
}

/// Sequential fixed-width reader over a bit string.
#[derive(Debug)]
pub struct ChunkReader<'a> {
    bits: &'a [bool],
    offset: usize,
    width: u32,
}

impl<'a> ChunkReader<'a> {
    pub fn new(bits: &'a [bool], width: u32) -> Self {
        Self {
            bits,
            offset: 0,
            width,
        }
    }

    /// Decode the next chunk and advance.
    pub fn next_raw(&mut self) -> u64 {
        let raw = decode_bits(self.bits, self.offset, self.width);
        self.offset += self.width as usize;
        raw
    }

    /// Decode the next chunk normalized into `bounds`.
    pub fn next_in(&mut self, bounds: Interval) -> f64 {
        let raw = self.next_raw();
        normalize(raw, self.width, bounds)
    }

    pub fn offset(&self) -> usize {
        self.offset
    }
}

fn check_length(bits: &[bool], config: &TrussConfig) -> Result<()> {
    let expected = config.genotype_len();
    if bits.len() != expected {
        return Err(TrussError::GenotypeLength {
            expected,
            found: bits.len(),
        });
    }
    Ok(())
}

/// Decode free-node coordinates in free-node order, before support overrides.
pub fn decode_free_nodes(bits: &[bool], config: &TrussConfig) -> Result<Vec<Point>> {
    check_length(bits, config)?;
    let bounds = config.bounds();
    let mut reader = ChunkReader::new(bits, config.search().node_bits);
    let free = (0..config.num_free())
        .map(|_| {
            let x = reader.next_in(bounds.x);
            let y = reader.next_in(bounds.y);
            Point::new(x, y)
        })
        .collect();
    debug_assert_eq!(reader.offset(), bits.len());
    Ok(free)
}

/// Pin free support nodes to the ends of the span.
///
/// A positive decoded y is replaced by the support clamp; support A moves to
/// x = 0 and support B to x = span length. Supports that are fixed nodes keep
/// their configured position.
pub fn apply_support_overrides(nodes: &mut [Point], config: &TrussConfig) {
    let first_free = config.num_fixed();
    let supports = config.supports();
    let clamp = config.tolerances().support_y_clamp;

    for (index, x) in [(supports.a, 0.0), (supports.b, config.span_length())] {
        if index < first_free || index >= nodes.len() {
            continue;
        }
        let node = &mut nodes[index];
        if node.y > 0.0 {
            node.y = clamp;
        }
        node.x = x;
    }
}

/// Full node layout: fixed nodes, then decoded free nodes with support overrides.
pub fn decode_layout(bits: &[bool], config: &TrussConfig) -> Result<Vec<Point>> {
    let free = decode_free_nodes(bits, config)?;
    let mut nodes: Vec<Point> = config
        .fixed_nodes()
        .iter()
        .map(|fixed| Point::new(fixed.x, fixed.y))
        .collect();
    nodes.extend(free);
    apply_support_overrides(&mut nodes, config);
    Ok(nodes)
}
