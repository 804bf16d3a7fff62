//! Pure IPv4 CIDR prefix arithmetic.
//!
//! Everything here is a pure function over a 32-bit base address plus a
//! prefix length in `0..=32`. No I/O, no async, no knowledge of pools or
//! accounts — just the math the rest of CloudPAM builds on.
#![forbid(unsafe_code)]

use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum CidrError {
    #[error("not a valid IPv4 CIDR: {0}")]
    Malformed(String),
    #[error("prefix length {0} out of range 0..=32")]
    PrefixOutOfRange(u8),
    #[error("host bits set: {0} is not the canonical network address for /{1}")]
    NotCanonical(String, u8),
    #[error("subdivide target length {new_len} must be greater than source length {base_len} and at most 32")]
    InvalidSubdivide { base_len: u8, new_len: u8 },
}

/// An IPv4 prefix: a 32-bit base address plus a prefix length.
///
/// `base` always holds the address exactly as parsed; call [`Cidr::canonical`]
/// to mask off host bits when canonical form is required.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Cidr {
    base: u32,
    bits: u8,
}

impl Cidr {
    /// Parse `a.b.c.d/n`. Rejects non-canonical forms (host bits set)
    /// unless `normalize` is true, in which case the network address is
    /// computed from the input.
    pub fn parse(s: &str, normalize: bool) -> Result<Self, CidrError> {
        let (addr_part, len_part) = s
            .split_once('/')
            .ok_or_else(|| CidrError::Malformed(s.to_owned()))?;

        let addr = Ipv4Addr::from_str(addr_part)
            .map_err(|_| CidrError::Malformed(s.to_owned()))?;
        let bits: u8 = len_part
            .parse()
            .map_err(|_| CidrError::Malformed(s.to_owned()))?;
        if bits > 32 {
            return Err(CidrError::PrefixOutOfRange(bits));
        }

        let base = u32::from(addr);
        let masked = mask_base(base, bits);

        if !normalize && masked != base {
            return Err(CidrError::NotCanonical(addr_part.to_owned(), bits));
        }

        Ok(Self { base: masked, bits })
    }

    #[must_use]
    pub fn new_unchecked(base: u32, bits: u8) -> Self {
        Self {
            base: mask_base(base, bits),
            bits,
        }
    }

    #[must_use]
    pub fn base(&self) -> u32 {
        self.base
    }

    #[must_use]
    pub fn prefix_len(&self) -> u8 {
        self.bits
    }

    /// Returns `self` with host bits masked to zero. `parse(..., true)`
    /// already does this; this helper exists for values built elsewhere.
    #[must_use]
    pub fn canonical(&self) -> Self {
        Self {
            base: mask_base(self.base, self.bits),
            bits: self.bits,
        }
    }

    #[must_use]
    pub fn is_canonical(&self) -> bool {
        mask_base(self.base, self.bits) == self.base
    }

    /// Total number of addresses covered, `2^(32 - bits)`.
    #[must_use]
    pub fn host_count(&self) -> u64 {
        if self.bits >= 32 {
            1
        } else {
            1u64 << (32 - self.bits)
        }
    }

    #[must_use]
    pub fn network_mask(&self) -> u32 {
        prefix_mask(self.bits)
    }

    /// Broadcast/last address of the block.
    #[must_use]
    pub fn last_address(&self) -> u32 {
        self.base | !self.network_mask()
    }

    #[must_use]
    pub fn contains_address(&self, addr: u32) -> bool {
        (addr & self.network_mask()) == self.base
    }

    pub fn parent_candidates(&self, min_len: u8) -> impl Iterator<Item = Cidr> + '_ {
        let min_len = min_len.min(self.bits);
        (min_len..=self.bits)
            .rev()
            .map(move |len| Cidr::new_unchecked(self.base, len))
    }
}

impl fmt::Display for Cidr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", Ipv4Addr::from(self.base), self.bits)
    }
}

impl FromStr for Cidr {
    type Err = CidrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Cidr::parse(s, false)
    }
}

fn prefix_mask(bits: u8) -> u32 {
    if bits == 0 {
        0
    } else if bits >= 32 {
        u32::MAX
    } else {
        u32::MAX << (32 - bits)
    }
}

fn mask_base(base: u32, bits: u8) -> u32 {
    base & prefix_mask(bits)
}

/// `true` iff `outer` fully contains `inner` (including `outer == inner`).
#[must_use]
pub fn contains(outer: &Cidr, inner: &Cidr) -> bool {
    outer.bits <= inner.bits && (inner.base & outer.network_mask()) == outer.base
}

/// `true` iff the two prefixes intersect at all (one contains the other,
/// including equality).
#[must_use]
pub fn overlaps(a: &Cidr, b: &Cidr) -> bool {
    contains(a, b) || contains(b, a)
}

/// Ordered sequence of child prefixes produced by subdividing `prefix` down
/// to `new_len`. Refuses when `new_len <= prefix.bits` or `new_len > 32`.
pub fn subdivide(prefix: &Cidr, new_len: u8) -> Result<Vec<Cidr>, CidrError> {
    if new_len <= prefix.bits || new_len > 32 {
        return Err(CidrError::InvalidSubdivide {
            base_len: prefix.bits,
            new_len,
        });
    }
    let count = 1u64 << (new_len - prefix.bits);
    let step = if new_len >= 32 { 1u32 } else { 1u32 << (32 - new_len) };
    Ok((0..count)
        .map(|i| {
            #[allow(clippy::cast_possible_truncation)]
            let offset = (i as u32).wrapping_mul(step);
            Cidr::new_unchecked(prefix.base.wrapping_add(offset), new_len)
        })
        .collect())
}

/// One deterministic page of `subdivide(prefix, new_len)`, ordered by base
/// address, plus the total child count.
#[must_use]
pub fn enumerate(prefix: &Cidr, new_len: u8, page: u32, page_size: u32) -> (Vec<Cidr>, u64) {
    let page_size = page_size.max(1);
    let total = if new_len <= prefix.bits || new_len > 32 {
        0
    } else {
        1u64 << (new_len - prefix.bits)
    };
    if total == 0 {
        return (Vec::new(), 0);
    }

    let step = if new_len >= 32 { 1u32 } else { 1u32 << (32 - new_len) };
    let start_index = u64::from(page.saturating_sub(1)) * u64::from(page_size);
    if start_index >= total {
        return (Vec::new(), total);
    }
    let end_index = (start_index + u64::from(page_size)).min(total);

    let items = (start_index..end_index)
        .map(|i| {
            #[allow(clippy::cast_possible_truncation)]
            let offset = (i as u32).wrapping_mul(step);
            Cidr::new_unchecked(prefix.base.wrapping_add(offset), new_len)
        })
        .collect();
    (items, total)
}

/// The reserved IPv4 ranges pool CIDRs may never fall within, per the
/// validation policy: 0.0.0.0/8, 127.0.0.0/8, 169.254.0.0/16, 224.0.0.0/4,
/// 240.0.0.0/4, 255.255.255.255/32.
#[must_use]
pub fn reserved_ranges() -> &'static [Cidr] {
    const RANGES: &[(u32, u8)] = &[
        (0x0000_0000, 8),       // 0.0.0.0/8
        (0x7F00_0000, 8),       // 127.0.0.0/8
        (0xA9FE_0000, 16),      // 169.254.0.0/16
        (0xE000_0000, 4),       // 224.0.0.0/4
        (0xF000_0000, 4),       // 240.0.0.0/4
        (0xFFFF_FFFF, 32),      // 255.255.255.255/32
    ];
    static CELL: std::sync::OnceLock<Vec<Cidr>> = std::sync::OnceLock::new();
    CELL.get_or_init(|| {
        RANGES
            .iter()
            .map(|(base, bits)| Cidr::new_unchecked(*base, *bits))
            .collect()
    })
}

#[must_use]
pub fn is_reserved(cidr: &Cidr) -> bool {
    reserved_ranges().iter().any(|r| overlaps(r, cidr))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_canonical() {
        let c = Cidr::parse("10.0.0.0/8", false).unwrap();
        assert_eq!(c.to_string(), "10.0.0.0/8");
    }

    #[test]
    fn parse_rejects_host_bits_unless_normalized() {
        assert!(Cidr::parse("10.0.0.1/8", false).is_err());
        let c = Cidr::parse("10.0.0.1/8", true).unwrap();
        assert_eq!(c.to_string(), "10.0.0.0/8");
    }

    #[test]
    fn parse_rejects_non_ipv4() {
        assert!(Cidr::parse("::1/64", false).is_err());
        assert!(Cidr::parse("not-an-ip/8", false).is_err());
        assert!(Cidr::parse("10.0.0.0/33", false).is_err());
    }

    #[test]
    fn contains_basic() {
        let supernet = Cidr::parse("10.0.0.0/8", false).unwrap();
        let child = Cidr::parse("10.1.0.0/16", false).unwrap();
        assert!(contains(&supernet, &child));
        assert!(!contains(&child, &supernet));
        assert!(contains(&supernet, &supernet));
    }

    #[test]
    fn overlaps_detects_containment_both_ways() {
        let a = Cidr::parse("10.1.0.0/16", false).unwrap();
        let b = Cidr::parse("10.1.128.0/17", false).unwrap();
        assert!(overlaps(&a, &b));
        assert!(overlaps(&b, &a));

        let c = Cidr::parse("10.2.0.0/16", false).unwrap();
        assert!(!overlaps(&a, &c));
    }

    #[test]
    fn subdivide_produces_disjoint_children_contained_in_parent() {
        let parent = Cidr::parse("10.0.0.0/8", false).unwrap();
        let children = subdivide(&parent, 10).unwrap();
        assert_eq!(children.len(), 4);
        for c in &children {
            assert!(contains(&parent, c));
        }
        for i in 0..children.len() {
            for j in 0..children.len() {
                if i != j {
                    assert!(!overlaps(&children[i], &children[j]));
                }
            }
        }
    }

    #[test]
    fn subdivide_refuses_invalid_lengths() {
        let parent = Cidr::parse("10.0.0.0/16", false).unwrap();
        assert!(subdivide(&parent, 16).is_err());
        assert!(subdivide(&parent, 8).is_err());
        assert!(subdivide(&parent, 33).is_err());
    }

    #[test]
    fn enumerate_is_paginated_and_stable() {
        let parent = Cidr::parse("10.0.0.0/8", false).unwrap();
        let (page1, total) = enumerate(&parent, 16, 1, 4);
        assert_eq!(total, 256);
        assert_eq!(page1.len(), 4);
        assert_eq!(page1[0].to_string(), "10.0.0.0/16");
        assert_eq!(page1[3].to_string(), "10.3.0.0/16");

        let (page2, _) = enumerate(&parent, 16, 2, 4);
        assert_eq!(page2[0].to_string(), "10.4.0.0/16");
    }

    #[test]
    fn enumerate_past_the_end_is_empty() {
        let parent = Cidr::parse("10.0.0.0/30", false).unwrap();
        let (items, total) = enumerate(&parent, 32, 10, 4);
        assert_eq!(total, 4);
        assert!(items.is_empty());
    }

    #[test]
    fn reserved_ranges_are_rejected() {
        assert!(is_reserved(&Cidr::parse("127.0.0.0/8", false).unwrap()));
        assert!(is_reserved(&Cidr::parse("169.254.0.0/16", false).unwrap()));
        assert!(is_reserved(&Cidr::parse("240.0.0.0/8", false).unwrap()));
        assert!(!is_reserved(&Cidr::parse("10.0.0.0/8", false).unwrap()));
    }

    #[test]
    fn host_count_matches_prefix_len() {
        assert_eq!(Cidr::parse("10.0.0.0/8", false).unwrap().host_count(), 16_777_216);
        assert_eq!(Cidr::parse("10.1.0.0/16", false).unwrap().host_count(), 65_536);
        assert_eq!(Cidr::parse("10.1.0.0/32", false).unwrap().host_count(), 1);
    }
}
