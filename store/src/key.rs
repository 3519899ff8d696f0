//! Key encoding helpers.
//!
//! Composite keys length-prefix every component, so the encoding of the
//! first component of a composite key is always a prefix of the full key
//! and prefix scans never match a longer, different first component.

use tradefin_types::{Address, DocHash};

/// Big-endian id key (sorts numerically).
pub fn id(id: u64) -> Vec<u8> {
    id.to_be_bytes().to_vec()
}

pub fn address(addr: &Address) -> Vec<u8> {
    addr.as_bytes().to_vec()
}

pub fn doc(hash: &DocHash) -> Vec<u8> {
    hash.as_bytes().to_vec()
}

pub fn text(s: &str) -> Vec<u8> {
    s.as_bytes().to_vec()
}

/// Length-prefixed concatenation of `parts`.
pub fn compose(parts: &[&[u8]]) -> Vec<u8> {
    let len: usize = parts.iter().map(|p| p.len() + 2).sum();
    let mut out = Vec::with_capacity(len);
    for part in parts {
        let n = u16::try_from(part.len()).unwrap_or(u16::MAX);
        out.extend_from_slice(&n.to_be_bytes());
        out.extend_from_slice(&part[..n as usize]);
    }
    out
}
