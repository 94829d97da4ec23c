//! Hash helpers
//!
//! The host digest itself is computed by an external `HostHasher`; this
//! module only derives prefixes from it and provides the CRC32 used to
//! verify embedded snapshots.

/// Length, in hex characters, of the prefixes stored in a `HashPrefixSet`.
pub const HASH_PREFIX_LEN: usize = 8;

/// Leading `HASH_PREFIX_LEN` characters of a hex digest.
/// Shorter input is returned unchanged.
#[inline]
pub fn hash_prefix(hash_hex: &str) -> &str {
    match hash_hex.get(..HASH_PREFIX_LEN) {
        Some(prefix) => prefix,
        None => hash_hex,
    }
}

/// Compute CRC32 for snapshot integrity checking.
/// Uses the standard CRC32 polynomial (IEEE 802.3).
pub fn crc32(data: &[u8]) -> u32 {
    static CRC32_TABLE: [u32; 256] = {
        let mut table = [0u32; 256];
        let mut i = 0;
        while i < 256 {
            let mut c = i as u32;
            let mut j = 0;
            while j < 8 {
                c = if c & 1 != 0 {
                    0xedb88320 ^ (c >> 1)
                } else {
                    c >> 1
                };
                j += 1;
            }
            table[i] = c;
            i += 1;
        }
        table
    };

    let mut crc = 0xffffffff_u32;
    for &byte in data {
        crc = CRC32_TABLE[((crc ^ byte as u32) & 0xff) as usize] ^ (crc >> 8);
    }
    crc ^ 0xffffffff
}
