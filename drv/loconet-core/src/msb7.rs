// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Packs/unpacks the high bit of up to seven data bytes into one extra
//! byte, producing the 7-bit-clean wire form Loconet requires for any
//! payload that needs to carry full-width values (LNCV reads and writes
//! in particular, since a 16-bit value's high byte routinely sets bit 7).

/// Clears bit 7 of each of `bytes` (at most seven), folding the cleared
/// bits into the bit-`i` position of the returned byte.
pub fn pack(bytes: &mut [u8]) -> u8 {
    debug_assert!(bytes.len() <= 7);
    let mut msb = 0u8;
    for (i, b) in bytes.iter_mut().enumerate() {
        if *b & 0x80 != 0 {
            msb |= 1 << i;
            *b &= 0x7F;
        }
    }
    msb
}

/// Restores bit 7 of each of `bytes` from `msb`, the complement of `pack`.
pub fn unpack(bytes: &mut [u8], msb: u8) {
    debug_assert!(bytes.len() <= 7);
    for (i, b) in bytes.iter_mut().enumerate() {
        if msb & (1 << i) != 0 {
            *b |= 0x80;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pack_then_unpack_round_trips() {
        let mut bytes = [0x80u8, 0x01, 0xFF, 0x00, 0x7F, 0x80, 0x80];
        let original = bytes;
        let msb = pack(&mut bytes);
        assert!(bytes.iter().all(|b| b & 0x80 == 0));
        unpack(&mut bytes, msb);
        assert_eq!(bytes, original);
    }

    #[test]
    fn clean_bytes_produce_zero_msb() {
        let mut bytes = [0x01u8, 0x02, 0x03];
        assert_eq!(pack(&mut bytes), 0);
    }
}
