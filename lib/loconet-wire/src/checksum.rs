// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! XOR checksum shared by every frame on the wire.

/// Returns `true` if `frame` (opcode .. checksum, inclusive) is valid: the
/// XOR of every byte, including the checksum itself, is `0xFF`.
pub fn verify(frame: &[u8]) -> bool {
    frame.iter().fold(0u8, |acc, &b| acc ^ b) == 0xFF
}

/// Computes the checksum byte to append to `frame` (opcode .. last payload
/// byte, checksum *not* included).
pub fn compute(frame_without_checksum: &[u8]) -> u8 {
    0xFF ^ frame_without_checksum.iter().fold(0u8, |acc, &b| acc ^ b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn computed_checksum_verifies() {
        let body = [0xB0u8, 0x15, 0x50];
        let cksum = compute(&body);
        let frame = [body[0], body[1], body[2], cksum];
        assert!(verify(&frame));
    }

    #[test]
    fn corrupted_byte_fails_verification() {
        let mut frame = [0xB0u8, 0x15, 0x50, 0];
        frame[3] = compute(&frame[..3]);
        frame[1] ^= 0x01;
        assert!(!verify(&frame));
    }
}
