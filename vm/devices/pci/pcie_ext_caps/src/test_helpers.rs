// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::spec::ExtendedCapabilityId;

/// Fill seeds used by the round-trip tests.
pub const FILL_SEEDS: [u8; 4] = [0x00, 0x5a, 0xa5, 0xff];

/// Routes `tracing` output to the test harness. Safe to call from every test.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_test_writer()
        .try_init();
}

/// A `len`-byte buffer of non-repeating noise seeded by `seed`, with the
/// Capability ID field overwritten by `id`.
///
/// The version, next pointer, and every reserved bit carry noise.
pub fn patterned(id: ExtendedCapabilityId, len: usize, seed: u8) -> Vec<u8> {
    let mut buf: Vec<u8> = (0..len)
        .map(|i| (i as u8).wrapping_mul(0x3b).wrapping_add(0x11) ^ seed)
        .collect();
    let id = id.0.to_le_bytes();
    let n = len.min(id.len());
    buf[..n].copy_from_slice(&id[..n]);
    buf
}
