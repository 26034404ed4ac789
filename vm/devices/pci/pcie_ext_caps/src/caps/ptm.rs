// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! PTM extended capability.

use super::Error;
use super::ExtendedCapability;
use super::read_wire;
use crate::spec::ExtendedCapabilityId;
use crate::spec::header::ExtendedCapabilityHeader;
use crate::spec::ptm::PTM_SIZE;
use crate::spec::ptm::PTM_VER1;
use crate::spec::ptm::PtmCapability;
use crate::spec::ptm::PtmControl;
use zerocopy::FromBytes;
use zerocopy::Immutable;
use zerocopy::IntoBytes;
use zerocopy::KnownLayout;
use zerocopy::Unaligned;
use zerocopy::byteorder::little_endian::U32;

#[repr(C)]
#[derive(FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
struct PtmWire {
    header: U32,
    capability: U32,
    control: U32,
}

static_assertions::const_assert_eq!(size_of::<PtmWire>(), PTM_SIZE);

/// The PTM Extended Capability structure.
///
/// Granularity fields are left in their encoded form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PtmExtendedCapability {
    /// Extended capability header.
    pub header: ExtendedCapabilityHeader,
    /// PTM Capability register.
    pub capability: PtmCapability,
    /// PTM Control register.
    pub control: PtmControl,
}

impl PtmExtendedCapability {
    /// A version 1 structure with every register cleared.
    pub const fn new() -> Self {
        Self {
            header: ExtendedCapabilityHeader::for_capability(ExtendedCapabilityId::PTM, PTM_VER1),
            capability: PtmCapability::new(),
            control: PtmControl::new(),
        }
    }

    /// The encoded structure.
    pub fn to_bytes(&self) -> [u8; PTM_SIZE] {
        zerocopy::transmute!(self.to_wire())
    }

    fn to_wire(&self) -> PtmWire {
        PtmWire {
            header: U32::new(self.header.into_bits()),
            capability: U32::new(self.capability.into_bits()),
            control: U32::new(self.control.into_bits()),
        }
    }
}

impl ExtendedCapability for PtmExtendedCapability {
    const ID: ExtendedCapabilityId = ExtendedCapabilityId::PTM;
    const SIZE: usize = PTM_SIZE;

    fn header(&self) -> ExtendedCapabilityHeader {
        self.header
    }

    fn decode(bytes: &[u8]) -> Result<Self, Error> {
        let wire = read_wire::<Self, PtmWire>(bytes, |w| w.header)?;
        Ok(Self {
            header: ExtendedCapabilityHeader::from_bits(wire.header.get()),
            capability: PtmCapability::from_bits(wire.capability.get()),
            control: PtmControl::from_bits(wire.control.get()),
        })
    }

    fn encode(&self) -> Vec<u8> {
        self.to_wire().as_bytes().to_vec()
    }
}
