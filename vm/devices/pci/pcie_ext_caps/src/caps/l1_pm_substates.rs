// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! L1 PM Substates extended capability.

use super::Error;
use super::ExtendedCapability;
use super::read_wire;
use crate::spec::ExtendedCapabilityId;
use crate::spec::header::ExtendedCapabilityHeader;
use crate::spec::l1_pm_substates::L1_PM_SUBSTATES_SIZE;
use crate::spec::l1_pm_substates::L1_PM_SUBSTATES_VER1;
use crate::spec::l1_pm_substates::L1PmSubstatesCapabilities;
use crate::spec::l1_pm_substates::L1PmSubstatesControl1;
use crate::spec::l1_pm_substates::L1PmSubstatesControl2;
use zerocopy::FromBytes;
use zerocopy::Immutable;
use zerocopy::IntoBytes;
use zerocopy::KnownLayout;
use zerocopy::Unaligned;
use zerocopy::byteorder::little_endian::U32;

#[repr(C)]
#[derive(FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
struct L1PmSubstatesWire {
    header: U32,
    capabilities: U32,
    control1: U32,
    control2: U32,
}

static_assertions::const_assert_eq!(size_of::<L1PmSubstatesWire>(), L1_PM_SUBSTATES_SIZE);

/// The L1 PM Substates Extended Capability structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct L1PmSubstatesExtendedCapability {
    /// Extended capability header.
    pub header: ExtendedCapabilityHeader,
    /// L1 PM Substates Capabilities register.
    pub capabilities: L1PmSubstatesCapabilities,
    /// L1 PM Substates Control 1 register.
    pub control1: L1PmSubstatesControl1,
    /// L1 PM Substates Control 2 register.
    pub control2: L1PmSubstatesControl2,
}

impl L1PmSubstatesExtendedCapability {
    /// A version 1 structure with every register cleared.
    pub const fn new() -> Self {
        Self {
            header: ExtendedCapabilityHeader::for_capability(
                ExtendedCapabilityId::L1_PM_SUBSTATES,
                L1_PM_SUBSTATES_VER1,
            ),
            capabilities: L1PmSubstatesCapabilities::new(),
            control1: L1PmSubstatesControl1::new(),
            control2: L1PmSubstatesControl2::new(),
        }
    }

    /// The encoded structure.
    pub fn to_bytes(&self) -> [u8; L1_PM_SUBSTATES_SIZE] {
        zerocopy::transmute!(self.to_wire())
    }

    fn to_wire(&self) -> L1PmSubstatesWire {
        L1PmSubstatesWire {
            header: U32::new(self.header.into_bits()),
            capabilities: U32::new(self.capabilities.into_bits()),
            control1: U32::new(self.control1.into_bits()),
            control2: U32::new(self.control2.into_bits()),
        }
    }
}

impl ExtendedCapability for L1PmSubstatesExtendedCapability {
    const ID: ExtendedCapabilityId = ExtendedCapabilityId::L1_PM_SUBSTATES;
    const SIZE: usize = L1_PM_SUBSTATES_SIZE;

    fn header(&self) -> ExtendedCapabilityHeader {
        self.header
    }

    fn decode(bytes: &[u8]) -> Result<Self, Error> {
        let wire = read_wire::<Self, L1PmSubstatesWire>(bytes, |w| w.header)?;
        Ok(Self {
            header: ExtendedCapabilityHeader::from_bits(wire.header.get()),
            capabilities: L1PmSubstatesCapabilities::from_bits(wire.capabilities.get()),
            control1: L1PmSubstatesControl1::from_bits(wire.control1.get()),
            control2: L1PmSubstatesControl2::from_bits(wire.control2.get()),
        })
    }

    fn encode(&self) -> Vec<u8> {
        self.to_wire().as_bytes().to_vec()
    }
}
