// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! PASID extended capability.

use super::Error;
use super::ExtendedCapability;
use super::check_field;
use super::read_wire;
use crate::spec::ExtendedCapabilityId;
use crate::spec::header::ExtendedCapabilityHeader;
use crate::spec::pasid::MAX_PASID_WIDTH;
use crate::spec::pasid::PASID_SIZE;
use crate::spec::pasid::PASID_VER1;
use crate::spec::pasid::PasidCapability;
use crate::spec::pasid::PasidControl;
use zerocopy::FromBytes;
use zerocopy::Immutable;
use zerocopy::IntoBytes;
use zerocopy::KnownLayout;
use zerocopy::Unaligned;
use zerocopy::byteorder::little_endian::U16;
use zerocopy::byteorder::little_endian::U32;

#[repr(C)]
#[derive(FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
struct PasidWire {
    header: U32,
    capability: U16,
    control: U16,
}

static_assertions::const_assert_eq!(size_of::<PasidWire>(), PASID_SIZE);

/// The PASID Extended Capability structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PasidExtendedCapability {
    /// Extended capability header.
    pub header: ExtendedCapabilityHeader,
    /// PASID Capability register.
    pub capability: PasidCapability,
    /// PASID Control register.
    pub control: PasidControl,
}

impl PasidExtendedCapability {
    /// A version 1 structure with every register cleared.
    pub const fn new() -> Self {
        Self {
            header: ExtendedCapabilityHeader::for_capability(ExtendedCapabilityId::PASID, PASID_VER1),
            capability: PasidCapability::new(),
            control: PasidControl::new(),
        }
    }

    /// The encoded structure.
    pub fn to_bytes(&self) -> [u8; PASID_SIZE] {
        zerocopy::transmute!(self.to_wire())
    }

    fn to_wire(&self) -> PasidWire {
        PasidWire {
            header: U32::new(self.header.into_bits()),
            capability: U16::new(self.capability.into_bits()),
            control: U16::new(self.control.into_bits()),
        }
    }
}

impl ExtendedCapability for PasidExtendedCapability {
    const ID: ExtendedCapabilityId = ExtendedCapabilityId::PASID;
    const SIZE: usize = PASID_SIZE;

    fn header(&self) -> ExtendedCapabilityHeader {
        self.header
    }

    fn decode(bytes: &[u8]) -> Result<Self, Error> {
        let wire = read_wire::<Self, PasidWire>(bytes, |w| w.header)?;
        Ok(Self {
            header: ExtendedCapabilityHeader::from_bits(wire.header.get()),
            capability: PasidCapability::from_bits(wire.capability.get()),
            control: PasidControl::from_bits(wire.control.get()),
        })
    }

    fn encode(&self) -> Vec<u8> {
        self.to_wire().as_bytes().to_vec()
    }
}

impl PasidCapability {
    /// Sets Max PASID Width, rejecting widths that do not fit in 5 bits.
    pub fn try_with_max_pasid_width(self, width: u8) -> Result<Self, Error> {
        let width = check_field("max_pasid_width", width, MAX_PASID_WIDTH)?;
        Ok(self.with_max_pasid_width(width))
    }
}
