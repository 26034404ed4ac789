// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Decode and encode of PCI Express extended capability structures.
//!
//! Each structure is read from a little-endian byte buffer that has already
//! been sliced to the start of the capability in extended configuration
//! space. Reserved bits survive a decode/encode round trip unchanged.

pub use self::dpc::DpcExtendedCapability;
pub use self::l1_pm_substates::L1PmSubstatesExtendedCapability;
pub use self::pasid::PasidExtendedCapability;
pub use self::ptm::PtmExtendedCapability;

use crate::spec::ExtendedCapabilityId;
use crate::spec::header::ExtendedCapabilityHeader;
use crate::spec::header::HEADER_SIZE;
use thiserror::Error;
use zerocopy::FromBytes;
use zerocopy::byteorder::little_endian::U32;

pub mod dpc;
pub mod l1_pm_substates;
pub mod pasid;
pub mod ptm;

/// Errors returned when decoding or building an extended capability.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    /// The buffer does not hold the whole structure.
    #[error("buffer too short: expected at least {expected:#x} bytes, got {actual:#x}")]
    BufferTooShort {
        /// Bytes needed.
        expected: usize,
        /// Bytes available.
        actual: usize,
    },
    /// The header names a different capability than the one being decoded.
    #[error("capability id mismatch: expected {expected}, got {actual}")]
    CapabilityIdMismatch {
        /// ID of the structure being decoded.
        expected: ExtendedCapabilityId,
        /// ID found in the header.
        actual: ExtendedCapabilityId,
    },
    /// A value does not fit in its register field.
    #[error("value {value:#x} does not fit in {field} (max {max:#x})")]
    FieldOutOfRange {
        /// Name of the field.
        field: &'static str,
        /// Rejected value.
        value: u32,
        /// Largest value the field holds.
        max: u32,
    },
}

/// A fixed-layout PCI Express extended capability structure.
pub trait ExtendedCapability: Sized {
    /// Capability ID carried in the header of this structure.
    const ID: ExtendedCapabilityId;

    /// Size of the encoded structure in bytes.
    const SIZE: usize;

    /// The extended capability header.
    fn header(&self) -> ExtendedCapabilityHeader;

    /// Decodes the structure from the start of `bytes`.
    ///
    /// Bytes past [`Self::SIZE`] are ignored.
    fn decode(bytes: &[u8]) -> Result<Self, Error>;

    /// Encodes the structure into exactly [`Self::SIZE`] bytes.
    fn encode(&self) -> Vec<u8>;

    /// Encodes the structure into the start of `buf`.
    fn encode_into(&self, buf: &mut [u8]) -> Result<(), Error> {
        let actual = buf.len();
        let dest = buf.get_mut(..Self::SIZE).ok_or(Error::BufferTooShort {
            expected: Self::SIZE,
            actual,
        })?;
        dest.copy_from_slice(&self.encode());
        Ok(())
    }
}

/// Decodes just the extended capability header at the start of `bytes`.
pub fn read_header(bytes: &[u8]) -> Result<ExtendedCapabilityHeader, Error> {
    let (raw, _) = U32::read_from_prefix(bytes).map_err(|_| Error::BufferTooShort {
        expected: HEADER_SIZE,
        actual: bytes.len(),
    })?;
    Ok(ExtendedCapabilityHeader::from_bits(raw.get()))
}

/// Reads the little-endian wire image of `C` and checks its header.
///
/// `header` projects the raw header dword out of the wire image.
fn read_wire<C, W>(bytes: &[u8], header: impl FnOnce(&W) -> U32) -> Result<W, Error>
where
    C: ExtendedCapability,
    W: FromBytes,
{
    tracing::trace!(id = %C::ID, len = bytes.len(), "decoding extended capability");

    let (wire, _) = W::read_from_prefix(bytes).map_err(|_| Error::BufferTooShort {
        expected: C::SIZE,
        actual: bytes.len(),
    })?;

    let id = ExtendedCapabilityHeader::from_bits(header(&wire).get()).id();
    if id != C::ID {
        return Err(Error::CapabilityIdMismatch {
            expected: C::ID,
            actual: id,
        });
    }

    Ok(wire)
}

/// Checks that `value` fits in a field whose largest value is `max`.
fn check_field(field: &'static str, value: u8, max: u8) -> Result<u8, Error> {
    if value > max {
        return Err(Error::FieldOutOfRange {
            field,
            value: value.into(),
            max: max.into(),
        });
    }
    Ok(value)
}

/// Any extended capability this crate understands, keyed by Capability ID.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnyExtendedCapability {
    /// Process Address Space ID
    Pasid(PasidExtendedCapability),
    /// Downstream Port Containment
    Dpc(DpcExtendedCapability),
    /// L1 PM Substates
    L1PmSubstates(L1PmSubstatesExtendedCapability),
    /// Precision Time Measurement
    Ptm(PtmExtendedCapability),
    /// A capability without a layout in this crate. Only the header is kept.
    Unrecognized(ExtendedCapabilityHeader),
}

impl AnyExtendedCapability {
    /// Decodes whichever capability the header at the start of `bytes`
    /// names.
    pub fn decode(bytes: &[u8]) -> Result<Self, Error> {
        let header = read_header(bytes)?;
        let cap = match header.id() {
            ExtendedCapabilityId::PASID => Self::Pasid(PasidExtendedCapability::decode(bytes)?),
            ExtendedCapabilityId::DPC => Self::Dpc(DpcExtendedCapability::decode(bytes)?),
            ExtendedCapabilityId::L1_PM_SUBSTATES => {
                Self::L1PmSubstates(L1PmSubstatesExtendedCapability::decode(bytes)?)
            }
            ExtendedCapabilityId::PTM => Self::Ptm(PtmExtendedCapability::decode(bytes)?),
            id => {
                tracing::debug!(
                    %id,
                    version = header.version(),
                    next = header.next_capability_offset(),
                    "unrecognized extended capability"
                );
                Self::Unrecognized(header)
            }
        };
        Ok(cap)
    }

    /// The extended capability header.
    pub fn header(&self) -> ExtendedCapabilityHeader {
        match self {
            Self::Pasid(cap) => cap.header(),
            Self::Dpc(cap) => cap.header(),
            Self::L1PmSubstates(cap) => cap.header(),
            Self::Ptm(cap) => cap.header(),
            Self::Unrecognized(header) => *header,
        }
    }

    /// Encodes the held structure. An unrecognized capability encodes to
    /// its header alone.
    pub fn encode(&self) -> Vec<u8> {
        match self {
            Self::Pasid(cap) => cap.encode(),
            Self::Dpc(cap) => cap.encode(),
            Self::L1PmSubstates(cap) => cap.encode(),
            Self::Ptm(cap) => cap.encode(),
            Self::Unrecognized(header) => header.into_bits().to_le_bytes().to_vec(),
        }
    }
}
