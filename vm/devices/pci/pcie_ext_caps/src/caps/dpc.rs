// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! DPC extended capability.

use super::Error;
use super::ExtendedCapability;
use super::check_field;
use super::read_wire;
use crate::spec::ExtendedCapabilityId;
use crate::spec::dpc::DPC_SIZE;
use crate::spec::dpc::DPC_VER1;
use crate::spec::dpc::DpcCapabilities;
use crate::spec::dpc::DpcControl;
use crate::spec::dpc::DpcStatus;
use crate::spec::dpc::MAX_RP_PIO_LOG_SIZE;
use crate::spec::dpc::RP_PIO_HEADER_LOG_DWORDS;
use crate::spec::dpc::RP_PIO_HEADER_LOG_EXT_DWORDS;
use crate::spec::header::ExtendedCapabilityHeader;
use zerocopy::FromBytes;
use zerocopy::Immutable;
use zerocopy::IntoBytes;
use zerocopy::KnownLayout;
use zerocopy::Unaligned;
use zerocopy::byteorder::little_endian::U16;
use zerocopy::byteorder::little_endian::U32;

#[repr(C)]
#[derive(FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
struct DpcWire {
    header: U32,
    capability: U16,
    control: U16,
    status: U16,
    error_source_id: U16,
    rp_pio_status: U32,
    rp_pio_mask: U32,
    rp_pio_severity: U32,
    rp_pio_syserr: U32,
    rp_pio_exception: U32,
    rp_pio_header_log: [U32; RP_PIO_HEADER_LOG_DWORDS],
    rp_pio_impspec_log: U32,
    rp_pio_header_log_ext: [U32; RP_PIO_HEADER_LOG_EXT_DWORDS],
}

static_assertions::const_assert_eq!(size_of::<DpcWire>(), DPC_SIZE);

/// The DPC Extended Capability structure, including the root port PIO
/// registers and logs.
///
/// The RP PIO registers are plain bitmasks and logs, and are kept as raw
/// dwords.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DpcExtendedCapability {
    /// Extended capability header.
    pub header: ExtendedCapabilityHeader,
    /// DPC Capability register.
    pub capability: DpcCapabilities,
    /// DPC Control register.
    pub control: DpcControl,
    /// DPC Status register.
    pub status: DpcStatus,
    /// Requester ID of the message that triggered DPC.
    pub error_source_id: u16,
    /// RP PIO Status register.
    pub rp_pio_status: u32,
    /// RP PIO Mask register.
    pub rp_pio_mask: u32,
    /// RP PIO Severity register.
    pub rp_pio_severity: u32,
    /// RP PIO SysError register.
    pub rp_pio_syserr: u32,
    /// RP PIO Exception register.
    pub rp_pio_exception: u32,
    /// RP PIO Header Log, DW1 through DW4.
    pub rp_pio_header_log: [u32; RP_PIO_HEADER_LOG_DWORDS],
    /// RP PIO ImpSpec Log register.
    pub rp_pio_impspec_log: u32,
    /// RP PIO Header Log, DW5 through DW14.
    pub rp_pio_header_log_ext: [u32; RP_PIO_HEADER_LOG_EXT_DWORDS],
}

impl DpcExtendedCapability {
    /// A version 1 structure with every register cleared.
    pub const fn new() -> Self {
        Self {
            header: ExtendedCapabilityHeader::for_capability(ExtendedCapabilityId::DPC, DPC_VER1),
            capability: DpcCapabilities::new(),
            control: DpcControl::new(),
            status: DpcStatus::new(),
            error_source_id: 0,
            rp_pio_status: 0,
            rp_pio_mask: 0,
            rp_pio_severity: 0,
            rp_pio_syserr: 0,
            rp_pio_exception: 0,
            rp_pio_header_log: [0; RP_PIO_HEADER_LOG_DWORDS],
            rp_pio_impspec_log: 0,
            rp_pio_header_log_ext: [0; RP_PIO_HEADER_LOG_EXT_DWORDS],
        }
    }

    /// The encoded structure.
    pub fn to_bytes(&self) -> [u8; DPC_SIZE] {
        zerocopy::transmute!(self.to_wire())
    }

    fn to_wire(&self) -> DpcWire {
        DpcWire {
            header: U32::new(self.header.into_bits()),
            capability: U16::new(self.capability.into_bits()),
            control: U16::new(self.control.into_bits()),
            status: U16::new(self.status.into_bits()),
            error_source_id: U16::new(self.error_source_id),
            rp_pio_status: U32::new(self.rp_pio_status),
            rp_pio_mask: U32::new(self.rp_pio_mask),
            rp_pio_severity: U32::new(self.rp_pio_severity),
            rp_pio_syserr: U32::new(self.rp_pio_syserr),
            rp_pio_exception: U32::new(self.rp_pio_exception),
            rp_pio_header_log: self.rp_pio_header_log.map(U32::new),
            rp_pio_impspec_log: U32::new(self.rp_pio_impspec_log),
            rp_pio_header_log_ext: self.rp_pio_header_log_ext.map(U32::new),
        }
    }
}

impl ExtendedCapability for DpcExtendedCapability {
    const ID: ExtendedCapabilityId = ExtendedCapabilityId::DPC;
    const SIZE: usize = DPC_SIZE;

    fn header(&self) -> ExtendedCapabilityHeader {
        self.header
    }

    fn decode(bytes: &[u8]) -> Result<Self, Error> {
        let wire = read_wire::<Self, DpcWire>(bytes, |w| w.header)?;
        Ok(Self {
            header: ExtendedCapabilityHeader::from_bits(wire.header.get()),
            capability: DpcCapabilities::from_bits(wire.capability.get()),
            control: DpcControl::from_bits(wire.control.get()),
            status: DpcStatus::from_bits(wire.status.get()),
            error_source_id: wire.error_source_id.get(),
            rp_pio_status: wire.rp_pio_status.get(),
            rp_pio_mask: wire.rp_pio_mask.get(),
            rp_pio_severity: wire.rp_pio_severity.get(),
            rp_pio_syserr: wire.rp_pio_syserr.get(),
            rp_pio_exception: wire.rp_pio_exception.get(),
            rp_pio_header_log: wire.rp_pio_header_log.map(U32::get),
            rp_pio_impspec_log: wire.rp_pio_impspec_log.get(),
            rp_pio_header_log_ext: wire.rp_pio_header_log_ext.map(U32::get),
        })
    }

    fn encode(&self) -> Vec<u8> {
        self.to_wire().as_bytes().to_vec()
    }
}

impl DpcCapabilities {
    /// Sets the RP PIO log size, splitting it across the low nibble and the
    /// extension bit. Sizes that do not fit in 5 bits are rejected.
    pub fn try_with_rp_pio_log_size(self, size: u8) -> Result<Self, Error> {
        let size = check_field("rp_pio_log_size", size, MAX_RP_PIO_LOG_SIZE)?;
        Ok(self
            .with_rp_pio_log_size_low(size & 0xf)
            .with_rp_pio_log_size_ext(size & 0x10 != 0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::dpc::DpcRegister;
    use crate::spec::dpc::DpcTriggerReason;
    use crate::spec::dpc::DpcTriggerReasonExtension;
    use crate::spec::pasid::PASID_SIZE;
    use crate::test_helpers::FILL_SEEDS;
    use crate::test_helpers::patterned;
    use std::mem::offset_of;

    #[test]
    fn layout_matches_register_table() {
        let offsets = [
            (offset_of!(DpcWire, header), DpcRegister::HEADER),
            (offset_of!(DpcWire, capability), DpcRegister::CAPABILITY),
            (offset_of!(DpcWire, control), DpcRegister::CONTROL),
            (offset_of!(DpcWire, status), DpcRegister::STATUS),
            (offset_of!(DpcWire, error_source_id), DpcRegister::ERROR_SOURCE_ID),
            (offset_of!(DpcWire, rp_pio_status), DpcRegister::RP_PIO_STATUS),
            (offset_of!(DpcWire, rp_pio_mask), DpcRegister::RP_PIO_MASK),
            (offset_of!(DpcWire, rp_pio_severity), DpcRegister::RP_PIO_SEVERITY),
            (offset_of!(DpcWire, rp_pio_syserr), DpcRegister::RP_PIO_SYSERR),
            (offset_of!(DpcWire, rp_pio_exception), DpcRegister::RP_PIO_EXCEPTION),
            (offset_of!(DpcWire, rp_pio_header_log), DpcRegister::RP_PIO_HEADER_LOG),
            (offset_of!(DpcWire, rp_pio_impspec_log), DpcRegister::RP_PIO_IMPSPEC_LOG),
            (
                offset_of!(DpcWire, rp_pio_header_log_ext),
                DpcRegister::RP_PIO_HEADER_LOG_EXT,
            ),
        ];
        for (offset, reg) in offsets {
            assert_eq!(offset, usize::from(reg), "{reg:?}");
        }
    }

    #[test]
    fn decode_fields() {
        let mut cap = DpcExtendedCapability::new();
        cap.error_source_id = 0x0108;
        cap.rp_pio_status = 0x0001_0000;
        cap.rp_pio_header_log = [0x4000_0001, 0x0100_000f, 0xfee0_0000, 0];
        cap.rp_pio_header_log_ext[9] = 0xdead_beef;
        let mut bytes = cap.to_bytes();

        // Interrupt message 3, RP extensions, software trigger supported.
        bytes[0x04..0x06].copy_from_slice(&0x00a3u16.to_le_bytes());
        // Trigger enable = ERR_FATAL, interrupt enable.
        bytes[0x06..0x08].copy_from_slice(&0x0009u16.to_le_bytes());
        // Triggered by software, RP busy, first error pointer 7.
        bytes[0x08..0x0a].copy_from_slice(&0x0737u16.to_le_bytes());

        let cap = DpcExtendedCapability::decode(&bytes).unwrap();
        assert_eq!(cap.capability.interrupt_message_number(), 3);
        assert!(cap.capability.rp_extensions_for_dpc());
        assert!(!cap.capability.poisoned_tlp_egress_blocking_supported());
        assert!(cap.capability.software_triggering_supported());

        assert_eq!(cap.control.trigger_enable(), 0b01);
        assert!(!cap.control.completion_control());
        assert!(cap.control.interrupt_enable());

        assert!(cap.status.trigger_status());
        assert_eq!(cap.status.trigger_reason(), DpcTriggerReason::SeeExtension);
        assert!(!cap.status.interrupt_status());
        assert!(cap.status.rp_busy());
        assert_eq!(
            cap.status.trigger_reason_extension(),
            DpcTriggerReasonExtension::SoftwareTrigger
        );
        assert_eq!(cap.status.rp_pio_first_error_pointer(), 7);

        assert_eq!(cap.error_source_id, 0x0108);
        assert_eq!(cap.rp_pio_status, 0x0001_0000);
        assert_eq!(cap.rp_pio_header_log, [0x4000_0001, 0x0100_000f, 0xfee0_0000, 0]);
        assert_eq!(cap.rp_pio_header_log_ext[9], 0xdead_beef);
        assert_eq!(&bytes[0x58..0x5c], &[0xef, 0xbe, 0xad, 0xde]);

        assert_eq!(cap.to_bytes(), bytes);
    }

    #[test]
    fn round_trip_preserves_reserved_bits() {
        for seed in FILL_SEEDS {
            let bytes = patterned(ExtendedCapabilityId::DPC, DPC_SIZE, seed);
            let cap = DpcExtendedCapability::decode(&bytes).unwrap();
            assert_eq!(cap.encode(), bytes, "seed {seed:#x}");
        }

        let mut bytes = [0xff; DPC_SIZE];
        bytes[..2].copy_from_slice(&0x1du16.to_le_bytes());
        let cap = DpcExtendedCapability::decode(&bytes).unwrap();
        assert_eq!(cap.capability.into_bits(), 0xffff);
        assert_eq!(cap.control.into_bits(), 0xffff);
        assert_eq!(cap.status.into_bits(), 0xffff);
        assert_eq!(cap.to_bytes(), bytes);
    }

    #[test]
    fn rp_pio_log_size_split() {
        // 21 = 0b1_0101: low nibble 0b0101, extension bit set.
        let bytes = {
            let mut cap = DpcExtendedCapability::new();
            cap.capability = DpcCapabilities::new()
                .with_rp_pio_log_size_low(0b0101)
                .with_rp_pio_log_size_ext(true);
            cap.to_bytes()
        };
        assert_eq!(bytes[0x05], 0b0010_0101);

        let cap = DpcExtendedCapability::decode(&bytes).unwrap();
        assert_eq!(cap.capability.rp_pio_log_size(), 21);

        let built = DpcCapabilities::new().try_with_rp_pio_log_size(21).unwrap();
        assert_eq!(built, cap.capability);

        let small = DpcCapabilities::new().try_with_rp_pio_log_size(0xf).unwrap();
        assert_eq!(small.rp_pio_log_size_low(), 0xf);
        assert!(!small.rp_pio_log_size_ext());

        assert_eq!(
            DpcCapabilities::new().try_with_rp_pio_log_size(32),
            Err(Error::FieldOutOfRange {
                field: "rp_pio_log_size",
                value: 32,
                max: 31,
            })
        );
    }

    #[test]
    fn capability_field_isolation() {
        let cases = [
            (DpcCapabilities::new().with_interrupt_message_number(0x1f), 0x001f),
            (DpcCapabilities::new().with_rp_extensions_for_dpc(true), 0x0020),
            (
                DpcCapabilities::new().with_poisoned_tlp_egress_blocking_supported(true),
                0x0040,
            ),
            (DpcCapabilities::new().with_software_triggering_supported(true), 0x0080),
            (DpcCapabilities::new().with_rp_pio_log_size_low(0xf), 0x0f00),
            (
                DpcCapabilities::new().with_dl_active_err_cor_signaling_supported(true),
                0x1000,
            ),
            (DpcCapabilities::new().with_rp_pio_log_size_ext(true), 0x2000),
        ];
        for (reg, mask) in cases {
            assert_eq!(reg.into_bits(), mask);
        }
    }

    #[test]
    fn control_field_isolation() {
        let cases = [
            (DpcControl::new().with_trigger_enable(0b11), 0x0003),
            (DpcControl::new().with_completion_control(true), 0x0004),
            (DpcControl::new().with_interrupt_enable(true), 0x0008),
            (DpcControl::new().with_err_cor_enable(true), 0x0010),
            (
                DpcControl::new().with_poisoned_tlp_egress_blocking_enable(true),
                0x0020,
            ),
            (DpcControl::new().with_software_trigger(true), 0x0040),
            (DpcControl::new().with_dl_active_err_cor_enable(true), 0x0080),
            (DpcControl::new().with_sig_sfw_enable(true), 0x0100),
        ];
        for (reg, mask) in cases {
            assert_eq!(reg.into_bits(), mask);
        }
    }

    #[test]
    fn status_field_isolation() {
        let cases = [
            (DpcStatus::new().with_trigger_status(true), 0x0001),
            (
                DpcStatus::new().with_trigger_reason(DpcTriggerReason::SeeExtension),
                0x0006,
            ),
            (DpcStatus::new().with_interrupt_status(true), 0x0008),
            (DpcStatus::new().with_rp_busy(true), 0x0010),
            (
                DpcStatus::new().with_trigger_reason_extension(DpcTriggerReasonExtension::Reserved3),
                0x0060,
            ),
            (DpcStatus::new().with_rp_pio_first_error_pointer(0x1f), 0x1f00),
            (DpcStatus::new().with_sig_sfw_status(true), 0x2000),
        ];
        for (reg, mask) in cases {
            assert_eq!(reg.into_bits(), mask);
        }
    }

    #[test]
    fn header_log_order_is_significant() {
        let mut cap = DpcExtendedCapability::new();
        cap.rp_pio_header_log = [1, 2, 3, 4];
        cap.rp_pio_header_log_ext = [5, 6, 7, 8, 9, 10, 11, 12, 13, 14];
        let bytes = cap.to_bytes();

        for dw in 0..4 {
            let off = usize::from(DpcRegister::RP_PIO_HEADER_LOG) + dw * 4;
            assert_eq!(bytes[off], dw as u8 + 1);
        }
        for dw in 0..10 {
            let off = usize::from(DpcRegister::RP_PIO_HEADER_LOG_EXT) + dw * 4;
            assert_eq!(bytes[off], dw as u8 + 5);
        }
        assert_eq!(DpcExtendedCapability::decode(&bytes).unwrap(), cap);
    }

    #[test]
    fn pasid_id_in_dpc_buffer() {
        let bytes = patterned(ExtendedCapabilityId::PASID, DPC_SIZE, 0xa5);
        assert_eq!(
            DpcExtendedCapability::decode(&bytes),
            Err(Error::CapabilityIdMismatch {
                expected: ExtendedCapabilityId::DPC,
                actual: ExtendedCapabilityId::PASID,
            })
        );
    }

    #[test]
    fn short_buffer() {
        // A PASID-sized buffer is nowhere near enough for DPC.
        let bytes = patterned(ExtendedCapabilityId::DPC, PASID_SIZE, 0);
        assert_eq!(
            DpcExtendedCapability::decode(&bytes),
            Err(Error::BufferTooShort {
                expected: DPC_SIZE,
                actual: PASID_SIZE,
            })
        );
    }
}
