// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Types and constants specified by the PCI Express 3.1 spec for extended
//! capabilities.
//!
//! This module does not define every extended capability. New ones follow
//! the same shape: the common header, then fixed registers.

use core::fmt;

/// Defines an open set of named register offsets, similar in spirit to an
/// open enum: any `u16` is representable, and the well-known offsets get
/// names.
macro_rules! register_offsets {
    (
        $(#[$attr:meta])*
        $vis:vis struct $name:ident {
            $($variant:ident = $value:expr,)*
        }
    ) => {
        $(#[$attr])*
        #[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
        $vis struct $name(pub u16);

        #[allow(missing_docs)] // offsets are named after the table above
        impl $name {
            $(pub const $variant: $name = $name($value);)*
        }

        impl core::fmt::Debug for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                match *self {
                    $(Self::$variant => f.pad(stringify!($variant)),)*
                    _ => write!(f, "{:#x}", self.0),
                }
            }
        }

        impl From<$name> for usize {
            fn from(offset: $name) -> usize {
                offset.0.into()
            }
        }
    };
}

/// Extended Capability IDs
///
/// Sources: PCI Express Base Specification Rev. 3.1, Section 7.9.
///
/// NOTE: this is a non-exhaustive list. IDs that are not named here are
/// still representable.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct ExtendedCapabilityId(pub u16);

impl ExtendedCapabilityId {
    /// Process Address Space ID
    pub const PASID: Self = Self(0x001B);
    /// Downstream Port Containment
    pub const DPC: Self = Self(0x001D);
    /// L1 PM Substates
    pub const L1_PM_SUBSTATES: Self = Self(0x001E);
    /// Precision Time Measurement
    pub const PTM: Self = Self(0x001F);

    const fn name(&self) -> Option<&'static str> {
        Some(match *self {
            Self::PASID => "PASID",
            Self::DPC => "DPC",
            Self::L1_PM_SUBSTATES => "L1_PM_SUBSTATES",
            Self::PTM => "PTM",
            _ => return None,
        })
    }
}

impl fmt::Debug for ExtendedCapabilityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => f.pad(name),
            None => write!(f, "ExtendedCapabilityId({:#06x})", self.0),
        }
    }
}

impl fmt::Display for ExtendedCapabilityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{}({:#06x})", name, self.0),
            None => write!(f, "UNKNOWN({:#06x})", self.0),
        }
    }
}

impl From<u16> for ExtendedCapabilityId {
    fn from(id: u16) -> Self {
        Self(id)
    }
}

impl From<ExtendedCapabilityId> for u16 {
    fn from(id: ExtendedCapabilityId) -> Self {
        id.0
    }
}

/// Extended Capability Header
///
/// Sources: PCI Express Base Specification Rev. 3.1, Section 7.9.3
pub mod header {
    use super::ExtendedCapabilityId;
    use bitfield_struct::bitfield;

    /// Size of the header shared by every extended capability.
    pub const HEADER_SIZE: usize = 0x04;

    /// Extended Capability Header register
    ///
    /// | Bits 31-20             | Bits 19-16 | Bits 15-0     |
    /// |------------------------|------------|---------------|
    /// | Next Capability Offset | Version    | Capability ID |
    #[bitfield(u32)]
    #[derive(PartialEq, Eq)]
    pub struct ExtendedCapabilityHeader {
        /// PCI-SIG defined ID of the capability structure.
        pub capability_id: u16,
        /// Capability structure version.
        #[bits(4)]
        pub version: u8,
        /// Config space offset of the next capability, or 0 at the end of
        /// the list.
        #[bits(12)]
        pub next_capability_offset: u16,
    }

    impl ExtendedCapabilityHeader {
        /// The Capability ID as a typed value.
        pub const fn id(&self) -> ExtendedCapabilityId {
            ExtendedCapabilityId(self.capability_id())
        }

        /// A header for `id` at `version`, terminating the capability list.
        pub const fn for_capability(id: ExtendedCapabilityId, version: u8) -> Self {
            Self::from_bits(id.0 as u32 | ((version as u32 & 0xf) << 16))
        }
    }
}

/// Process Address Space ID (PASID)
///
/// Sources: PCI Express Base Specification Rev. 3.1, Section 7.29
pub mod pasid {
    use bitfield_struct::bitfield;

    /// Capability version defined by PCIe 3.1.
    pub const PASID_VER1: u8 = 0x1;

    /// Size of the PASID Extended Capability structure.
    pub const PASID_SIZE: usize = 0x08;

    /// Largest value the 5-bit Max PASID Width field can hold.
    pub const MAX_PASID_WIDTH: u8 = 0x1f;

    register_offsets! {
        /// Offsets into the PASID Extended Capability
        ///
        /// | Offset    | Bits 31-16             | Bits 15-0               |
        /// |-----------|------------------------|-------------------------|
        /// | Cap + 0x0 | Extended Capability Header                       |
        /// | Cap + 0x4 | PASID Control          | PASID Capability        |
        pub struct PasidRegister {
            HEADER     = 0x00,
            CAPABILITY = 0x04,
            CONTROL    = 0x06,
        }
    }

    /// PASID Capability Register
    #[bitfield(u16)]
    #[derive(PartialEq, Eq)]
    pub struct PasidCapability {
        _reserved: bool,
        /// Requests with the Execute Requested bit are supported.
        pub execute_permission_supported: bool,
        /// Requests with the Privileged Mode Requested bit are supported.
        pub privileged_mode_supported: bool,
        /// Translated requests may carry a PASID prefix.
        pub translated_requests_with_pasid_supported: bool,
        #[bits(4)]
        _reserved1: u16,
        /// Width of the PASID field supported by the function.
        #[bits(5)]
        pub max_pasid_width: u8,
        #[bits(3)]
        _reserved2: u16,
    }

    impl PasidCapability {
        /// Number of distinct PASID values the function supports.
        pub const fn max_pasid_count(&self) -> u64 {
            1u64 << self.max_pasid_width()
        }
    }

    /// PASID Control Register
    #[bitfield(u16)]
    #[derive(PartialEq, Eq)]
    pub struct PasidControl {
        /// The function may send and receive PASID TLP prefixes.
        pub pasid_enable: bool,
        /// The function may request execute permission.
        pub execute_permission_enable: bool,
        /// The function may request privileged mode.
        pub privileged_mode_enable: bool,
        /// The function may send translated requests with a PASID prefix.
        pub translated_requests_with_pasid_enable: bool,
        #[bits(12)]
        _reserved: u16,
    }
}

/// Downstream Port Containment (DPC)
///
/// Sources: PCI Express Base Specification Rev. 3.1, Section 7.31
pub mod dpc {
    use bitfield_struct::bitfield;

    /// Capability version defined by PCIe 3.1.
    pub const DPC_VER1: u8 = 0x1;

    /// Size of the DPC Extended Capability structure, RP PIO logs included.
    pub const DPC_SIZE: usize = 0x5C;

    /// Number of dwords in the first RP PIO header log block (DW1-DW4).
    pub const RP_PIO_HEADER_LOG_DWORDS: usize = 4;

    /// Number of dwords in the extended RP PIO header log block (DW5-DW14).
    pub const RP_PIO_HEADER_LOG_EXT_DWORDS: usize = 10;

    /// Largest value the split RP PIO Log Size field can hold.
    pub const MAX_RP_PIO_LOG_SIZE: u8 = 0x1f;

    register_offsets! {
        /// Offsets into the DPC Extended Capability
        ///
        /// | Offset     | Bits 31-16             | Bits 15-0               |
        /// |------------|------------------------|-------------------------|
        /// | Cap + 0x0  | Extended Capability Header                       |
        /// | Cap + 0x4  | DPC Control            | DPC Capability          |
        /// | Cap + 0x8  | DPC Error Source ID    | DPC Status              |
        /// | Cap + 0xC  | RP PIO Status                                    |
        /// | Cap + 0x10 | RP PIO Mask                                      |
        /// | Cap + 0x14 | RP PIO Severity                                  |
        /// | Cap + 0x18 | RP PIO SysError                                  |
        /// | Cap + 0x1C | RP PIO Exception                                 |
        /// | Cap + 0x20 | RP PIO Header Log (DW1-DW4)                      |
        /// | Cap + 0x30 | RP PIO ImpSpec Log                               |
        /// | Cap + 0x34 | RP PIO TLP Prefix Log (DW5-DW14)                 |
        pub struct DpcRegister {
            HEADER                = 0x00,
            CAPABILITY            = 0x04,
            CONTROL               = 0x06,
            STATUS                = 0x08,
            ERROR_SOURCE_ID       = 0x0A,
            RP_PIO_STATUS         = 0x0C,
            RP_PIO_MASK           = 0x10,
            RP_PIO_SEVERITY       = 0x14,
            RP_PIO_SYSERR         = 0x18,
            RP_PIO_EXCEPTION      = 0x1C,
            RP_PIO_HEADER_LOG     = 0x20,
            RP_PIO_IMPSPEC_LOG    = 0x30,
            RP_PIO_HEADER_LOG_EXT = 0x34,
        }
    }

    /// DPC Capability Register
    ///
    /// The RP PIO Log Size is split: bits [3:0] live at [11:8] and bit [4]
    /// lives at [13].
    #[bitfield(u16)]
    #[derive(PartialEq, Eq)]
    pub struct DpcCapabilities {
        /// MSI/MSI-X vector used for DPC interrupts.
        #[bits(5)]
        pub interrupt_message_number: u8,
        /// Root port extensions for DPC are implemented.
        pub rp_extensions_for_dpc: bool,
        /// Poisoned TLP egress blocking is supported.
        pub poisoned_tlp_egress_blocking_supported: bool,
        /// Software may trigger DPC.
        pub software_triggering_supported: bool,
        /// Bits [3:0] of the RP PIO log size.
        #[bits(4)]
        pub rp_pio_log_size_low: u8,
        /// DL_Active ERR_COR signaling is supported.
        pub dl_active_err_cor_signaling_supported: bool,
        /// Bit [4] of the RP PIO log size.
        pub rp_pio_log_size_ext: bool,
        #[bits(2)]
        _reserved: u16,
    }

    impl DpcCapabilities {
        /// The RP PIO log size in dwords, reassembled from its two fields.
        pub const fn rp_pio_log_size(&self) -> u8 {
            self.rp_pio_log_size_low() | ((self.rp_pio_log_size_ext() as u8) << 4)
        }
    }

    /// DPC Control Register
    #[bitfield(u16)]
    #[derive(PartialEq, Eq)]
    pub struct DpcControl {
        /// Conditions that trigger DPC.
        #[bits(2)]
        pub trigger_enable: u8,
        /// Completion status returned for requests while contained.
        pub completion_control: bool,
        /// Generate an interrupt when DPC is triggered.
        pub interrupt_enable: bool,
        /// Signal ERR_COR when DPC is triggered.
        pub err_cor_enable: bool,
        /// Block poisoned TLPs at egress.
        pub poisoned_tlp_egress_blocking_enable: bool,
        /// Writing 1 triggers DPC.
        pub software_trigger: bool,
        /// Signal ERR_COR on DL_Active transitions.
        pub dl_active_err_cor_enable: bool,
        /// Enable DPC triggering on a signaled Secure Fault.
        pub sig_sfw_enable: bool,
        #[bits(7)]
        _reserved: u16,
    }

    /// Cause of a DPC event.
    #[derive(Debug, Copy, Clone, PartialEq, Eq)]
    #[repr(u16)]
    pub enum DpcTriggerReason {
        /// An unmasked uncorrectable error.
        UnmaskedUncorrectableError = 0b00,
        /// An ERR_NONFATAL message was received.
        ErrNonFatal = 0b01,
        /// An ERR_FATAL message was received.
        ErrFatal = 0b10,
        /// See the DPC Trigger Reason Extension field.
        SeeExtension = 0b11,
    }

    impl DpcTriggerReason {
        const fn from_bits(bits: u16) -> Self {
            match bits & 0b11 {
                0b00 => Self::UnmaskedUncorrectableError,
                0b01 => Self::ErrNonFatal,
                0b10 => Self::ErrFatal,
                _ => Self::SeeExtension,
            }
        }

        const fn into_bits(self) -> u16 {
            self as u16
        }
    }

    /// Cause of a DPC event when the trigger reason is
    /// [`DpcTriggerReason::SeeExtension`].
    #[derive(Debug, Copy, Clone, PartialEq, Eq)]
    #[repr(u16)]
    pub enum DpcTriggerReasonExtension {
        /// An RP PIO error.
        RpPioError = 0b00,
        /// The DPC Software Trigger bit was written.
        SoftwareTrigger = 0b01,
        /// Reserved encoding.
        Reserved2 = 0b10,
        /// Reserved encoding.
        Reserved3 = 0b11,
    }

    impl DpcTriggerReasonExtension {
        const fn from_bits(bits: u16) -> Self {
            match bits & 0b11 {
                0b00 => Self::RpPioError,
                0b01 => Self::SoftwareTrigger,
                0b10 => Self::Reserved2,
                _ => Self::Reserved3,
            }
        }

        const fn into_bits(self) -> u16 {
            self as u16
        }
    }

    /// DPC Status Register
    #[bitfield(u16)]
    #[derive(PartialEq, Eq)]
    pub struct DpcStatus {
        /// DPC has been triggered and the port is contained.
        pub trigger_status: bool,
        /// Why DPC was triggered.
        #[bits(2)]
        pub trigger_reason: DpcTriggerReason,
        /// A DPC interrupt is pending.
        pub interrupt_status: bool,
        /// The root port is still busy with internal activity.
        pub rp_busy: bool,
        /// Extended cause of the trigger.
        #[bits(2)]
        pub trigger_reason_extension: DpcTriggerReasonExtension,
        _reserved: bool,
        /// Bit position of the first RP PIO error logged.
        #[bits(5)]
        pub rp_pio_first_error_pointer: u8,
        /// DPC was triggered by a signaled Secure Fault.
        pub sig_sfw_status: bool,
        #[bits(2)]
        _reserved1: u16,
    }
}

/// L1 PM Substates
///
/// Sources: PCI Express Base Specification Rev. 3.1, Section 7.33
pub mod l1_pm_substates {
    use bitfield_struct::bitfield;

    /// Capability version defined by PCIe 3.1.
    pub const L1_PM_SUBSTATES_VER1: u8 = 0x1;

    /// Size of the L1 PM Substates Extended Capability structure.
    pub const L1_PM_SUBSTATES_SIZE: usize = 0x10;

    register_offsets! {
        /// Offsets into the L1 PM Substates Extended Capability
        ///
        /// | Offset    | Bits 31-0                            |
        /// |-----------|--------------------------------------|
        /// | Cap + 0x0 | Extended Capability Header           |
        /// | Cap + 0x4 | L1 PM Substates Capabilities         |
        /// | Cap + 0x8 | L1 PM Substates Control 1            |
        /// | Cap + 0xC | L1 PM Substates Control 2            |
        pub struct L1PmSubstatesRegister {
            HEADER       = 0x00,
            CAPABILITIES = 0x04,
            CONTROL_1    = 0x08,
            CONTROL_2    = 0x0C,
        }
    }

    /// Decodes a T_POWER_ON scale/value pair into microseconds.
    ///
    /// Scale 3 is reserved.
    pub const fn t_power_on_us(scale: u8, value: u8) -> Option<u32> {
        let unit = match scale {
            0b00 => 2,
            0b01 => 10,
            0b10 => 100,
            _ => return None,
        };
        Some(value as u32 * unit)
    }

    /// Decodes an LTR_L1.2_THRESHOLD scale/value pair into nanoseconds.
    ///
    /// Each scale step multiplies by 32. Scales 6 and 7 are not permitted.
    pub const fn ltr_threshold_ns(scale: u8, value: u16) -> Option<u64> {
        if scale > 5 {
            return None;
        }
        Some((value as u64) << (5 * scale as u32))
    }

    /// L1 PM Substates Capabilities Register
    #[bitfield(u32)]
    #[derive(PartialEq, Eq)]
    pub struct L1PmSubstatesCapabilities {
        /// PCI-PM L1.2 is supported.
        pub pci_pm_l1_2_supported: bool,
        /// PCI-PM L1.1 is supported.
        pub pci_pm_l1_1_supported: bool,
        /// ASPM L1.2 is supported.
        pub aspm_l1_2_supported: bool,
        /// ASPM L1.1 is supported.
        pub aspm_l1_1_supported: bool,
        /// L1 PM Substates are supported.
        pub l1_pm_substates_supported: bool,
        #[bits(3)]
        _reserved: u32,
        /// Port Common_Mode_Restore_Time, in microseconds.
        #[bits(8)]
        pub common_mode_restore_time: u8,
        /// Port T_POWER_ON scale.
        #[bits(2)]
        pub t_power_on_scale: u8,
        _reserved1: bool,
        /// Port T_POWER_ON value.
        #[bits(5)]
        pub t_power_on_value: u8,
        #[bits(8)]
        _reserved2: u32,
    }

    impl L1PmSubstatesCapabilities {
        /// Port T_POWER_ON in microseconds.
        pub const fn t_power_on_us(&self) -> Option<u32> {
            t_power_on_us(self.t_power_on_scale(), self.t_power_on_value())
        }
    }

    /// L1 PM Substates Control 1 Register
    #[bitfield(u32)]
    #[derive(PartialEq, Eq)]
    pub struct L1PmSubstatesControl1 {
        /// PCI-PM L1.2 is enabled.
        pub pci_pm_l1_2_enable: bool,
        /// PCI-PM L1.1 is enabled.
        pub pci_pm_l1_1_enable: bool,
        /// ASPM L1.2 is enabled.
        pub aspm_l1_2_enable: bool,
        /// ASPM L1.1 is enabled.
        pub aspm_l1_1_enable: bool,
        #[bits(4)]
        _reserved: u32,
        /// Common_Mode_Restore_Time, in microseconds.
        #[bits(8)]
        pub common_mode_restore_time: u8,
        /// LTR_L1.2_THRESHOLD value, interpreted with the scale.
        #[bits(10)]
        pub ltr_l1_2_threshold_value: u16,
        #[bits(3)]
        _reserved1: u32,
        /// LTR_L1.2_THRESHOLD scale.
        #[bits(3)]
        pub ltr_l1_2_threshold_scale: u8,
    }

    impl L1PmSubstatesControl1 {
        /// LTR_L1.2_THRESHOLD in nanoseconds.
        pub const fn ltr_l1_2_threshold_ns(&self) -> Option<u64> {
            ltr_threshold_ns(
                self.ltr_l1_2_threshold_scale(),
                self.ltr_l1_2_threshold_value(),
            )
        }
    }

    /// L1 PM Substates Control 2 Register
    #[bitfield(u32)]
    #[derive(PartialEq, Eq)]
    pub struct L1PmSubstatesControl2 {
        /// T_POWER_ON scale.
        #[bits(2)]
        pub t_power_on_scale: u8,
        _reserved: bool,
        /// T_POWER_ON value.
        #[bits(5)]
        pub t_power_on_value: u8,
        #[bits(24)]
        _reserved1: u32,
    }

    impl L1PmSubstatesControl2 {
        /// T_POWER_ON in microseconds.
        pub const fn t_power_on_us(&self) -> Option<u32> {
            t_power_on_us(self.t_power_on_scale(), self.t_power_on_value())
        }
    }
}

/// Precision Time Measurement (PTM)
///
/// Sources: PCI Express Base Specification Rev. 3.1, Section 7.32
pub mod ptm {
    use bitfield_struct::bitfield;

    /// Capability version defined by PCIe 3.1.
    pub const PTM_VER1: u8 = 0x1;

    /// Size of the PTM Extended Capability structure.
    pub const PTM_SIZE: usize = 0x0C;

    register_offsets! {
        /// Offsets into the PTM Extended Capability
        ///
        /// | Offset    | Bits 31-0                  |
        /// |-----------|----------------------------|
        /// | Cap + 0x0 | Extended Capability Header |
        /// | Cap + 0x4 | PTM Capability             |
        /// | Cap + 0x8 | PTM Control                |
        pub struct PtmRegister {
            HEADER     = 0x00,
            CAPABILITY = 0x04,
            CONTROL    = 0x08,
        }
    }

    /// PTM Capability Register
    #[bitfield(u32)]
    #[derive(PartialEq, Eq)]
    pub struct PtmCapability {
        /// The function can act as a PTM requester.
        pub requester_capable: bool,
        /// The function can act as a PTM responder.
        pub responder_capable: bool,
        /// The function can act as a PTM root.
        pub root_capable: bool,
        /// The function supports enhanced PTM.
        pub eptm_capable: bool,
        /// The function supports propagation delay adaptation.
        pub propagation_delay_adaptation_capable: bool,
        #[bits(3)]
        _reserved: u32,
        /// Encoded period of the local clock.
        #[bits(8)]
        pub local_clock_granularity: u8,
        #[bits(16)]
        _reserved1: u32,
    }

    /// PTM Control Register
    #[bitfield(u32)]
    #[derive(PartialEq, Eq)]
    pub struct PtmControl {
        /// PTM is enabled.
        pub enable: bool,
        /// The function is the PTM root.
        pub root_select: bool,
        #[bits(6)]
        _reserved: u32,
        /// Encoded effective clock granularity.
        #[bits(8)]
        pub effective_granularity: u8,
        #[bits(16)]
        _reserved1: u32,
    }
}
