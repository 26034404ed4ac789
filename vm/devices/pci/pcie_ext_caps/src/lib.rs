// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! PCI Express 3.1 extended capability register layouts.
//!
//! Bit-exact decode and encode of the PASID, DPC, L1 PM Substates, and PTM
//! extended capability structures. Callers hand in byte buffers already
//! sliced to a capability; finding capabilities in config space is left to
//! them.

#![forbid(unsafe_code)]

pub mod caps;
pub mod spec;

#[cfg(test)]
mod test_helpers;

pub use caps::AnyExtendedCapability;
pub use caps::Error;
pub use caps::ExtendedCapability;
