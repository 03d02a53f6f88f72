//! Standard USB descriptor records.
//!
//! These are the on-the-wire layouts from USB2 chapter 9, as they appear inside a configuration
//! descriptor returned by the device. All records are `#[repr(C, packed)]` and implement
//! [plain::Plain], so they can be reinterpreted directly from a byte slice.
//!
//! See the crate-level documentation for the acronyms used to refer to specific documents.
use serde::{Deserialize, Serialize};

pub use self::config::ConfigDescriptor;
pub use self::device::DeviceDescriptor8Byte;
pub use self::endpoint::{
    EndpDirection, EndpointDescriptor, EndpointTy, HidDescriptor, ENDP_ADDR_DIR_IN,
    ENDP_ADDR_NUM_MASK, ENDP_ATTR_TY_MASK,
};
pub use self::interface::InterfaceDescriptor;
pub use self::setup::{ReqDirection, ReqRecipient, ReqType, Setup, SetupReq};

/// Enumerates the descriptor kinds that can show up while walking a configuration descriptor.
/// (See USB2 Table 9-5, and the HID and Hub class specifications for the class-specific ones)
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[repr(u8)]
pub enum DescriptorKind {
    /// A Device Descriptor. See [DeviceDescriptor8Byte]
    Device = 1,
    /// A Configuration Descriptor. See [ConfigDescriptor]
    Configuration = 2,
    /// A String Descriptor. See (USB2 Section 9.6.7).
    String = 3,
    /// An Interface Descriptor. See [InterfaceDescriptor]
    Interface = 4,
    /// An Endpoint Descriptor. See [EndpointDescriptor]
    Endpoint = 5,
    /// A Device Qualifier. USB2-specific.
    DeviceQualifier = 6,
    /// The "Other Speed Configuration" descriptor. USB2-specific. See (USB2 9.6.4)
    OtherSpeedConfiguration = 7,
    InterfacePower = 8,
    /// A HID class descriptor. See [HidDescriptor]
    Hid = 0x21,
    /// A HID report descriptor, nested below the HID class descriptor.
    HidReport = 0x22,
    /// A USB 2.0 Hub Descriptor.
    Hub = 0x29,
}

impl DescriptorKind {
    pub fn from_u8(kind: u8) -> Option<Self> {
        Some(match kind {
            1 => Self::Device,
            2 => Self::Configuration,
            3 => Self::String,
            4 => Self::Interface,
            5 => Self::Endpoint,
            6 => Self::DeviceQualifier,
            7 => Self::OtherSpeedConfiguration,
            8 => Self::InterfacePower,
            0x21 => Self::Hid,
            0x22 => Self::HidReport,
            0x29 => Self::Hub,
            _ => return None,
        })
    }
}

/// The bus speed of a device, as understood by the host controller.
#[repr(u8)]
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
pub enum UsbSpeed {
    Low = 0,
    Full = 1,
    High = 2,
}

impl UsbSpeed {
    /// The largest speed value the host controller knows about.
    pub const MAX: u8 = 3;

    /// Sent in place of a speed to tell the host controller to keep whatever speed it negotiated
    /// for the device earlier.
    pub const UNSPECIFIED: u8 = Self::MAX + 1;
}

pub(crate) mod config;
pub(crate) mod device;
pub(crate) mod endpoint;
pub(crate) mod interface;
pub(crate) mod setup;
