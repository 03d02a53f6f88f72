use plain::Plain;
use serde::{Deserialize, Serialize};

/// The descriptor for a USB Endpoint.
///
/// Each endpoint of a particular interface has its own descriptor. The information in this
/// structure is used by the host to determine the bandwidth requirements of the endpoint.
///
/// This is returned as part of the Configuration Descriptor, and cannot be requested
/// individually.
///
/// See USB2 9.6.6
#[repr(C, packed)]
#[derive(Clone, Copy, Debug, Default)]
pub struct EndpointDescriptor {
    pub length: u8,
    pub kind: u8,
    pub address: u8,
    pub attributes: u8,
    pub max_packet_size: u16,
    pub interval: u8,
}

unsafe impl Plain for EndpointDescriptor {}

/// Mask that is ANDed to the [EndpointDescriptor].attributes byte to get the endpoint type.
pub const ENDP_ATTR_TY_MASK: u8 = 0x3;
/// Mask that is ANDed to the [EndpointDescriptor].address byte to get the endpoint number.
pub const ENDP_ADDR_NUM_MASK: u8 = 0x0F;
/// Set in [EndpointDescriptor].address for device-to-host endpoints.
pub const ENDP_ADDR_DIR_IN: u8 = 0x80;

/// The transfer type of an endpoint. The discriminants match the two low bits of bmAttributes.
#[repr(u8)]
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
pub enum EndpointTy {
    #[serde(rename = "control")]
    Ctrl = 0,
    #[serde(rename = "isochronous")]
    Isoch = 1,
    #[serde(rename = "bulk")]
    Bulk = 2,
    #[serde(rename = "interrupt")]
    Interrupt = 3,
}

/// The direction of an endpoint. The discriminants are the values the host controller expects.
#[repr(u8)]
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EndpDirection {
    In = 0,
    Out = 1,
    #[serde(rename = "both")]
    Bidirectional = 2,
}

impl EndpointTy {
    pub fn from_u8(ty: u8) -> Option<Self> {
        Some(match ty {
            0 => Self::Ctrl,
            1 => Self::Isoch,
            2 => Self::Bulk,
            3 => Self::Interrupt,
            _ => return None,
        })
    }
}

impl EndpDirection {
    pub fn from_u8(direction: u8) -> Option<Self> {
        Some(match direction {
            0 => Self::In,
            1 => Self::Out,
            2 => Self::Bidirectional,
            _ => return None,
        })
    }
}

impl EndpointDescriptor {
    pub fn ty(self) -> EndpointTy {
        match self.attributes & ENDP_ATTR_TY_MASK {
            0 => EndpointTy::Ctrl,
            1 => EndpointTy::Isoch,
            2 => EndpointTy::Bulk,
            _ => EndpointTy::Interrupt,
        }
    }
    /// The endpoint number, 0 to 15.
    pub fn number(self) -> u8 {
        self.address & ENDP_ADDR_NUM_MASK
    }
    pub fn direction(self) -> EndpDirection {
        if self.address & ENDP_ADDR_DIR_IN != 0 {
            EndpDirection::In
        } else {
            EndpDirection::Out
        }
    }
    pub fn max_packet_size(self) -> u16 {
        u16::from_le(self.max_packet_size)
    }
}

/// The HID class descriptor (HID 1.11 section 6.2.1), with exactly one class descriptor entry.
/// It sits between an interface descriptor and that interface's endpoints.
#[repr(C, packed)]
#[derive(Clone, Copy, Debug, Default)]
pub struct HidDescriptor {
    pub length: u8,
    pub kind: u8,
    pub hid_spec_release: u16,
    pub country_code: u8,
    pub num_descriptors: u8,
    pub report_desc_ty: u8,
    pub report_desc_len: u16,
}

unsafe impl Plain for HidDescriptor {}
