use super::DescriptorKind;

/// The setup packet opening every control transfer (USB2 9.3).
#[repr(C, packed)]
#[derive(Clone, Copy, Debug, Default)]
pub struct Setup {
    pub kind: u8,
    pub request: u8,
    pub value: u16,
    pub index: u16,
    pub length: u16,
}

unsafe impl plain::Plain for Setup {}

#[repr(u8)]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ReqDirection {
    HostToDevice = 0,
    DeviceToHost = 1,
}

#[repr(u8)]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ReqType {
    /// Standard device requests, such as GET_DESCRIPTOR.
    Standard = 0,
    Class = 1,
    Vendor = 2,
}

#[repr(u8)]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ReqRecipient {
    Device = 0,
    Interface = 1,
    Endpoint = 2,
}

#[repr(u8)]
pub enum SetupReq {
    GetDescriptor = 0x06,
}

pub const USB_SETUP_DIR_BIT: u8 = 1 << 7;
pub const USB_SETUP_DIR_SHIFT: u8 = 7;
pub const USB_SETUP_REQ_TY_SHIFT: u8 = 5;

impl Setup {
    pub fn direction(&self) -> ReqDirection {
        if self.kind & USB_SETUP_DIR_BIT == 0 {
            ReqDirection::HostToDevice
        } else {
            ReqDirection::DeviceToHost
        }
    }

    pub const fn request_kind(
        direction: ReqDirection,
        ty: ReqType,
        recipient: ReqRecipient,
    ) -> u8 {
        ((direction as u8) << USB_SETUP_DIR_SHIFT)
            | ((ty as u8) << USB_SETUP_REQ_TY_SHIFT)
            | (recipient as u8)
    }

    /// A standard GET_DESCRIPTOR request addressed to the device.
    pub const fn get_descriptor(
        kind: DescriptorKind,
        index: u8,
        language: u16,
        length: u16,
    ) -> Self {
        Self {
            kind: Self::request_kind(
                ReqDirection::DeviceToHost,
                ReqType::Standard,
                ReqRecipient::Device,
            ),
            request: SetupReq::GetDescriptor as u8,
            value: ((kind as u16) << 8) | (index as u16),
            index: language,
            length,
        }
    }
}
