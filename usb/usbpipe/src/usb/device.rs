//! The leading part of the "Device" USB Descriptor (USB2 9.6.1).

/// The 8-byte version of the Device Descriptor
///
/// Before the maximum packet size of the default control pipe is known, only the first eight
/// bytes of the device descriptor can be requested safely: eight bytes is the smallest control
/// packet any device may use, and the field holding the real size (`packet_size`,
/// bMaxPacketSize0) is the last of them.
#[repr(C, packed)]
#[derive(Clone, Copy, Debug, Default)]
pub struct DeviceDescriptor8Byte {
    /// bLength
    pub length: u8,
    /// bDescriptorType, always [super::DescriptorKind::Device]
    pub kind: u8,
    /// bcdUSB
    pub usb: u16,
    /// bDeviceClass
    pub class: u8,
    /// bDeviceSubClass
    pub sub_class: u8,
    /// bDeviceProtocol
    pub protocol: u8,
    /// The maximum packet size for endpoint 0.
    ///
    /// bMaxPacketSize0, at offset 7.
    pub packet_size: u8,
}

unsafe impl plain::Plain for DeviceDescriptor8Byte {}

impl DeviceDescriptor8Byte {
    /// Offset of bMaxPacketSize0 within the descriptor.
    pub const PACKET_SIZE_OFFSET: usize = 7;
}
