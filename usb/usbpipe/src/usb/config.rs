use plain::Plain;

/// The header of a Configuration Descriptor (USB2 9.6.3).
///
/// `total_length` covers this header and every interface, endpoint and class-specific descriptor
/// that follows it. Those follow in a flat stream; see [crate::dp] for how they nest.
#[repr(C, packed)]
#[derive(Clone, Copy, Debug, Default)]
pub struct ConfigDescriptor {
    pub length: u8,
    pub kind: u8,
    pub total_length: u16,
    pub interfaces: u8,
    pub configuration_value: u8,
    pub configuration_str: u8,
    pub attributes: u8,
    pub max_power: u8,
}

unsafe impl Plain for ConfigDescriptor {}

impl ConfigDescriptor {
    /// The smallest buffer that can hold a configuration descriptor at all.
    pub const SIZE: usize = core::mem::size_of::<Self>();
}
