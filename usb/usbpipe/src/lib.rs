//! USB endpoint pipes
//!
//! This crate binds the endpoints a class driver needs to the endpoints a device actually offers,
//! and manages the pipes that result from it.
//!
//! A driver starts from the raw configuration descriptor of its device and a list of
//! [EndpointMapping]s, one per endpoint it wants. [initialize_from_configuration] walks the
//! descriptor tree ([dp]) and initializes the [Pipe] of each mapping it can satisfy. Afterwards
//! the default control pipe can be probed for its real max packet size ([probe]), and each pipe
//! registered with the host controller ([hc]).
//!
//! Pipe storage always belongs to the driver. Nothing in here allocates, frees or keeps a pipe
//! beyond the call it was passed to.
//!
//! This documentation will refer directly to the relevant standards, which are as follows:
//!
//! - USB2  - [Universal Serial Bus Specification](https://www.usb.org/document-library/usb-20-specification)
//! - HID   - [Device Class Definition for HID 1.11](https://www.usb.org/document-library/device-class-definition-hid-111)
//!
pub extern crate plain;

pub mod binding;
pub mod dp;
pub mod error;
pub mod hc;
pub mod pipe;
pub mod probe;
pub mod profile;
pub mod usb;

pub use crate::binding::{
    endpoint_fits_description, find_endpoint_mapping, initialize_from_configuration, BindReport,
    EndpointDescription, EndpointMapping, ANY,
};
pub use crate::dp::{Descriptor, DescriptorNesting, DescriptorTree, STANDARD_NESTING};
pub use crate::error::{PipeError, Result};
pub use crate::hc::{HcConnection, HcMethod, HcSession, RegisterEndpointArgs};
pub use crate::pipe::{DeviceConnection, Pipe, PipeState, CTRL_PIPE_MIN_PACKET_SIZE};
pub use crate::probe::{probe_default_control, LongTransfer, PipeTransport};
pub use crate::profile::{DriverProfile, DriverProfiles, WantedEndpoint, DRIVER_PROFILES};
