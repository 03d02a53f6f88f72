//! Endpoint profiles: the endpoints each class driver asks for, read from TOML.
use lazy_static::lazy_static;
use log::error;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::binding::{EndpointDescription, EndpointMapping, ANY};
use crate::error::Result;
use crate::pipe::Pipe;
use crate::usb::{EndpDirection, EndpointTy};

fn any() -> i16 {
    ANY
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct WantedEndpoint {
    pub transfer_type: EndpointTy,
    pub direction: EndpDirection,
    #[serde(default = "any")]
    pub class: i16,
    #[serde(default = "any")]
    pub subclass: i16,
    #[serde(default = "any")]
    pub protocol: i16,
    #[serde(default = "any")]
    pub interface: i16,
    #[serde(default = "any")]
    pub alternate_setting: i16,
    #[serde(default)]
    pub flags: u32,
}

impl WantedEndpoint {
    pub fn description(&self) -> EndpointDescription {
        EndpointDescription {
            flags: self.flags,
            ..EndpointDescription::new(self.transfer_type, self.direction).with_class(
                self.class,
                self.subclass,
                self.protocol,
            )
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct DriverProfile {
    pub name: String,
    pub endpoints: SmallVec<[WantedEndpoint; 4]>,
}

impl DriverProfile {
    /// Builds the mapping list for this driver, handing out `pipes` in order.
    ///
    /// Endpoints beyond the number of supplied pipes get a mapping without a pipe, which the
    /// binder never initializes.
    pub fn mappings<'p, 'd>(&self, pipes: &'p mut [Pipe]) -> Vec<EndpointMapping<'p, 'd>> {
        let mut pipes = pipes.iter_mut();
        self.endpoints
            .iter()
            .map(|wanted| {
                EndpointMapping::with_slot(wanted.description(), pipes.next())
                    .on_interface(wanted.interface, wanted.alternate_setting)
            })
            .collect()
    }
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct DriverProfiles {
    pub drivers: Vec<DriverProfile>,
}

impl DriverProfiles {
    pub fn from_slice(toml: &[u8]) -> Result<Self> {
        Ok(toml::from_slice(toml)?)
    }

    pub fn find(&self, name: &str) -> Option<&DriverProfile> {
        self.drivers.iter().find(|driver| driver.name == name)
    }
}

const EMBEDDED_PROFILES: &[u8] = include_bytes!("../endpoints.toml");

lazy_static! {
    /// The profiles of the in-tree class drivers.
    pub static ref DRIVER_PROFILES: DriverProfiles = DriverProfiles::from_slice(EMBEDDED_PROFILES)
        .unwrap_or_else(|err| {
            error!("embedded endpoint profiles are invalid: {}", err);
            DriverProfiles::default()
        });
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::error::PipeError;

    #[test]
    fn embedded_profiles() {
        let profiles = DriverProfiles::from_slice(EMBEDDED_PROFILES).unwrap();
        assert_eq!(profiles.drivers.len(), DRIVER_PROFILES.drivers.len());

        let scsi = DRIVER_PROFILES.find("usbscsid").unwrap();
        assert_eq!(scsi.endpoints.len(), 2);
        assert_eq!(scsi.endpoints[0].transfer_type, EndpointTy::Bulk);
        assert_eq!(scsi.endpoints[0].direction, EndpDirection::In);
        assert_eq!(scsi.endpoints[1].direction, EndpDirection::Out);
        assert_eq!(
            scsi.endpoints[0].description().interface_protocol,
            0x50
        );

        let hid = DRIVER_PROFILES.find("usbhidd").unwrap();
        assert_eq!(hid.endpoints[0].subclass, ANY);
        assert_eq!(hid.endpoints[0].interface, ANY);

        assert_eq!(DRIVER_PROFILES.find("usbhubd").unwrap().endpoints[0].interface, 0);
        assert!(DRIVER_PROFILES.find("ps2d").is_none());
    }

    #[test]
    fn omitted_filters_are_wildcards() {
        let profiles = DriverProfiles::from_slice(
            br#"
            [[drivers]]
            name = "test"

            [[drivers.endpoints]]
            transfer_type = "isochronous"
            direction = "out"
            flags = 3
            "#,
        )
        .unwrap();

        let wanted = &profiles.drivers[0].endpoints[0];
        let description = wanted.description();
        assert_eq!(description.transfer_type, EndpointTy::Isoch);
        assert_eq!(description.interface_class, ANY);
        assert_eq!(description.interface_subclass, ANY);
        assert_eq!(description.interface_protocol, ANY);
        assert_eq!(description.flags, 3);
        assert_eq!(wanted.alternate_setting, ANY);
    }

    #[test]
    fn invalid_profiles() {
        let err = DriverProfiles::from_slice(
            br#"
            [[drivers]]
            name = "test"

            [[drivers.endpoints]]
            transfer_type = "bulky"
            direction = "in"
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, PipeError::Profile(_)));
    }

    #[test]
    fn extra_endpoints_get_no_pipe() {
        let scsi = DRIVER_PROFILES.find("usbscsid").unwrap();
        let mut pipes = [Pipe::default()];

        let mappings = scsi.mappings(&mut pipes);

        assert_eq!(mappings.len(), 2);
        assert!(mappings[0].pipe.is_some());
        assert!(mappings[1].pipe.is_none());
        assert_eq!(mappings[1].description.direction, EndpDirection::Out);
        assert_eq!(mappings[0].interface_no, ANY);
    }
}
