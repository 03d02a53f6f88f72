//! Binding of driver-requested endpoints to the endpoints a device actually has.
//!
//! A driver describes the endpoints it wants as a list of [EndpointMapping]s, each carrying an
//! [EndpointDescription] and a pipe to fill in. [initialize_from_configuration] then walks the
//! configuration descriptor and initializes the pipe of every mapping it can satisfy.
use std::sync::Arc;

use log::{debug, trace, warn};
use serde::Serialize;

use crate::dp::{Descriptor, DescriptorTree};
use crate::error::{PipeError, Result};
use crate::pipe::{DeviceConnection, Pipe};
use crate::usb::{
    ConfigDescriptor, DescriptorKind, EndpDirection, EndpointDescriptor, EndpointTy,
    InterfaceDescriptor,
};

/// Value of a class, subclass, protocol, interface or alternate setting filter that matches
/// anything.
pub const ANY: i16 = -1;

/// The properties of an endpoint, either wanted by a driver or found in a descriptor.
///
/// Transfer type and direction always have to agree. Interface class, subclass and protocol are
/// only compared when the wanted value is non-negative.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct EndpointDescription {
    pub transfer_type: EndpointTy,
    pub direction: EndpDirection,
    pub interface_class: i16,
    pub interface_subclass: i16,
    pub interface_protocol: i16,
    /// Driver-specific flags, never looked at while binding.
    pub flags: u32,
}

impl EndpointDescription {
    /// An endpoint of any interface class.
    pub const fn new(transfer_type: EndpointTy, direction: EndpDirection) -> Self {
        Self {
            transfer_type,
            direction,
            interface_class: ANY,
            interface_subclass: ANY,
            interface_protocol: ANY,
            flags: 0,
        }
    }

    pub const fn with_class(mut self, class: i16, subclass: i16, protocol: i16) -> Self {
        self.interface_class = class;
        self.interface_subclass = subclass;
        self.interface_protocol = protocol;
        self
    }

    fn found(endpoint: &EndpointDescriptor, interface: &InterfaceDescriptor) -> Self {
        Self::new(endpoint.ty(), endpoint.direction()).with_class(
            interface.class.into(),
            interface.sub_class.into(),
            interface.protocol.into(),
        )
    }
}

/// Whether a `found` endpoint satisfies the `wanted` one.
pub fn endpoint_fits_description(
    wanted: &EndpointDescription,
    found: &EndpointDescription,
) -> bool {
    fn fits(wanted: i16, found: i16) -> bool {
        wanted < 0 || wanted == found
    }

    wanted.direction == found.direction
        && wanted.transfer_type == found.transfer_type
        && fits(wanted.interface_class, found.interface_class)
        && fits(wanted.interface_subclass, found.interface_subclass)
        && fits(wanted.interface_protocol, found.interface_protocol)
}

/// One endpoint a driver wants, with the pipe to initialize for it.
///
/// `present`, `descriptor` and `interface` are owned by [initialize_from_configuration], which
/// overwrites them on every call.
#[derive(Debug)]
pub struct EndpointMapping<'p, 'd> {
    /// Pipe to initialize. Must be supplied by the driver for the mapping to be bound.
    pub pipe: Option<&'p mut Pipe>,
    pub description: EndpointDescription,
    /// Interface number the endpoint has to belong to, or [ANY].
    pub interface_no: i16,
    /// Alternate setting the endpoint has to belong to, or [ANY].
    pub interface_setting: i16,
    /// Whether the endpoint was found and its pipe initialized.
    pub present: bool,
    /// The endpoint descriptor inside the configuration descriptor.
    pub descriptor: Option<Descriptor<'d>>,
    /// The interface descriptor the endpoint belongs to.
    pub interface: Option<Descriptor<'d>>,
}

impl<'p, 'd> EndpointMapping<'p, 'd> {
    pub fn new(description: EndpointDescription, pipe: &'p mut Pipe) -> Self {
        Self::with_slot(description, Some(pipe))
    }

    pub fn with_slot(description: EndpointDescription, pipe: Option<&'p mut Pipe>) -> Self {
        Self {
            pipe,
            description,
            interface_no: ANY,
            interface_setting: ANY,
            present: false,
            descriptor: None,
            interface: None,
        }
    }

    /// Restricts the mapping to one interface number and alternate setting.
    pub fn on_interface(mut self, interface_no: i16, interface_setting: i16) -> Self {
        self.interface_no = interface_no;
        self.interface_setting = interface_setting;
        self
    }

    fn reset(&mut self) {
        self.present = false;
        self.descriptor = None;
        self.interface = None;
    }

    fn accepts_interface(&self, interface: &InterfaceDescriptor) -> bool {
        (self.interface_no < 0 || self.interface_no == i16::from(interface.number))
            && (self.interface_setting < 0
                || self.interface_setting == i16::from(interface.alternate_setting))
    }
}

/// Finds the first mapping, in list order, that accepts an endpoint `found` on `interface`.
///
/// Mappings that are already bound are not skipped.
pub fn find_endpoint_mapping(
    mappings: &[EndpointMapping<'_, '_>],
    found: &EndpointDescription,
    interface: &InterfaceDescriptor,
) -> Option<usize> {
    mappings.iter().position(|mapping| {
        mapping.accepts_interface(interface)
            && endpoint_fits_description(&mapping.description, found)
    })
}

/// Counters describing a finished bind.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
pub struct BindReport {
    pub interfaces: usize,
    pub endpoints: usize,
    pub bound: usize,
    /// Endpoints that matched a mapping which was already bound, and were dropped.
    pub collisions: usize,
}

struct Binder<'m, 'p, 'd> {
    tree: DescriptorTree<'d>,
    mappings: &'m mut [EndpointMapping<'p, 'd>],
    wire: &'m Arc<DeviceConnection>,
    report: BindReport,
}

impl<'m, 'p, 'd> Binder<'m, 'p, 'd> {
    fn process_endpoint(
        &mut self,
        interface: Descriptor<'d>,
        if_desc: &InterfaceDescriptor,
        endpoint: Descriptor<'d>,
    ) -> Result<()> {
        let endp_desc = *endpoint
            .parse::<EndpointDescriptor>()
            .ok_or(PipeError::StructureTooSmall(endpoint.bytes().len()))?;
        let found = EndpointDescription::found(&endp_desc, if_desc);

        let index =
            find_endpoint_mapping(self.mappings, &found, if_desc).ok_or(PipeError::NotFound)?;
        let mapping = &mut self.mappings[index];

        let pipe = mapping
            .pipe
            .as_deref_mut()
            .ok_or(PipeError::MissingPipeStorage)?;
        if mapping.present {
            return Err(PipeError::AlreadyBound);
        }

        pipe.initialize(
            self.wire,
            endp_desc.number(),
            found.transfer_type,
            endp_desc.max_packet_size().into(),
            found.direction,
        )?;

        mapping.present = true;
        mapping.descriptor = Some(endpoint);
        mapping.interface = Some(interface);
        Ok(())
    }

    fn process_interface(&mut self, interface: Descriptor<'d>) -> Result<()> {
        let if_desc = *interface
            .parse::<InterfaceDescriptor>()
            .ok_or(PipeError::StructureTooSmall(interface.bytes().len()))?;

        let mut descriptor = self.tree.nested(&interface).ok_or(PipeError::NotFound)?;
        loop {
            trace!("visiting {:?}", descriptor);
            if descriptor.is(DescriptorKind::Endpoint) {
                self.report.endpoints += 1;
                match self.process_endpoint(interface, &if_desc, descriptor) {
                    Ok(()) => self.report.bound += 1,
                    Err(PipeError::AlreadyBound) => {
                        self.report.collisions += 1;
                        debug!(
                            "dropping endpoint at offset {}: its mapping is already bound",
                            descriptor.offset()
                        );
                    }
                    Err(err) if err.is_soft() => debug!(
                        "skipping endpoint at offset {}: {}",
                        descriptor.offset(),
                        err
                    ),
                    Err(err) => warn!(
                        "skipping malformed endpoint at offset {}: {}",
                        descriptor.offset(),
                        err
                    ),
                }
            }

            descriptor = match self.tree.sibling(&interface, &descriptor) {
                Some(next) => next,
                None => break,
            };
        }
        Ok(())
    }
}

/// Initializes endpoint pipes from a configuration descriptor.
///
/// `configuration` is the full configuration descriptor, as retrieved from the device. Every
/// mapping is reset first. Afterwards a mapping has `present` set when an endpoint fitting it
/// was found; its pipe is then initialized and `descriptor`/`interface` point into
/// `configuration`. Pipes of mappings that were not found are left untouched.
///
/// Problems with individual endpoints do not fail the call; only a buffer too small to hold a
/// configuration descriptor, or a configuration without any interface, does.
pub fn initialize_from_configuration<'p, 'd>(
    mappings: &mut [EndpointMapping<'p, 'd>],
    configuration: &'d [u8],
    connection: &Arc<DeviceConnection>,
) -> Result<BindReport> {
    if configuration.len() < ConfigDescriptor::SIZE {
        return Err(PipeError::StructureTooSmall(configuration.len()));
    }

    for mapping in mappings.iter_mut() {
        mapping.reset();
    }

    let tree = DescriptorTree::standard(configuration);
    let root = tree.root().ok_or(PipeError::NotFound)?;
    let mut interface = tree.nested(&root).ok_or(PipeError::NotFound)?;

    let mut binder = Binder {
        tree,
        mappings,
        wire: connection,
        report: BindReport::default(),
    };

    loop {
        binder.report.interfaces += 1;
        if let Err(err) = binder.process_interface(interface) {
            debug!(
                "skipping interface at offset {}: {}",
                interface.offset(),
                err
            );
        }

        interface = match tree.sibling(&root, &interface) {
            Some(next) => next,
            None => break,
        };
    }

    debug!(
        "device {}: bound {} of {} mappings ({:?})",
        connection.address,
        binder.report.bound,
        binder.mappings.len(),
        binder.report
    );
    Ok(binder.report)
}

#[cfg(test)]
mod test {
    use super::*;

    fn interface(number: u8, alternate_setting: u8, class: u8) -> InterfaceDescriptor {
        InterfaceDescriptor {
            length: 9,
            kind: DescriptorKind::Interface as u8,
            number,
            alternate_setting,
            endpoints: 1,
            class,
            sub_class: 6,
            protocol: 0x50,
            interface_str: 0,
        }
    }

    fn bulk_in(class: i16) -> EndpointDescription {
        EndpointDescription::new(EndpointTy::Bulk, EndpDirection::In).with_class(class, ANY, ANY)
    }

    #[test]
    fn direction_and_type_never_wildcard() {
        let wanted = bulk_in(ANY);
        assert!(endpoint_fits_description(&wanted, &bulk_in(8)));
        assert!(!endpoint_fits_description(
            &wanted,
            &EndpointDescription::new(EndpointTy::Bulk, EndpDirection::Out)
        ));
        assert!(!endpoint_fits_description(
            &wanted,
            &EndpointDescription::new(EndpointTy::Interrupt, EndpDirection::In)
        ));
    }

    #[test]
    fn class_wildcards() {
        let found = EndpointDescription::new(EndpointTy::Bulk, EndpDirection::In)
            .with_class(8, 6, 0x50);
        assert!(endpoint_fits_description(&bulk_in(ANY), &found));
        assert!(endpoint_fits_description(&bulk_in(8), &found));
        assert!(!endpoint_fits_description(&bulk_in(5), &found));

        let exact = bulk_in(8).with_class(8, 6, 0x50);
        assert!(endpoint_fits_description(&exact, &found));
        let wrong_protocol = bulk_in(8).with_class(8, 6, 0x62);
        assert!(!endpoint_fits_description(&wrong_protocol, &found));
        let wrong_subclass = bulk_in(8).with_class(8, 1, ANY);
        assert!(!endpoint_fits_description(&wrong_subclass, &found));
    }

    #[test]
    fn first_mapping_in_list_order_wins() {
        let mut pipes: Vec<Pipe> = (0..3).map(|_| Pipe::default()).collect();
        let mut iter = pipes.iter_mut();
        let mut mappings = vec![
            EndpointMapping::new(
                EndpointDescription::new(EndpointTy::Interrupt, EndpDirection::In),
                iter.next().unwrap(),
            ),
            EndpointMapping::new(bulk_in(ANY), iter.next().unwrap()),
            EndpointMapping::new(bulk_in(8), iter.next().unwrap()),
        ];
        let found = bulk_in(8).with_class(8, 6, 0x50);

        assert_eq!(
            find_endpoint_mapping(&mappings, &found, &interface(0, 0, 8)),
            Some(1)
        );

        // Being bound already does not make a mapping lose the selection.
        mappings[1].present = true;
        assert_eq!(
            find_endpoint_mapping(&mappings, &found, &interface(0, 0, 8)),
            Some(1)
        );
    }

    #[test]
    fn interface_scope() {
        let mut pipe = Pipe::default();
        let mappings = [EndpointMapping::new(bulk_in(ANY), &mut pipe).on_interface(2, ANY)];
        let found = bulk_in(8);

        assert_eq!(
            find_endpoint_mapping(&mappings, &found, &interface(2, 1, 8)),
            Some(0)
        );
        assert_eq!(
            find_endpoint_mapping(&mappings, &found, &interface(3, 0, 8)),
            None
        );
    }

    #[test]
    fn alternate_setting_scope() {
        let mut pipe = Pipe::default();
        let mappings = [EndpointMapping::new(bulk_in(ANY), &mut pipe).on_interface(ANY, 1)];
        let found = bulk_in(8);

        assert_eq!(
            find_endpoint_mapping(&mappings, &found, &interface(4, 1, 8)),
            Some(0)
        );
        assert_eq!(
            find_endpoint_mapping(&mappings, &found, &interface(4, 0, 8)),
            None
        );
    }

    #[test]
    fn too_small_configuration_is_untouched() {
        let mut pipe = Pipe::default();
        let mut mappings = [EndpointMapping::new(bulk_in(ANY), &mut pipe)];
        mappings[0].present = true;

        let wire = DeviceConnection::new(0, 1);
        let config = [0x09, 0x02, 0x09, 0x00];
        let err = initialize_from_configuration(&mut mappings, &config, &wire).unwrap_err();

        assert!(matches!(err, PipeError::StructureTooSmall(4)));
        assert!(mappings[0].present);
    }
}
