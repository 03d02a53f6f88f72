//! Endpoint pipes.
//!
//! A [Pipe] is the host side of one endpoint of one device. The storage for a pipe always
//! belongs to the driver: this crate fills it in and updates it, but never allocates or frees
//! it.
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::Result;
use crate::usb::{EndpDirection, EndpointTy};

/// Smallest max packet size a default control pipe may have (USB2 5.5.3).
pub const CTRL_PIPE_MIN_PACKET_SIZE: usize = 8;

/// The connection to one USB device ("the wire"), shared by all of its pipes.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DeviceConnection {
    /// Handle of the host controller the device is attached to.
    pub hc_handle: usize,
    /// The USB address assigned to the device.
    pub address: u8,
}

impl DeviceConnection {
    pub fn new(hc_handle: usize, address: u8) -> Arc<Self> {
        Arc::new(Self {
            hc_handle,
            address,
        })
    }
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum PipeState {
    /// Fresh driver-allocated storage.
    Uninitialized,
    /// Endpoint parameters are set.
    Initialized,
    /// Default control pipe whose max packet size was read from the device.
    Probed,
    /// Known to the host controller.
    Registered,
    /// Removed from the host controller again.
    Unregistered,
}

/// Bookkeeping of the sessions opened on a pipe. Maintained by the transfer layer.
#[derive(Debug, Default)]
pub struct SessionState {
    /// Phone to the host controller, while a session is open.
    pub hc_phone: Option<usize>,
    /// Number of session holders currently using the pipe.
    pub refcount: usize,
}

#[derive(Debug)]
pub struct Pipe {
    pub(crate) state: PipeState,
    pub(crate) wire: Option<Arc<DeviceConnection>>,
    pub endpoint_no: u8,
    pub transfer_type: EndpointTy,
    pub max_packet_size: usize,
    pub direction: EndpDirection,
    /// Whether a halt condition is cleared automatically when a transfer stalls.
    pub auto_reset_halt: bool,
    session: Mutex<SessionState>,
}

impl Default for Pipe {
    fn default() -> Self {
        Self {
            state: PipeState::Uninitialized,
            wire: None,
            endpoint_no: 0,
            transfer_type: EndpointTy::Ctrl,
            max_packet_size: 0,
            direction: EndpDirection::Bidirectional,
            auto_reset_halt: false,
            session: Mutex::new(SessionState::default()),
        }
    }
}

impl Pipe {
    /// Initializes the pipe for an endpoint of the device behind `connection`.
    ///
    /// Any previous contents of the pipe are discarded, including its session bookkeeping.
    pub fn initialize(
        &mut self,
        connection: &Arc<DeviceConnection>,
        endpoint_no: u8,
        transfer_type: EndpointTy,
        max_packet_size: usize,
        direction: EndpDirection,
    ) -> Result<()> {
        *self = Self {
            state: PipeState::Initialized,
            wire: Some(Arc::clone(connection)),
            endpoint_no,
            transfer_type,
            max_packet_size,
            direction,
            auto_reset_halt: false,
            session: Mutex::new(SessionState::default()),
        };

        log::trace!(
            "initialized pipe {}:{} {:?} {:?} mps {}",
            connection.address,
            endpoint_no,
            transfer_type,
            direction,
            max_packet_size
        );
        Ok(())
    }

    /// Initializes the pipe as the default control pipe (endpoint zero).
    ///
    /// The max packet size starts out at the smallest legal value; see
    /// [crate::probe::probe_default_control] for finding the real one.
    pub fn initialize_default_control(&mut self, connection: &Arc<DeviceConnection>) -> Result<()> {
        let result = self.initialize(
            connection,
            0,
            EndpointTy::Ctrl,
            CTRL_PIPE_MIN_PACKET_SIZE,
            EndpDirection::Bidirectional,
        );
        self.auto_reset_halt = true;
        result
    }

    pub fn state(&self) -> PipeState {
        self.state
    }

    /// The device connection, once the pipe is initialized.
    pub fn wire(&self) -> Option<&Arc<DeviceConnection>> {
        self.wire.as_ref()
    }

    pub fn is_default_control(&self) -> bool {
        self.direction == EndpDirection::Bidirectional
            && self.transfer_type == EndpointTy::Ctrl
            && self.endpoint_no == 0
    }

    /// Locks the session bookkeeping of the pipe.
    pub fn session(&self) -> MutexGuard<'_, SessionState> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn refcount(&self) -> usize {
        self.session().refcount
    }
}
