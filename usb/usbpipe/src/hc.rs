//! Registration of endpoints with the host controller.
//!
//! Before a pipe can carry transfers, the host controller has to know about its endpoint. The
//! request carries three machine words, packed as follows (most significant field first):
//!
//! | word | fields                                       |
//! |------|----------------------------------------------|
//! | 0    | `address << 16`, `endpoint << 0`             |
//! | 1    | `speed << 16`, `transfer type << 8`, `direction << 0` |
//! | 2    | `max packet size << 16`, `interval << 0`     |
//!
//! Unregistration sends the address, endpoint number and direction as three unpacked words.
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};

use log::{debug, trace};
use serde::{Deserialize, Serialize};

use crate::error::{PipeError, Result};
use crate::pipe::{Pipe, PipeState};
use crate::usb::{EndpDirection, EndpointTy, UsbSpeed};

/// Requests understood by the host controller's endpoint interface.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HcMethod {
    RegisterEndpoint,
    UnregisterEndpoint,
}

const fn pack2(high: usize, low: usize) -> usize {
    (high << 16) + low
}

const fn pack3(high: usize, middle: usize, low: usize) -> usize {
    (((high << 8) + middle) << 8) + low
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RegisterEndpointArgs {
    pub address: u8,
    pub endpoint_no: u8,
    /// A [UsbSpeed] value, or [UsbSpeed::UNSPECIFIED].
    pub speed: u8,
    pub transfer_type: EndpointTy,
    pub direction: EndpDirection,
    pub max_packet_size: u16,
    pub interval: u16,
}

impl RegisterEndpointArgs {
    pub fn encode(&self) -> [usize; 3] {
        [
            pack2(self.address.into(), self.endpoint_no.into()),
            pack3(
                self.speed.into(),
                self.transfer_type as usize,
                self.direction as usize,
            ),
            pack2(self.max_packet_size.into(), self.interval.into()),
        ]
    }

    pub fn decode(words: [usize; 3]) -> Result<Self> {
        fn field<T: TryFrom<usize>>(value: usize, what: &'static str) -> Result<T> {
            T::try_from(value).or(Err(PipeError::InvalidArgument(what)))
        }

        let [device, endpoint, transfer] = words;
        Ok(Self {
            address: field(device >> 16, "address out of range")?,
            endpoint_no: field(device & 0xFFFF, "endpoint number out of range")?,
            speed: field(endpoint >> 16, "speed out of range")?,
            transfer_type: EndpointTy::from_u8(((endpoint >> 8) & 0xFF) as u8)
                .ok_or(PipeError::InvalidArgument("unknown transfer type"))?,
            direction: EndpDirection::from_u8((endpoint & 0xFF) as u8)
                .ok_or(PipeError::InvalidArgument("unknown direction"))?,
            max_packet_size: field(transfer >> 16, "max packet size out of range")?,
            interval: (transfer & 0xFFFF) as u16,
        })
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct UnregisterEndpointArgs {
    pub address: u8,
    pub endpoint_no: u8,
    pub direction: EndpDirection,
}

impl UnregisterEndpointArgs {
    pub fn encode(&self) -> [usize; 3] {
        [
            self.address.into(),
            self.endpoint_no.into(),
            self.direction as usize,
        ]
    }
}

/// An open line to the host controller.
pub trait HcSession {
    fn is_opened(&self) -> bool;
    fn request(&mut self, method: HcMethod, args: [usize; 3]) -> Result<()>;
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HcRequest {
    pub method: HcMethod,
    pub args: [usize; 3],
}

#[derive(Debug, Serialize, Deserialize)]
pub enum HcResponse {
    Ok,
    /// The request failed with this errno.
    Err(i32),
}

/// A session with the host controller, through its `endpoints` scheme file.
#[derive(Debug)]
pub struct HcConnection {
    scheme: String,
    file: Option<File>,
}

impl HcConnection {
    pub fn new(scheme: String) -> Self {
        Self { scheme, file: None }
    }

    pub fn open(&mut self) -> Result<()> {
        let path = format!("/scheme/{}/endpoints", self.scheme);
        self.file = Some(OpenOptions::new().read(true).write(true).open(path)?);
        Ok(())
    }

    pub fn close(&mut self) {
        self.file = None;
    }
}

impl HcSession for HcConnection {
    fn is_opened(&self) -> bool {
        self.file.is_some()
    }

    fn request(&mut self, method: HcMethod, args: [usize; 3]) -> Result<()> {
        let file = self.file.as_mut().ok_or(PipeError::ConnectionNotOpen)?;
        exchange(file, method, args)
    }
}

/// Writes one JSON request to `channel` and reads the JSON reply.
fn exchange<C: Read + Write>(channel: &mut C, method: HcMethod, args: [usize; 3]) -> Result<()> {
    let json = serde_json::to_vec(&HcRequest { method, args })?;
    let bytes_written = channel.write(&json)?;
    if bytes_written != json.len() {
        return Err(io::Error::new(
            io::ErrorKind::WriteZero,
            "host controller didn't take the whole request",
        )
        .into());
    }

    // a response must never exceed 64 bytes
    let mut buffer = [0u8; 64];
    let bytes_read = channel.read(&mut buffer)?;
    match serde_json::from_slice(&buffer[..bytes_read])? {
        HcResponse::Ok => Ok(()),
        HcResponse::Err(errno) => Err(syscall::Error::new(errno).into()),
    }
}

impl Pipe {
    fn registration_target(&self, session: &dyn HcSession) -> Result<(u8, u8, EndpDirection)> {
        if !session.is_opened() {
            return Err(PipeError::ConnectionNotOpen);
        }
        let wire = self
            .wire()
            .ok_or(PipeError::InvalidArgument("pipe is not initialized"))?;
        Ok((wire.address, self.endpoint_no, self.direction))
    }

    /// Registers the endpoint with the host controller, keeping the device's current speed.
    pub fn register(&mut self, interval: u16, session: &mut dyn HcSession) -> Result<()> {
        self.register_with_speed(None, interval, session)
    }

    pub fn register_with_speed(
        &mut self,
        speed: Option<UsbSpeed>,
        interval: u16,
        session: &mut dyn HcSession,
    ) -> Result<()> {
        let (address, endpoint_no, direction) = self.registration_target(session)?;
        let max_packet_size = u16::try_from(self.max_packet_size)
            .or(Err(PipeError::InvalidArgument("max packet size out of range")))?;

        let args = RegisterEndpointArgs {
            address,
            endpoint_no,
            speed: speed.map_or(UsbSpeed::UNSPECIFIED, |speed| speed as u8),
            transfer_type: self.transfer_type,
            direction,
            max_packet_size,
            interval,
        };
        trace!("registering endpoint {:?}", args);
        session.request(HcMethod::RegisterEndpoint, args.encode())?;

        self.state = PipeState::Registered;
        debug!("registered endpoint {}:{}", address, endpoint_no);
        Ok(())
    }

    pub fn unregister(&mut self, session: &mut dyn HcSession) -> Result<()> {
        let (address, endpoint_no, direction) = self.registration_target(session)?;

        let args = UnregisterEndpointArgs {
            address,
            endpoint_no,
            direction,
        };
        session.request(HcMethod::UnregisterEndpoint, args.encode())?;

        self.state = PipeState::Unregistered;
        debug!("unregistered endpoint {}:{}", address, endpoint_no);
        Ok(())
    }
}
