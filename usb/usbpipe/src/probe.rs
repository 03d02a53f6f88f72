//! Probing of the default control pipe.
use std::mem;

use log::{trace, warn};

use crate::error::{PipeError, Result};
use crate::pipe::{Pipe, PipeState};
use crate::usb::{DescriptorKind, DeviceDescriptor8Byte, Setup};

/// Number of times the device descriptor is requested before giving up.
pub const PROBE_ATTEMPTS: usize = 3;

/// Control transfers on a pipe, as provided by the transfer layer.
pub trait PipeTransport {
    /// Reserves `pipe` for a sequence of transfers, keeping other users away until
    /// [PipeTransport::end_long_transfer].
    fn start_long_transfer(&mut self, pipe: &Pipe) -> Result<()>;
    fn end_long_transfer(&mut self, pipe: &Pipe);

    /// Issues a control read on `pipe` and returns the number of bytes the device sent.
    fn control_read(&mut self, pipe: &Pipe, setup: &Setup, buffer: &mut [u8]) -> Result<usize>;
}

/// A long transfer reservation, released when dropped.
pub struct LongTransfer<'a, T: PipeTransport + ?Sized> {
    transport: &'a mut T,
    pipe: &'a Pipe,
}

impl<'a, T: PipeTransport + ?Sized> LongTransfer<'a, T> {
    pub fn start(transport: &'a mut T, pipe: &'a Pipe) -> Result<Self> {
        transport.start_long_transfer(pipe)?;
        Ok(Self { transport, pipe })
    }

    pub fn get_descriptor(
        &mut self,
        kind: DescriptorKind,
        index: u8,
        language: u16,
        buffer: &mut [u8],
    ) -> Result<usize> {
        get_descriptor(self.transport, self.pipe, kind, index, language, buffer)
    }
}

impl<T: PipeTransport + ?Sized> Drop for LongTransfer<'_, T> {
    fn drop(&mut self) {
        self.transport.end_long_transfer(self.pipe);
    }
}

/// Requests a standard descriptor from the device, filling as much of `buffer` as the device
/// returns.
pub fn get_descriptor<T: PipeTransport + ?Sized>(
    transport: &mut T,
    pipe: &Pipe,
    kind: DescriptorKind,
    index: u8,
    language: u16,
    buffer: &mut [u8],
) -> Result<usize> {
    let length = u16::try_from(buffer.len())
        .or(Err(PipeError::InvalidArgument("descriptor buffer too large")))?;
    let setup = Setup::get_descriptor(kind, index, language, length);
    transport.control_read(pipe, &setup, buffer)
}

/// Finds out the real max packet size of a default control pipe.
///
/// Reads the first eight bytes of the device descriptor, retrying up to [PROBE_ATTEMPTS] times,
/// and takes bMaxPacketSize0 from them. The pipe is reserved for the whole time. After the last
/// failed attempt, the error of that attempt is returned.
pub fn probe_default_control<T: PipeTransport + ?Sized>(
    pipe: &mut Pipe,
    transport: &mut T,
) -> Result<()> {
    if pipe.state() == PipeState::Uninitialized {
        return Err(PipeError::InvalidArgument("pipe is not initialized"));
    }
    if !pipe.is_default_control() {
        return Err(PipeError::InvalidArgument(
            "only the default control pipe can be probed",
        ));
    }

    let mut dev_desc = [0u8; mem::size_of::<DeviceDescriptor8Byte>()];

    let outcome = {
        let mut transfer = LongTransfer::start(transport, pipe)?;
        let mut attempt = 0;
        loop {
            attempt += 1;
            let err = match transfer.get_descriptor(DescriptorKind::Device, 0, 0, &mut dev_desc) {
                Ok(len) if len == dev_desc.len() => break Ok(()),
                Ok(len) => PipeError::RangeMismatch {
                    expected: dev_desc.len(),
                    actual: len,
                },
                Err(err) => err,
            };
            if attempt == PROBE_ATTEMPTS {
                break Err(err);
            }
            warn!(
                "probing default control pipe, attempt {}/{} failed: {}",
                attempt, PROBE_ATTEMPTS, err
            );
        }
    };
    outcome?;

    let packet_size = dev_desc[DeviceDescriptor8Byte::PACKET_SIZE_OFFSET];
    trace!(
        "default control pipe max packet size {} (was {})",
        packet_size,
        pipe.max_packet_size
    );
    pipe.max_packet_size = packet_size.into();
    if pipe.state == PipeState::Initialized {
        pipe.state = PipeState::Probed;
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use std::collections::VecDeque;

    use super::*;
    use crate::pipe::DeviceConnection;
    use crate::usb::{EndpDirection, EndpointTy};

    const DEVICE_PREFIX: [u8; 8] = [0x12, 0x01, 0x00, 0x02, 0x00, 0x00, 0x00, 0x40];

    /// Answers control reads from a queue; each entry is the number of bytes to return, or an
    /// errno.
    #[derive(Default)]
    struct MockTransport {
        replies: VecDeque<std::result::Result<usize, i32>>,
        attempts: usize,
        reserved: bool,
        reservations: usize,
        unreserved_reads: usize,
    }

    impl MockTransport {
        fn with(replies: &[std::result::Result<usize, i32>]) -> Self {
            Self {
                replies: replies.iter().copied().collect(),
                ..Self::default()
            }
        }
    }

    impl PipeTransport for MockTransport {
        fn start_long_transfer(&mut self, _pipe: &Pipe) -> Result<()> {
            assert!(!self.reserved);
            self.reserved = true;
            self.reservations += 1;
            Ok(())
        }

        fn end_long_transfer(&mut self, _pipe: &Pipe) {
            assert!(self.reserved);
            self.reserved = false;
        }

        fn control_read(
            &mut self,
            _pipe: &Pipe,
            setup: &Setup,
            buffer: &mut [u8],
        ) -> Result<usize> {
            self.attempts += 1;
            if !self.reserved {
                self.unreserved_reads += 1;
            }
            assert_eq!({ setup.value }, 0x0100);
            assert_eq!(usize::from(setup.length), buffer.len());

            match self.replies.pop_front().unwrap_or(Ok(0)) {
                Ok(len) => {
                    buffer[..len].copy_from_slice(&DEVICE_PREFIX[..len]);
                    Ok(len)
                }
                Err(errno) => Err(PipeError::Hc(syscall::Error::new(errno))),
            }
        }
    }

    fn control_pipe() -> Pipe {
        let mut pipe = Pipe::default();
        pipe.initialize_default_control(&DeviceConnection::new(0, 0))
            .unwrap();
        pipe
    }

    #[test]
    fn gives_up_after_three_short_reads() {
        let mut pipe = control_pipe();
        let mut transport = MockTransport::with(&[Ok(4), Ok(2), Ok(6), Ok(8)]);

        let err = probe_default_control(&mut pipe, &mut transport).unwrap_err();

        assert_eq!(transport.attempts, 3);
        assert!(matches!(
            err,
            PipeError::RangeMismatch {
                expected: 8,
                actual: 6
            }
        ));
        assert_eq!(pipe.max_packet_size, 8);
        assert_eq!(pipe.state(), PipeState::Initialized);
        assert!(!transport.reserved);
    }

    #[test]
    fn returns_last_transport_error() {
        let mut pipe = control_pipe();
        let mut transport =
            MockTransport::with(&[Ok(3), Err(syscall::EIO), Err(syscall::ETIMEDOUT)]);

        let err = probe_default_control(&mut pipe, &mut transport).unwrap_err();

        assert_eq!(transport.attempts, 3);
        assert!(matches!(err, PipeError::Hc(e) if e.errno == syscall::ETIMEDOUT));
    }

    #[test]
    fn succeeds_on_second_attempt() {
        let mut pipe = control_pipe();
        let mut transport = MockTransport::with(&[Ok(5), Ok(8)]);

        probe_default_control(&mut pipe, &mut transport).unwrap();

        assert_eq!(transport.attempts, 2);
        assert_eq!(pipe.max_packet_size, 64);
        assert_eq!(pipe.state(), PipeState::Probed);
        assert_eq!(transport.reservations, 1);
        assert_eq!(transport.unreserved_reads, 0);
        assert!(!transport.reserved);
    }

    #[test]
    fn keeps_registration_state() {
        let mut pipe = control_pipe();
        pipe.state = PipeState::Registered;
        let mut transport = MockTransport::with(&[Ok(8)]);

        probe_default_control(&mut pipe, &mut transport).unwrap();

        assert_eq!(pipe.max_packet_size, 64);
        assert_eq!(pipe.state(), PipeState::Registered);
    }

    #[test]
    fn rejects_other_pipes() {
        let mut transport = MockTransport::default();

        let mut pipe = Pipe::default();
        assert!(matches!(
            probe_default_control(&mut pipe, &mut transport),
            Err(PipeError::InvalidArgument(_))
        ));

        pipe.initialize(
            &DeviceConnection::new(0, 2),
            1,
            EndpointTy::Ctrl,
            8,
            EndpDirection::Bidirectional,
        )
        .unwrap();
        assert!(matches!(
            probe_default_control(&mut pipe, &mut transport),
            Err(PipeError::InvalidArgument(_))
        ));
        assert_eq!(transport.attempts, 0);
        assert_eq!(transport.reservations, 0);
    }
}
