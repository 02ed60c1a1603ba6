use crate::{
    error::{Result, TransferError},
    transport::Transport,
};

/// Whether a [`Connection`] currently has a live transport.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connected,
}

/// Owns a [`Transport`] and the state machine around it.
///
/// The state only changes through [`connect`](Connection::connect),
/// [`disconnect`](Connection::disconnect) and [`reset`](Connection::reset).
/// Sending or receiving while disconnected fails with [`TransferError::NotConnected`].
#[derive(Debug)]
pub struct Connection<T> {
    transport: T,
    state: ConnectionState,
}

impl<T: Transport> Connection<T> {
    pub fn new(transport: T) -> Connection<T> {
        Connection {
            transport,
            state: ConnectionState::Disconnected,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    pub fn connect(&mut self) -> Result<()> {
        log::info!("Connecting to device...");
        self.transport.connect()?;
        self.state = ConnectionState::Connected;
        log::info!("Connected!");
        Ok(())
    }

    pub fn disconnect(&mut self) -> Result<()> {
        log::info!("Disconnecting from device...");
        self.transport.disconnect()?;
        self.state = ConnectionState::Disconnected;
        log::info!("Disconnected!");
        Ok(())
    }

    /// Disconnects and connects again.
    pub fn reset(&mut self) -> Result<()> {
        self.disconnect()?;
        self.connect()
    }

    pub fn send(&mut self, buf: &[u8]) -> Result<usize> {
        self.ensure_connected()?;
        Ok(self.transport.send(buf)?)
    }

    pub fn receive(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.ensure_connected()?;
        Ok(self.transport.receive(buf)?)
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    fn ensure_connected(&self) -> Result<()> {
        match self.state {
            ConnectionState::Connected => Ok(()),
            ConnectionState::Disconnected => Err(TransferError::NotConnected),
        }
    }
}

#[cfg(test)]
mod test {
    use std::io;

    use super::*;

    #[derive(Default)]
    struct Counting {
        connects: usize,
        disconnects: usize,
        fail_connect: bool,
    }

    impl Transport for Counting {
        fn connect(&mut self) -> io::Result<()> {
            if self.fail_connect {
                return Err(io::Error::new(io::ErrorKind::ConnectionRefused, "refused"));
            }
            self.connects += 1;
            Ok(())
        }

        fn disconnect(&mut self) -> io::Result<()> {
            self.disconnects += 1;
            Ok(())
        }

        fn send(&mut self, buf: &[u8]) -> io::Result<usize> {
            Ok(buf.len())
        }

        fn receive(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Ok(0)
        }
    }

    #[test]
    fn starts_disconnected() {
        let mut connection = Connection::new(Counting::default());
        assert_eq!(connection.state(), ConnectionState::Disconnected);
        assert!(matches!(
            connection.send(b"peek 0x0 1\r\n"),
            Err(TransferError::NotConnected)
        ));
        assert!(matches!(
            connection.receive(&mut [0; 3]),
            Err(TransferError::NotConnected)
        ));
    }

    #[test]
    fn transitions() {
        let mut connection = Connection::new(Counting::default());
        connection.connect().unwrap();
        assert!(connection.is_connected());
        assert_eq!(connection.send(b"abc").unwrap(), 3);

        connection.reset().unwrap();
        assert_eq!(connection.state(), ConnectionState::Connected);
        assert_eq!(connection.transport().connects, 2);
        assert_eq!(connection.transport().disconnects, 1);

        connection.disconnect().unwrap();
        assert_eq!(connection.state(), ConnectionState::Disconnected);
    }

    #[test]
    fn failed_connect_stays_disconnected() {
        let mut connection = Connection::new(Counting {
            fail_connect: true,
            ..Default::default()
        });
        assert!(matches!(
            connection.connect(),
            Err(TransferError::Transport(_))
        ));
        assert_eq!(connection.state(), ConnectionState::Disconnected);
    }
}
