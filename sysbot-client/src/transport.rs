//! The byte oriented link to the device.
use std::{
    io::{self, ErrorKind, Read, Write},
    net::{IpAddr, Ipv4Addr, Shutdown, SocketAddr, TcpStream},
    time::Duration,
};

use sysbot_protocol::DEFAULT_PORT;

/// Raw duplex byte channel to a device.
///
/// Implementations do not track whether they are connected on behalf of the
/// caller, that is the job of [`crate::connection::Connection`].
pub trait Transport {
    fn connect(&mut self) -> io::Result<()>;
    fn disconnect(&mut self) -> io::Result<()>;
    /// Sends all of `buf` and returns the number of bytes sent.
    fn send(&mut self, buf: &[u8]) -> io::Result<usize>;
    /// Receives up to `buf.len()` bytes. `Ok(0)` means the peer closed the stream.
    fn receive(&mut self, buf: &mut [u8]) -> io::Result<usize>;
}

/// Where to find the device on the network.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct DeviceConfig {
    pub ip: IpAddr,
    pub port: u16,
}

impl DeviceConfig {
    pub fn new(ip: IpAddr, port: u16) -> DeviceConfig {
        DeviceConfig { ip, port }
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.ip, self.port)
    }
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            ip: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: DEFAULT_PORT,
        }
    }
}

/// [`Transport`] over a blocking TCP socket.
#[derive(Debug)]
pub struct TcpTransport {
    addr: SocketAddr,
    read_timeout: Option<Duration>,
    write_timeout: Option<Duration>,
    tcp: Option<TcpStream>,
}

impl TcpTransport {
    pub fn new(addr: SocketAddr) -> TcpTransport {
        TcpTransport {
            addr,
            read_timeout: None,
            write_timeout: None,
            tcp: None,
        }
    }

    /// Bounds how long a single receive may block. `None` blocks indefinitely.
    pub fn read_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Bounds how long a single send may block. `None` blocks indefinitely.
    pub fn write_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.write_timeout = timeout;
        self
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    fn stream(&mut self) -> io::Result<&mut TcpStream> {
        self.tcp
            .as_mut()
            .ok_or_else(|| io::Error::new(ErrorKind::NotConnected, "socket is not connected"))
    }
}

impl From<DeviceConfig> for TcpTransport {
    fn from(config: DeviceConfig) -> Self {
        TcpTransport::new(config.socket_addr())
    }
}

impl Transport for TcpTransport {
    fn connect(&mut self) -> io::Result<()> {
        let tcp = TcpStream::connect(self.addr)?;
        tcp.set_read_timeout(self.read_timeout)?;
        tcp.set_write_timeout(self.write_timeout)?;
        // Commands are small and latency bound.
        tcp.set_nodelay(true)?;
        self.tcp = Some(tcp);
        Ok(())
    }

    fn disconnect(&mut self) -> io::Result<()> {
        match self.tcp.take() {
            Some(tcp) => match tcp.shutdown(Shutdown::Both) {
                Err(err) if err.kind() != ErrorKind::NotConnected => Err(err),
                _ => Ok(()),
            },
            None => Ok(()),
        }
    }

    fn send(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.stream()?.write_all(buf)?;
        Ok(buf.len())
    }

    fn receive(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.stream()?.read(buf)
    }
}
