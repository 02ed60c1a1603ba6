use std::{io::ErrorKind, time::Duration};

use futures::{SinkExt, StreamExt};
use tokio::{
    net::{TcpListener, TcpStream, ToSocketAddrs},
    time::timeout,
};
use tokio_util::codec::Framed;

use crate::MemoryDevice;
use sysbot_protocol::{
    Command, MAXIMUM_TRANSFER_SIZE, Response, TRANSFER_SIZE_LIMIT, error::ReadError,
    tokio_codec::CommandCodec,
};

#[derive(Debug, Clone)]
pub struct Config {
    pub max_transfer_size: usize,
    pub read_write_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_transfer_size: MAXIMUM_TRANSFER_SIZE,
            read_write_timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug)]
pub struct Server<T: MemoryDevice> {
    device: T,
    config: Config,
}

/// Builder to create a [Server] instance and modify configuration options
///
/// # Example
///
/// ```ignore
/// use sysbot_server::server::Builder;
/// use std::time::Duration;
///
/// let server = Builder::new()
///     .max_transfer_size(0x1C0)
///     .rw_timeout(Duration::from_secs(20))
///     .build(my_device);
/// ```
#[derive(Default)]
pub struct Builder {
    config: Config,
}

impl Builder {
    pub fn new() -> Builder {
        Builder::default()
    }

    /// Set the largest payload a single command may carry.
    /// Clamped to between one byte and [`TRANSFER_SIZE_LIMIT`].
    pub fn max_transfer_size(mut self, size: usize) -> Self {
        self.config.max_transfer_size = size;
        self
    }

    /// Set the TCP read and write timeout
    pub fn rw_timeout(mut self, timeout: Duration) -> Self {
        self.config.read_write_timeout = timeout;
        self
    }

    /// Build and return the server
    pub fn build<T: MemoryDevice>(self, device: T) -> Server<T> {
        Server::new(device, self.config)
    }
}

impl<T: MemoryDevice> Server<T> {
    pub fn new(device: T, mut config: Config) -> Server<T> {
        config.max_transfer_size = config.max_transfer_size.clamp(1, TRANSFER_SIZE_LIMIT);
        Server { device, config }
    }

    pub fn device(&self) -> &T {
        &self.device
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Bind to `addr` and serve clients until the process ends.
    pub async fn listen(&self, addr: impl ToSocketAddrs) -> std::io::Result<()> {
        let listener = TcpListener::bind(addr).await?;
        log::info!("Server listening on {}", listener.local_addr()?);
        self.serve(listener).await
    }

    /// Serve clients on an already bound listener, one at a time.
    pub async fn serve(&self, listener: TcpListener) -> std::io::Result<()> {
        loop {
            match listener.accept().await {
                Ok((tcp, addr)) => {
                    log::info!("New client connection from {}", addr);
                    if let Err(e) = self.handle_client(tcp).await {
                        log::error!("Client error: {}", e);
                    }
                    log::info!("Client {} disconnected", addr);
                }
                Err(e) => log::error!("Connection error: {}", e),
            }
        }
    }

    async fn handle_client(&self, tcp: TcpStream) -> Result<(), ReadError> {
        tcp.set_nodelay(true)?;
        let rw_timeout = self.config.read_write_timeout;
        let mut framed = Framed::new(tcp, CommandCodec::new(self.config.max_transfer_size));

        loop {
            let Ok(next) = timeout(rw_timeout, framed.next()).await else {
                log::error!("Client read timeout, closing connection");
                break;
            };
            match next {
                Some(Ok(command)) => {
                    if let Some(response) = self.process_command(command) {
                        let Ok(sent) = timeout(rw_timeout, framed.send(response)).await else {
                            log::error!("Client write timeout, closing connection");
                            break;
                        };
                        sent?;
                    }
                }
                Some(Err(ReadError::Io(err)))
                    if err.kind() == ErrorKind::ConnectionAborted
                        || err.kind() == ErrorKind::ConnectionReset =>
                {
                    break;
                }
                Some(Err(other)) => return Err(other),
                None => break, // Client disconnected
            }
        }
        Ok(())
    }

    /// Process each command, forwarding the implementation to the device.
    fn process_command(&self, command: Command) -> Option<Response> {
        match command {
            Command::Peek {
                space,
                offset,
                length,
            } => {
                log::debug!(
                    "Received Peek command: space={}, offset=0x{:X}, length={}",
                    space,
                    offset,
                    length
                );
                let mut data = self.device.peek(space, offset, length);
                if data.len() != length {
                    log::warn!(
                        "Device returned {} bytes for a {} byte peek",
                        data.len(),
                        length
                    );
                    let mut resized = data.into_vec();
                    resized.resize(length, 0);
                    data = resized.into_boxed_slice();
                }
                log::trace!("Peek data: {:02x?}", &data[..]);
                Some(Response::Memory(data))
            }
            Command::Poke {
                space,
                offset,
                data,
            } => {
                log::debug!(
                    "Received Poke command: space={}, offset=0x{:X}, length={}",
                    space,
                    offset,
                    data.len()
                );
                log::trace!("Poke data: {:02x?}", &data[..]);
                self.device.poke(space, offset, &data);
                None
            }
            Command::GetMainNsoBase => {
                log::debug!("Received GetMainNsoBase command");
                Some(Response::Address(self.device.main_nso_base()))
            }
            Command::GetHeapBase => {
                log::debug!("Received GetHeapBase command");
                Some(Response::Address(self.device.heap_base()))
            }
        }
    }
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};

    use super::*;
    use crate::memory::SparseMemory;

    async fn start(server: Server<SparseMemory>) -> (Arc<Server<SparseMemory>>, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = Arc::new(server);
        let serving = server.clone();
        tokio::spawn(async move { serving.serve(listener).await });
        (server, TcpStream::connect(addr).await.unwrap())
    }

    #[tokio::test]
    async fn serves_peek_and_poke() {
        let (server, tcp) = start(Builder::new().build(SparseMemory::new(0x8000, 0x1000))).await;
        let mut tcp = BufReader::new(tcp);

        tcp.write_all(b"poke 0x10 0xCAFE\r\npeek 0x10 3\r\n")
            .await
            .unwrap();
        let mut line = String::new();
        tcp.read_line(&mut line).await.unwrap();
        assert_eq!(line, "CAFE00\n");

        tcp.write_all(b"getHeapBase\r\ngetMainNsoBase\r\n")
            .await
            .unwrap();
        line.clear();
        tcp.read_line(&mut line).await.unwrap();
        assert_eq!(line, "0000000000001000\n");
        line.clear();
        tcp.read_line(&mut line).await.unwrap();
        assert_eq!(line, "0000000000008000\n");

        assert_eq!(
            &*server.device().peek(sysbot_protocol::AddressSpace::Absolute, 0x1010, 2),
            &[0xCA, 0xFE]
        );
    }

    #[tokio::test]
    async fn closes_connection_on_oversized_transfer() {
        let (_server, mut tcp) =
            start(Builder::new().max_transfer_size(16).build(SparseMemory::default())).await;
        tcp.write_all(b"peek 0x0 17\r\n").await.unwrap();
        let mut buf = Vec::new();
        assert_eq!(tcp.read_to_end(&mut buf).await.unwrap(), 0);
    }

    #[test]
    fn clamps_transfer_size() {
        let server = Builder::new()
            .max_transfer_size(usize::MAX)
            .rw_timeout(Duration::from_secs(5))
            .build(SparseMemory::default());
        assert_eq!(server.config().max_transfer_size, TRANSFER_SIZE_LIMIT);
        assert_eq!(server.config().read_write_timeout, Duration::from_secs(5));

        let server = Server::new(
            SparseMemory::default(),
            Config {
                max_transfer_size: 0,
                ..Config::default()
            },
        );
        assert_eq!(server.config().max_transfer_size, 1);
    }

    #[tokio::test]
    async fn serves_next_client_after_disconnect() {
        let (server, tcp) = start(Builder::new().build(SparseMemory::default())).await;
        let addr = tcp.peer_addr().unwrap();
        let mut tcp = tcp;
        tcp.write_all(b"pokeAbsolute 0x40 0x01\r\n").await.unwrap();
        drop(tcp);

        let mut tcp = BufReader::new(TcpStream::connect(addr).await.unwrap());
        tcp.write_all(b"peekAbsolute 0x40 1\r\n").await.unwrap();
        let mut line = String::new();
        tcp.read_line(&mut line).await.unwrap();
        assert_eq!(line, "01\n");
        assert_eq!(server.device().len(), 1);
    }
}
