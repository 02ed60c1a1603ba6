//! Helpers for running the client against an emulated device over loopback TCP.
use std::{
    io,
    net::{SocketAddr, TcpListener},
    sync::Arc,
    thread,
};

use sysbot_client::{Builder, SysBotClient, transport::TcpTransport};
use sysbot_server::{memory::SparseMemory, server};

/// Starts an emulator on an ephemeral loopback port in a background thread.
///
/// The emulator lives until the test process exits.
pub fn spawn_emulator(
    memory: Arc<SparseMemory>,
    max_transfer_size: usize,
) -> io::Result<SocketAddr> {
    let listener = TcpListener::bind("127.0.0.1:0")?;
    let addr = listener.local_addr()?;
    listener.set_nonblocking(true)?;

    let server = server::Builder::new()
        .max_transfer_size(max_transfer_size)
        .build(memory);
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    thread::spawn(move || {
        runtime.block_on(async move {
            let listener = tokio::net::TcpListener::from_std(listener)?;
            server.serve(listener).await
        })
    });
    Ok(addr)
}

/// A connected client without response delay.
pub fn connect(
    addr: SocketAddr,
    max_transfer_size: usize,
) -> sysbot_client::Result<SysBotClient<TcpTransport>> {
    let mut client = Builder::new()
        .base_delay(0)
        .max_transfer_size(max_transfer_size)
        .build(TcpTransport::new(addr));
    client.open()?;
    Ok(client)
}
