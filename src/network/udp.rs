//! UDP socket setup
//!
//! Sockets are built with socket2 so buffer sizes can be set before bind,
//! then handed to tokio.

use socket2::{Domain, Protocol, Socket, Type};
use std::net::SocketAddr;

use crate::error::NetworkError;

pub use tokio::net::UdpSocket;

/// Create a non-blocking UDP socket bound to `bind_addr`
pub fn create_socket(
    bind_addr: SocketAddr,
    recv_buffer_size: Option<usize>,
    send_buffer_size: Option<usize>,
) -> Result<UdpSocket, NetworkError> {
    let bind_err = |e: std::io::Error| NetworkError::BindFailed(format!("{}: {}", bind_addr, e));

    let socket = Socket::new(Domain::for_address(bind_addr), Type::DGRAM, Some(Protocol::UDP))
        .map_err(bind_err)?;

    if let Some(size) = recv_buffer_size {
        socket.set_recv_buffer_size(size).map_err(bind_err)?;
    }
    if let Some(size) = send_buffer_size {
        socket.set_send_buffer_size(size).map_err(bind_err)?;
    }

    socket.set_nonblocking(true).map_err(bind_err)?;
    socket.bind(&bind_addr.into()).map_err(bind_err)?;

    let std_socket: std::net::UdpSocket = socket.into();
    let socket = UdpSocket::from_std(std_socket).map_err(bind_err)?;

    tracing::debug!(
        "UDP socket bound to {} (recv buf {:?}, send buf {:?})",
        bind_addr,
        recv_buffer_size,
        send_buffer_size
    );
    Ok(socket)
}

/// Wildcard address of the same family as `target`, for sending sockets
pub fn unspecified_for(target: SocketAddr) -> SocketAddr {
    match target {
        SocketAddr::V4(_) => SocketAddr::from(([0, 0, 0, 0], 0)),
        SocketAddr::V6(_) => SocketAddr::from(([0u16; 8], 0)),
    }
}
