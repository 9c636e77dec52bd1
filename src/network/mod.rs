//! Network subsystem for UDP audio transport

pub mod udp;
pub mod sender;
pub mod receiver;

pub use udp::{UdpSocket, create_socket};
pub use sender::{PacketSender, SenderStats};
pub use receiver::{ReceiverContext, ReceiverStats, Received, bind_receiver, run_receiver};
