//! Call protocol between a crypto client and a crypto engine
//!
//! Requests and replies are closed enums encoded with bincode and sent
//! as length-prefixed frames. Each request carries a sequence number so
//! a connection can multiplex concurrent calls.

mod frame;
mod handler;
mod messages;
mod tcp;
mod transport;

pub use frame::{decode, encode, read_frame, write_frame, MAX_FRAME_SIZE};
pub use handler::handle_request;
pub use messages::{
    CallFrame, CiphertextBundle, Ed25519SignatureInfo, ReplyFrame, Request, Response,
    SignEd25519Arg, UnboxAnyRes, UnboxBytes32AnyArg, UnboxBytes32Arg,
};
pub use tcp::TcpTransport;
pub use transport::{LocalTransport, Transport};
