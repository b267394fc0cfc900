//! Dynamic per-session gRPC listeners.
//!
//! Each enabled session gets its own HTTP/2 listener on the first free port
//! of a fixed range. Calls are matched as opaque byte payloads; no protobuf
//! schema is involved anywhere.
//!
//! ## Module Structure
//!
//! - `codec`: identity `Bytes` codec plugged into tonic
//! - `service`: per-call unary dispatch bound to one session id
//! - `listener`: port allocation, accept loops, teardown

mod codec;
mod listener;
mod service;

pub use codec::RawCodec;
pub use listener::{
    GrpcEnableError, GrpcListenerHandle, GrpcListenerManager, GRPC_PORT_RANGE_END,
    GRPC_PORT_RANGE_START,
};
