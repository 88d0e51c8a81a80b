//! JSON-RPC bridge between automation agents and the Civ7 debug port.
//!
//! Speaks the Model Context Protocol subset agents need over stdio, one JSON
//! message per line:
//!
//! - tool `execute_js`: run a script, answer with the result text
//! - resource `civ7://status`: current connection status
//!
//! Failures are reported as tool text starting with `ERROR:` rather than as
//! JSON-RPC errors, so an agent sees them in its transcript.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod protocol;
pub mod server;

pub use protocol::{JsonRpcRequest, JsonRpcResponse};
pub use server::{Bridge, BridgeError, serve};
