//! mtk-host: Host runtime contract, in-process tool server and JSON-RPC stdio loop.

mod error;
pub mod operation;
pub mod resource;
pub mod rpc;
pub mod server;

pub use error::{HostError, OperationError};
pub use operation::{
    operation_fn, CallContext, FnOperation, Operation, OperationMap, OperationOutput,
};
pub use resource::{ResourceContent, ResourceMap, ResourceProvider};
pub use rpc::{serve, serve_stdio, RpcError, ServerInfo};
pub use server::{HostHandle, HostRuntime, ToolServer};
