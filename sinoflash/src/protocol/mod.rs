//! Wire protocols spoken to the programmer.

pub mod simple_rpc;

pub use simple_rpc::{RpcMethod, RpcType, RpcValue, SimpleRpc};
