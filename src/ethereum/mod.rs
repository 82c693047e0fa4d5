//! EVM interaction module.
//!
//! Contains the multi-chain RPC client, contract bindings, and the concrete
//! [`crate::transport::ChainReadTransport`] implementation.

pub mod client;
pub mod contracts;
pub mod rpc;

pub use client::{EvmClient, HttpProvider};
pub use rpc::RpcReadTransport;
