//! starkindex-starknet: Starknet adapters for the crawl engine.
//!
//! - [`StarknetRpcClient`]: JSON-RPC implementation of `ChainClient`
//! - [`AdaliansDecoder`]: `CrewmatePurchased` / `CrewmateRecruitedV1` decoding
//! - [`CrawlerBuilder`]: wires both into a `Crawler`

pub mod builder;
pub mod decoder;
pub mod felt;
pub mod request;
pub mod retry;
pub mod rpc;
pub mod transport;

pub use builder::CrawlerBuilder;
pub use decoder::AdaliansDecoder;
pub use felt::starknet_keccak;
pub use retry::{RetryConfig, RetryPolicy};
pub use rpc::StarknetRpcClient;
pub use transport::{HttpTransport, HttpTransportConfig, RpcTransport};
