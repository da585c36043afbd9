//! # logiflow-client
//!
//! Read and write access to the LogiFlow backends on behalf of the signed-in
//! session: the order REST service, the GraphQL gateway, a moka-backed query
//! cache that logout empties, and a live order feed driven by the realtime
//! channel.
//!
//! Every client takes the session as an `Arc<dyn TokenProvider>` and sends
//! it as `Authorization: Bearer`.

pub mod cache;
pub mod error;
pub mod feed;
pub mod graphql;
mod http;
pub mod orders;

pub use cache::QueryCache;
pub use error::ClientError;
pub use feed::{FeedSnapshot, OrderFeed};
pub use graphql::{GraphQlClient, OrderFilter};
pub use http::REQUEST_ID_HEADER;
pub use orders::{Fetched, OrderSource, OrdersClient};
