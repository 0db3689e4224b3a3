pub mod cache;
pub mod config;
pub mod dialog;
pub mod error;
pub mod feed;
pub mod http;
pub mod models;
pub mod reconciler;
pub mod remote;
pub mod session;
pub mod store;
pub mod telemetry;
pub mod validation;

// Re-export commonly used items for tests / external users
pub use cache::NetworkFirst;
pub use config::ClientConfig;
pub use error::{RemoteError, WeyloError, WeyloResult};
pub use feed::{FeedLoader, LoadOutcome};
pub use http::HttpRemoteClient;
pub use reconciler::{MutationKind, MutationState, PendingMutation, Reconciler};
pub use remote::{CommentApi, ConfessionApi, LoggingClient, Operation, RemoteClient};
pub use session::Session;
pub use store::EntityStore;
