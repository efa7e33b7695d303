//! Client side of the BFF: token storage, the authenticated request
//! pipeline and the typed API catalog.

pub mod api;
pub(crate) mod messages;
pub mod navigation;
pub mod pipeline;
pub mod refresh;
pub mod response;
pub mod routes;
pub mod token_store;
pub mod types;

pub use api::{ApiClient, CompletionCheck, SessionLookup};
pub use navigation::{Navigation, Navigator, PageLocation};
pub use pipeline::{ClientConfig, RequestPipeline};
pub use response::ClientError;
pub use routes::with_base_path;
pub use token_store::{Credentials, FileTokenStore, MemoryTokenStore, Profile, Role, TokenStore};
