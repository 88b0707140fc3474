pub mod batch;
pub mod cache;
pub mod client;
pub mod config;
pub mod endpoint;
pub mod entity;
pub mod errors;
pub mod request;
pub mod response;

pub use batch::{BatchLookup, BatchQueue};
pub use cache::CacheInfo;
pub use client::RequestClient;
pub use config::EsiConfig;
pub use endpoint::{Endpoint, EndpointInfo};
pub use entity::{
    EntityLookupService, ResolvedAlliance, ResolvedCharacter, ResolvedCorporation, UNKNOWN_NAME,
};
pub use errors::{EsiError, EsiResult};
pub use request::{ContentType, DataSource, EsiRequest, Language};
pub use response::{EsiResponse, EsiStatus};
