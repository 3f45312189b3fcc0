pub mod error;
pub mod google;
pub mod here;
pub(crate) mod http;
pub mod provider;
pub(crate) mod retry;
pub mod yelp;

pub use error::ProviderError;
pub use google::{GoogleClient, GoogleEndpoints};
pub use here::{HereClient, HereEndpoints};
pub use http::HttpSettings;
pub use provider::Provider;
pub use yelp::YelpClient;
