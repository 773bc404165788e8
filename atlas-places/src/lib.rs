pub mod client;
pub mod credentials;
pub mod error;
pub mod media;
pub mod provider;
pub mod types;

pub use client::GooglePlacesClient;
pub use credentials::{
    CredentialSource, PlacesConfig, config_path, credential_source, load_config_file,
    save_api_key,
};
pub use error::ProviderError;
pub use media::{DEFAULT_MAX_WIDTH, photo_url};
pub use provider::PlaceProvider;
pub use types::{LocationBias, MediaProbe, MediaReference, PlaceCandidate, PlaceMedia};
