pub mod email;
pub mod url;

pub use email::EmailFeatures;
pub use url::UrlFeatures;
