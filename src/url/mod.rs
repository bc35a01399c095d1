//! URL handling: canonicalisation and host/domain extraction.

mod domain;
mod normalize;

pub use domain::{extract_host, extract_registrable_domain};
pub use normalize::{canonicalise, resolve_and_canonicalise};
