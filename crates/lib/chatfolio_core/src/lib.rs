//! # chatfolio_core
//!
//! Intent detection against Dialogflow: session configuration, service
//! account credentials, the sessions client and entity flattening.

pub mod auth;
pub mod config;
pub mod entity;
pub mod nlu;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_is_not_empty() {
        assert!(!version().is_empty());
    }
}
