//! Caller identity and the feature id derived from it.

/// Maximum length of a feature id, in characters.
pub const FEATURE_ID_MAX_CHARS: usize = 32;

/// A claimed identity ("address") and the feature id it enrolls under.
///
/// The feature id is the first [`FEATURE_ID_MAX_CHARS`] characters of the
/// address; the full address travels as feature info. Two long addresses
/// sharing a 32-character prefix map to the same feature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    address: String,
    feature_id: String,
}

impl Identity {
    /// Creates an identity. Returns `None` for an empty address.
    pub fn new(address: impl Into<String>) -> Option<Self> {
        let address = address.into();
        if address.is_empty() {
            return None;
        }
        let feature_id = feature_id_for(&address);
        Some(Self {
            address,
            feature_id,
        })
    }

    /// The address as submitted.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// The feature id used with the voiceprint engine.
    pub fn feature_id(&self) -> &str {
        &self.feature_id
    }

    /// The feature info stored on enrollment: the untruncated address.
    pub fn feature_info(&self) -> &str {
        &self.address
    }
}

/// Truncates `address` to at most [`FEATURE_ID_MAX_CHARS`] characters.
pub fn feature_id_for(address: &str) -> String {
    match address.char_indices().nth(FEATURE_ID_MAX_CHARS) {
        Some((idx, _)) => address[..idx].to_string(),
        None => address.to_string(),
    }
}
