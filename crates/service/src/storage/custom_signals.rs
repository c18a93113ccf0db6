use crate::errors::StorageError;
use crate::storage::types::{CustomSignalUpdate, CustomSignals, SignalValue};

/// Maximum number of custom signals stored per app/namespace.
pub const RC_CUSTOM_SIGNAL_MAX_ALLOWED_COUNT: usize = 100;
/// Maximum length of a custom signal key, in characters.
pub const RC_CUSTOM_SIGNAL_KEY_MAX_LENGTH: usize = 250;
/// Maximum length of a string custom signal value, in characters.
pub const RC_CUSTOM_SIGNAL_VALUE_MAX_LENGTH: usize = 500;

/// Reject keys and string values over their length limits.
pub fn validate_signal_update(update: &CustomSignalUpdate) -> Result<(), StorageError> {
    for (key, value) in update {
        if key.chars().count() > RC_CUSTOM_SIGNAL_KEY_MAX_LENGTH {
            return Err(StorageError::CustomSignalKeyLength {
                key: key.clone(),
                max: RC_CUSTOM_SIGNAL_KEY_MAX_LENGTH,
            });
        }
        if let Some(SignalValue::Text(s)) = value {
            if s.chars().count() > RC_CUSTOM_SIGNAL_VALUE_MAX_LENGTH {
                return Err(StorageError::CustomSignalValueLength {
                    key: key.clone(),
                    max: RC_CUSTOM_SIGNAL_VALUE_MAX_LENGTH,
                });
            }
        }
    }
    Ok(())
}

/// Overlay `update` onto `stored`.
///
/// New values win, `None` removes the signal and numbers are stored in their
/// string form. Fails when the result holds more than
/// [`RC_CUSTOM_SIGNAL_MAX_ALLOWED_COUNT`] signals; callers must not persist
/// anything in that case.
pub fn merge_custom_signals(update: &CustomSignalUpdate, stored: &CustomSignals) -> Result<CustomSignals, StorageError> {
    let mut merged = stored.clone();
    for (key, value) in update {
        match value {
            Some(v) => { merged.insert(key.clone(), v.normalize()); }
            None => { merged.remove(key); }
        }
    }

    if merged.len() > RC_CUSTOM_SIGNAL_MAX_ALLOWED_COUNT {
        return Err(StorageError::CustomSignalLimitExceeded {
            max: RC_CUSTOM_SIGNAL_MAX_ALLOWED_COUNT,
            count: merged.len(),
        });
    }
    Ok(merged)
}
