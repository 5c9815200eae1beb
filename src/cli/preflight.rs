//! Pre-flight checks before answering questions.
//!
//! Validates that every configured credential is present before any
//! network call is made, so a missing key fails fast instead of midway.

use crate::config::Settings;
use crate::error::{Result, TransmeetError};
use crate::openai::resolve_api_key;

/// Check that every credential variable named in the settings is set.
///
/// All missing variables are reported together.
pub fn check_credentials(settings: &Settings) -> Result<()> {
    let problems: Vec<String> = settings
        .required_key_vars()
        .iter()
        .filter_map(|var| resolve_api_key(Some(var)).err())
        .map(|e| match e {
            TransmeetError::Credential(msg) => msg,
            other => other.to_string(),
        })
        .collect();

    if problems.is_empty() {
        Ok(())
    } else {
        Err(TransmeetError::Credential(problems.join("; ")))
    }
}
