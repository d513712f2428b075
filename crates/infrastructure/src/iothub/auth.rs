//! Shared access signature tokens for the IoT Hub service API

use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use ring::hmac;

use domain::{ConnectionString, DomainError};

/// Characters left alone by `encodeURIComponent`
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

pub const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(3600);

pub fn encode_component(value: &str) -> String {
    utf8_percent_encode(value, URI_COMPONENT).to_string()
}

/// Build `SharedAccessSignature sr=..&sig=..&se=..&skn=..` valid until `expiry` (unix seconds)
pub fn sas_token(connection_string: &ConnectionString, expiry: i64) -> Result<String, DomainError> {
    let resource = encode_component(connection_string.host_name());
    let key_bytes = STANDARD
        .decode(connection_string.shared_access_key())
        .map_err(|e| {
            DomainError::InvalidConnectionString(format!("SharedAccessKey is not base64: {}", e))
        })?;

    let key = hmac::Key::new(hmac::HMAC_SHA256, &key_bytes);
    let string_to_sign = format!("{}\n{}", resource, expiry);
    let signature = STANDARD.encode(hmac::sign(&key, string_to_sign.as_bytes()).as_ref());

    Ok(format!(
        "SharedAccessSignature sr={}&sig={}&se={}&skn={}",
        resource,
        encode_component(&signature),
        expiry,
        encode_component(connection_string.shared_access_key_name())
    ))
}

/// Token valid for `ttl` from now
pub fn sas_token_from_now(
    connection_string: &ConnectionString,
    ttl: Duration,
) -> Result<String, DomainError> {
    let expiry = chrono::Utc::now().timestamp() + ttl.as_secs() as i64;
    sas_token(connection_string, expiry)
}
