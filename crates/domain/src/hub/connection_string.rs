use crate::error::{DomainError, Result};

/// Parsed IoT Hub connection string
///
/// Rules:
/// - `HostName`, `SharedAccessKeyName` and `SharedAccessKey` are required
/// - Keys are case-sensitive, pairs are `;`-separated
/// - The key value may itself contain `=` (base64 padding)
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionString {
    host_name: String,
    shared_access_key_name: String,
    shared_access_key: String,
}

impl ConnectionString {
    pub fn parse(raw: &str) -> Result<Self> {
        let mut host_name = None;
        let mut key_name = None;
        let mut key = None;

        for part in raw.trim().split(';').filter(|p| !p.trim().is_empty()) {
            let (name, value) = part.split_once('=').ok_or_else(|| {
                DomainError::InvalidConnectionString(format!("Malformed segment '{}'", part))
            })?;
            match name.trim() {
                "HostName" => host_name = Some(value.trim().to_string()),
                "SharedAccessKeyName" => key_name = Some(value.trim().to_string()),
                "SharedAccessKey" => key = Some(value.trim().to_string()),
                _ => {}
            }
        }

        let require = |value: Option<String>, field: &str| {
            value.filter(|v| !v.is_empty()).ok_or_else(|| {
                DomainError::InvalidConnectionString(format!("Missing {}", field))
            })
        };

        Ok(Self {
            host_name: require(host_name, "HostName")?,
            shared_access_key_name: require(key_name, "SharedAccessKeyName")?,
            shared_access_key: require(key, "SharedAccessKey")?,
        })
    }

    pub fn host_name(&self) -> &str {
        &self.host_name
    }

    pub fn shared_access_key_name(&self) -> &str {
        &self.shared_access_key_name
    }

    pub fn shared_access_key(&self) -> &str {
        &self.shared_access_key
    }

    /// Hub name, i.e. the first label of the host name
    pub fn hub_name(&self) -> &str {
        self.host_name
            .split('.')
            .next()
            .unwrap_or(self.host_name.as_str())
    }

    /// Re-serialize in canonical order
    pub fn to_connection_string(&self) -> String {
        format!(
            "HostName={};SharedAccessKeyName={};SharedAccessKey={}",
            self.host_name, self.shared_access_key_name, self.shared_access_key
        )
    }
}

// Keeps the key out of logs
impl std::fmt::Debug for ConnectionString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionString")
            .field("host_name", &self.host_name)
            .field("shared_access_key_name", &self.shared_access_key_name)
            .field("shared_access_key", &"<redacted>")
            .finish()
    }
}
