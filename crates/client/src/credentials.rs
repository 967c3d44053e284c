use secrecy::SecretString;

use marketdesk_core::config::BackendConfig;

/// Injected credential capability for authenticated backend calls.
///
/// The client asks for the token at request time, never at construction, so
/// rotation by the provider takes effect without rebuilding the client.
pub trait CredentialProvider: Send + Sync {
    fn api_token(&self) -> Option<SecretString>;
}

/// Fixed token taken from configuration. `None` means the backend is called
/// unauthenticated, which the backend may or may not accept.
#[derive(Clone, Default)]
pub struct StaticCredentials {
    token: Option<SecretString>,
}

impl StaticCredentials {
    pub fn new(token: Option<SecretString>) -> Self {
        Self { token }
    }

    pub fn from_backend(config: &BackendConfig) -> Self {
        Self { token: config.api_token.clone() }
    }
}

impl CredentialProvider for StaticCredentials {
    fn api_token(&self) -> Option<SecretString> {
        self.token.clone()
    }
}
