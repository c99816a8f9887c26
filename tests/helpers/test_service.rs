use super::{TEST_ACCESS_KEY_ID, TEST_SECRET_ACCESS_KEY};
use kodo_bridge::{
    ClientConfiguration, Credentials, DomainConfig, InMemoryTransport, ObjectService,
};

/// Object service wired to an in-memory Kodo emulator
///
/// The emulator verifies every token with the same credentials the service
/// signs with, so requests go through the real signing path.
pub struct TestService {
    pub service: ObjectService<InMemoryTransport>,
    pub bucket_name: String,
}

impl TestService {
    pub fn config() -> ClientConfiguration {
        ClientConfiguration {
            endpoint: "http://files.test.local".to_string(),
            domains: DomainConfig {
                io: Some("io.test.local".to_string()),
                rs: Some("rs.test.local".to_string()),
                rsf: Some("rsf.test.local".to_string()),
                up: Some("up.test.local".to_string()),
            },
            ..Default::default()
        }
    }

    pub fn credentials() -> Credentials {
        Credentials::new(TEST_ACCESS_KEY_ID, TEST_SECRET_ACCESS_KEY)
    }

    /// Start a service with the default test configuration
    pub fn start(bucket_name: &str) -> Self {
        Self::with_config(bucket_name, Self::config(), Self::credentials())
    }

    /// Start a service that signs with `credentials`; the emulator always
    /// expects the test credentials
    pub fn with_config(
        bucket_name: &str,
        config: ClientConfiguration,
        credentials: Credentials,
    ) -> Self {
        let transport = InMemoryTransport::new(Self::credentials());
        TestService {
            service: ObjectService::new(config, credentials, transport),
            bucket_name: bucket_name.to_string(),
        }
    }

    pub fn transport(&self) -> &InMemoryTransport {
        self.service.transport()
    }

    /// Seed objects straight into the emulator
    pub async fn seed(&self, keys: &[&str]) {
        for key in keys {
            self.transport()
                .insert_object(
                    &self.bucket_name,
                    key,
                    format!("Content of {}", key),
                    "text/plain",
                )
                .await;
        }
    }
}
