mod test_service;

pub use test_service::TestService;

// Test constants
pub const TEST_BUCKET: &str = "test-bucket";
pub const TEST_ACCESS_KEY_ID: &str = "QiniuTestAccessKey0001";
pub const TEST_SECRET_ACCESS_KEY: &str = "QiniuTestSecretKey/bPxRfiCYEXAMPLEKEY";
