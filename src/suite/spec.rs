use anyhow::Result;
use async_trait::async_trait;

use super::SuiteContext;

/// A single functional test.
///
/// Returning `Err` or panicking fails only this spec; siblings keep
/// running. Specs share the test namespace, so anything they create must
/// use a unique name.
#[async_trait]
pub trait Spec: Send + Sync {
    /// Reported name. A `[test_id:<id>]` tag links it to Polarion.
    fn name(&self) -> String;

    async fn run(&self, ctx: &SuiteContext) -> Result<()>;
}
