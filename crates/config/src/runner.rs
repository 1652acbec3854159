//! Hook for resolving the test platform from the requested version or
//! location.

use crate::error::Result;
use crate::models::TestConfiguration;
use tracing::debug;

/// Fills in runner path and version details once the inputs are read.
///
/// Discovery of installed Visual Studio instances is platform specific and
/// lives outside this crate; implementations may rewrite
/// `vs_test_version` and `vs_test_location`.
pub trait RunnerDetailsResolver {
    /// Resolve the runner for `config` in place.
    ///
    /// # Errors
    ///
    /// Returns an error when the requested runner cannot be found.
    fn resolve(&self, config: &mut TestConfiguration) -> Result<()>;
}

/// Leaves the configuration as the inputs describe it.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopResolver;

impl RunnerDetailsResolver for NoopResolver {
    fn resolve(&self, config: &mut TestConfiguration) -> Result<()> {
        debug!(
            method = ?config.vs_test_location_method,
            version = ?config.vs_test_version,
            "Runner details left unresolved"
        );
        Ok(())
    }
}

impl<F> RunnerDetailsResolver for F
where
    F: Fn(&mut TestConfiguration) -> Result<()>,
{
    fn resolve(&self, config: &mut TestConfiguration) -> Result<()> {
        self(config)
    }
}
