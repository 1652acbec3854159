//! Test impact analysis (TIA) settings.

use crate::parse::temp_file_path;
use crate::variables::TaskEnvironment;
use serde::Serialize;
use std::path::PathBuf;
use tracing::debug;

/// Pipeline context the impacted tests are computed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TiaContext {
    /// Build pipeline
    #[serde(rename = "CI")]
    Ci,
    /// Release pipeline
    #[serde(rename = "CD")]
    Cd,
}

/// Settings for running only the tests impacted by a change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TiaConfiguration {
    /// Run only impacted tests
    pub tia_enabled: bool,
    /// Run every test after this many builds, as supplied
    pub tia_rebase_limit: Option<String>,
    /// Compute impact per file rather than per method
    pub file_level: bool,
    /// Root of the checked-out sources
    pub sources_dir: Option<PathBuf>,
    /// Path filters limiting which changes count
    pub tia_filter_paths: Option<String>,
    /// Where the runner writes the test run id
    pub run_id_file: PathBuf,
    /// Where the runner writes the baseline build id
    pub base_line_build_id_file: PathBuf,
    /// Use the new data collector
    pub use_new_collector: bool,
    /// The run validates a pull request
    pub is_pr_flow: bool,
    /// Pass the impacted test filter through a response file
    pub use_test_case_filter_in_response_file: bool,
    /// Build or release context
    pub context: TiaContext,
    /// User map file
    pub user_map_file: Option<PathBuf>,
    /// Leave the run settings alone instead of switching the data collector on
    pub disable_enabling_data_collector: bool,
}

impl TiaConfiguration {
    /// Read the TIA inputs and variables.
    ///
    /// Every call generates a fresh pair of temp file paths.
    pub fn from_env(env: &impl TaskEnvironment) -> Self {
        let is_pr_flow = if env.variable("Build.Reason").as_deref() == Some("PullRequest") {
            true
        } else {
            env.bool_variable("tia.isPrFlow")
        };

        let context = if env.variable("release.releaseUri").is_some() {
            TiaContext::Cd
        } else {
            TiaContext::Ci
        };

        let config = Self {
            tia_enabled: env.bool_input("runOnlyImpactedTests"),
            tia_rebase_limit: env.input("runAllTestsAfterXBuilds"),
            file_level: env.bool_variable("tia.filelevel"),
            sources_dir: env.variable("build.sourcesdirectory").map(PathBuf::from),
            tia_filter_paths: env.variable("TIA_IncludePathFilters"),
            run_id_file: temp_file_path(),
            base_line_build_id_file: temp_file_path(),
            use_new_collector: env.bool_variable("tia.useNewCollector"),
            is_pr_flow,
            use_test_case_filter_in_response_file: env
                .bool_variable("tia.useTestCaseFilterInResponseFile"),
            context,
            user_map_file: env.variable("tia.usermapfile").map(PathBuf::from),
            disable_enabling_data_collector: env.bool_variable("tia.disabletiadatacollector"),
        };
        debug!(enabled = config.tia_enabled, context = ?config.context, "TIA configuration");
        config
    }
}
