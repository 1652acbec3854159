//! Configuration records handed to the test runner.

use crate::dta::DtaEnvironment;
use crate::selection::TestSelection;
use crate::tia::TiaConfiguration;
use serde::Serialize;
use std::path::PathBuf;

/// How the test platform is located.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VsTestLocationMethod {
    /// By installed Visual Studio version
    Version,
    /// By an explicit path to `vstest.console.exe` or its folder
    #[default]
    Location,
}

impl VsTestLocationMethod {
    /// Interpret the `vstestLocationMethod` input. Anything but `version`
    /// selects an explicit location.
    #[must_use]
    pub fn from_input(value: Option<&str>) -> Self {
        match value {
            Some("version") => Self::Version,
            _ => Self::Location,
        }
    }
}

/// Settings shared by single-agent and distributed runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TestConfiguration {
    /// Selection mode with its mode-specific fields
    #[serde(flatten)]
    pub selection: TestSelection,
    /// Folder searched for test assemblies
    #[serde(rename = "testDropLocation")]
    pub search_folder: Option<PathBuf>,
    /// Run settings or test settings file
    pub settings_file: Option<PathBuf>,
    /// Overrides for parameters in the settings file
    pub override_testrun_parameters: Option<String>,
    /// Run tests in parallel on multi-core machines
    pub run_in_parallel: bool,
    /// Run tests in an isolated process
    pub run_tests_in_isolation: bool,
    /// Folder holding custom test adapters
    #[serde(rename = "pathtoCustomTestAdapters")]
    pub path_to_custom_test_adapters: Option<PathBuf>,
    /// Extra console options
    pub other_console_options: Option<String>,
    /// Collect code coverage
    pub code_coverage_enabled: bool,
    /// Build configuration the tests were built for
    pub build_config: Option<String>,
    /// Build platform the tests were built for
    pub build_platform: Option<String>,
    /// Title of the published test run
    pub test_run_title: Option<String>,
    /// How the test platform is located
    pub vs_test_location_method: VsTestLocationMethod,
    /// Requested or resolved test platform version
    pub vs_test_version: Option<String>,
    /// Explicit test platform location
    pub vs_test_location: Option<String>,
    /// Test impact analysis settings
    pub tia_config: TiaConfiguration,
}

/// Settings for a run distributed across the agents of a phase.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DtaTestConfigurations {
    /// Shared settings
    #[serde(flatten)]
    pub base: TestConfiguration,
    /// Drive the run through `vstest.console.exe`
    pub use_vs_test_console: bool,
    /// Agents taking part in the phase; 0 when unknown
    pub number_of_agents_in_phase: u32,
    /// Test cases per slice; 0 lets the service decide
    pub number_of_test_cases_per_slice: u32,
    /// Where the run registers
    pub dta_environment: DtaEnvironment,
}

/// Settings for a single-agent run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VsTestConfigurations {
    /// Shared settings
    #[serde(flatten)]
    pub base: TestConfiguration,
    /// Upload run attachments with the results
    pub publish_run_attachments: bool,
    /// Diagnostics log for the test platform
    pub vstest_diag_file: PathBuf,
    /// Do not fail the task when tests fail
    pub ignore_vstest_failure: bool,
}
