//! Assembles runner configurations from task inputs.

use crate::dta::{DtaEnvironment, InstanceCounter, job_token};
use crate::error::{Error, Result};
use crate::models::{
    DtaTestConfigurations, TestConfiguration, VsTestConfigurations, VsTestLocationMethod,
};
use crate::parse::{parse_leading_int, resolve_path, temp_file_path};
use crate::runner::{NoopResolver, RunnerDetailsResolver};
use crate::selection::TestSelection;
use crate::tia::TiaConfiguration;
use crate::variables::{TaskEnvironment, is_true};
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// Test platform versions accepted when locating by version.
const SUPPORTED_VERSIONS: [&str; 2] = ["14.0", "15.0"];

/// Visual Studio 2013 cannot drive a distributed run.
const VS2013_VERSION: &str = "12.0";

/// `distributeTestsOption` value that enables fixed-size batches.
const DISTRIBUTE_BY_TEST_BATCH: &str = "distributeByTestBatch";

/// Batch size used when the requested one is unusable.
pub const DEFAULT_TEST_CASES_PER_SLICE: u32 = 10;

/// Builds [`TestConfiguration`]s and the records derived from it.
///
/// # Example
///
/// ```ignore
/// use vstest_config::{Assembler, ProcessEnvironment};
///
/// let mut env = ProcessEnvironment::new();
/// let config = Assembler::new().distributed(&mut env)?;
/// for update in env.take_updates() {
///     println!("{update}");
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct Assembler<R = NoopResolver> {
    resolver: R,
}

impl Assembler {
    /// Assembler that leaves runner details unresolved.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl<R: RunnerDetailsResolver> Assembler<R> {
    /// Use `resolver` to fill in runner details.
    #[must_use]
    pub fn with_resolver<S: RunnerDetailsResolver>(self, resolver: S) -> Assembler<S> {
        Assembler { resolver }
    }

    /// Read and validate the settings shared by every run.
    ///
    /// # Errors
    ///
    /// Fails on an unknown selector, an invalid test run id, a custom adapter
    /// path that is not a directory, or a missing or unknown test platform
    /// version.
    pub fn test_configuration(&self, env: &impl TaskEnvironment) -> Result<TestConfiguration> {
        let selection = TestSelection::from_inputs(env)?;

        let search_folder = env.input("searchFolder").map(|raw| resolve_path(&raw));
        info!("Search folder: {search_folder:?}");

        let settings_file = env.input("runSettingsFile").map(|raw| resolve_path(&raw));
        info!("Run settings file: {settings_file:?}");

        let override_testrun_parameters = env.input("overrideTestrunParameters");

        let run_in_parallel = env.bool_input("runInParallel");
        info!("Run in parallel: {run_in_parallel}");

        let run_tests_in_isolation = env.bool_input("runTestsInIsolation");
        info!("Run in isolation: {run_tests_in_isolation}");

        let tia_config = TiaConfiguration::from_env(env);

        let path_to_custom_test_adapters = custom_adapters_path(env)?;
        info!("Path to custom adapters: {path_to_custom_test_adapters:?}");

        let other_console_options = env.input("otherConsoleOptions");
        info!("Other console options: {other_console_options:?}");

        let code_coverage_enabled = env.bool_input("codeCoverageEnabled");
        info!("Code coverage enabled: {code_coverage_enabled}");

        let vs_test_location_method =
            VsTestLocationMethod::from_input(env.input("vstestLocationMethod").as_deref());
        let (vs_test_version, vs_test_location) = match vs_test_location_method {
            VsTestLocationMethod::Version => {
                let version = requested_version(env)?;
                info!("Test platform version selected: {version}");
                (Some(version), None)
            }
            VsTestLocationMethod::Location => {
                let location = env.input("vsTestLocation");
                info!("vstest.console.exe location specified: {location:?}");
                (None, location)
            }
        };

        if env.bool_input("uiTests") && run_in_parallel {
            warn!("UI tests are running in parallel, which may cause them to fail");
        }

        let mut config = TestConfiguration {
            selection,
            search_folder,
            settings_file,
            override_testrun_parameters,
            run_in_parallel,
            run_tests_in_isolation,
            path_to_custom_test_adapters,
            other_console_options,
            code_coverage_enabled,
            build_config: env.input("configuration"),
            build_platform: env.input("platform"),
            test_run_title: env.input("testRunTitle"),
            vs_test_location_method,
            vs_test_version,
            vs_test_location,
            tia_config,
        };

        self.resolver.resolve(&mut config)?;
        Ok(config)
    }

    /// Assemble a run distributed across the agents of the phase.
    ///
    /// Claims the next instance id from the store, so `env` observes a
    /// `DTA_INSTANCE_ID` write.
    ///
    /// # Errors
    ///
    /// Everything [`Assembler::test_configuration`] rejects, Visual Studio
    /// 2013 as the test platform, and a missing job token.
    pub fn distributed(&self, env: &mut impl TaskEnvironment) -> Result<DtaTestConfigurations> {
        ensure_distributable(
            VsTestLocationMethod::from_input(env.input("vstestLocationMethod").as_deref()),
            env.input("vsTestVersion").as_deref(),
        )?;

        let base = self.test_configuration(&*env)?;
        ensure_distributable(base.vs_test_location_method, base.vs_test_version.as_deref())?;

        if base.run_tests_in_isolation {
            warn!("Running tests in isolation is not supported for distributed runs");
        }
        if base.other_console_options.is_some() {
            warn!("Other console options are not supported for distributed runs");
        }

        let number_of_agents_in_phase = agents_in_phase(&*env);
        info!("Number of agents in phase: {number_of_agents_in_phase}");

        let number_of_test_cases_per_slice = test_cases_per_slice(&*env);

        let use_vs_test_console = env
            .variable("UseVsTestConsole")
            .map_or(true, |value| is_true(Some(&value)));

        let token = job_token(&*env)?;
        let instance_id = InstanceCounter::claim(&mut *env);
        let dta_environment = DtaEnvironment::with_token(&*env, token, instance_id);

        Ok(DtaTestConfigurations {
            base,
            use_vs_test_console,
            number_of_agents_in_phase,
            number_of_test_cases_per_slice,
            dta_environment,
        })
    }

    /// Assemble a single-agent run.
    ///
    /// # Errors
    ///
    /// Everything [`Assembler::test_configuration`] rejects.
    pub fn vstest(&self, env: &impl TaskEnvironment) -> Result<VsTestConfigurations> {
        let base = self.test_configuration(env)?;
        Ok(VsTestConfigurations {
            base,
            publish_run_attachments: env.bool_input("publishRunAttachments"),
            vstest_diag_file: temp_file_path(),
            ignore_vstest_failure: env.bool_variable("vstest.ignoretestfailures"),
        })
    }
}

/// [`Assembler::distributed`] with runner details left unresolved.
///
/// # Errors
///
/// See [`Assembler::distributed`].
pub fn distributed_test_configurations(
    env: &mut impl TaskEnvironment,
) -> Result<DtaTestConfigurations> {
    Assembler::new().distributed(env)
}

/// [`Assembler::vstest`] with runner details left unresolved.
///
/// # Errors
///
/// See [`Assembler::vstest`].
pub fn vs_test_configurations(env: &impl TaskEnvironment) -> Result<VsTestConfigurations> {
    Assembler::new().vstest(env)
}

fn custom_adapters_path(env: &impl TaskEnvironment) -> Result<Option<PathBuf>> {
    let Some(raw) = env.input("pathtoCustomTestAdapters") else {
        return Ok(None);
    };
    let path = resolve_path(&raw);
    if !path.is_dir() {
        return Err(Error::InvalidCustomAdapterPath { path });
    }
    Ok(Some(path))
}

fn requested_version(env: &impl TaskEnvironment) -> Result<String> {
    let version = env
        .input("vsTestVersion")
        .ok_or(Error::MissingVsTestVersion)?;
    if SUPPORTED_VERSIONS.contains(&version.as_str()) || version.eq_ignore_ascii_case("latest") {
        Ok(version)
    } else {
        Err(Error::invalid_version(version))
    }
}

fn ensure_distributable(method: VsTestLocationMethod, version: Option<&str>) -> Result<()> {
    if method == VsTestLocationMethod::Version && version == Some(VS2013_VERSION) {
        return Err(Error::unsupported(
            "Visual Studio 2013 is not supported for distributed test runs",
        ));
    }
    Ok(())
}

fn agents_in_phase(env: &impl TaskEnvironment) -> u32 {
    let Some(jobs) = env
        .variable("SYSTEM_TOTALJOBSINPHASE")
        .as_deref()
        .and_then(parse_leading_int)
    else {
        return 0;
    };
    u32::try_from(jobs).unwrap_or_else(|_| {
        debug!(jobs, "Total jobs in phase out of range, using 0");
        0
    })
}

fn test_cases_per_slice(env: &impl TaskEnvironment) -> u32 {
    if env.input("distributeTestsOption").as_deref() != Some(DISTRIBUTE_BY_TEST_BATCH) {
        return 0;
    }

    let requested = env
        .input("distributeByTestBatchOption")
        .as_deref()
        .and_then(parse_leading_int)
        .filter(|size| *size > 0)
        .and_then(|size| u32::try_from(size).ok());

    let size = requested.unwrap_or_else(|| {
        warn!(
            "Invalid number of test cases per batch, using {DEFAULT_TEST_CASES_PER_SLICE}"
        );
        DEFAULT_TEST_CASES_PER_SLICE
    });
    info!("Number of test cases per slice: {size}");
    size
}
