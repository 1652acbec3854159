//! Integration tests for assembling runner configurations.
//!
//! These drive the public API with in-memory task environments, plus one
//! end-to-end pass over the process environment the agent exports.

use vstest_config::dta::DTA_INSTANCE_ID;
use vstest_config::variables::SYSTEM_VSS_CONNECTION;
use vstest_config::{
    Assembler, Error, MemoryEnvironment, ProcessEnvironment, TaskEnvironment, TestConfiguration,
    TestSelection, TiaContext, distributed_test_configurations, vs_test_configurations,
};

fn agent() -> MemoryEnvironment {
    MemoryEnvironment::new()
        .with_access_token(SYSTEM_VSS_CONNECTION, "token")
        .with_variable("System.TeamFoundationCollectionUri", "https://dev.azure.com/fabrikam/")
        .with_variable("System.TeamProject", "Fabrikam")
        .with_variable("Agent.MachineName", "BUILD01")
        .with_variable("Agent.Name", "Agent 1")
        .with_variable("Agent.Id", "3")
        .with_variable("System.DefaultWorkingDirectory", "/work/1/s")
        .with_variable("Build.BuildId", "120")
        .with_input("testSelector", "testAssemblies")
        .with_input("testAssemblyVer2", "**\\*test*.dll\n!**\\obj\\**")
}

/// Behavior shared by both kinds of run.
mod shared_settings {
    use super::*;

    #[test]
    fn resolves_relative_paths() {
        let env = agent()
            .with_input("searchFolder", "drop")
            .with_input("runSettingsFile", "settings/unit.runsettings");

        let config = Assembler::new().test_configuration(&env).unwrap();
        let search_folder = config.search_folder.unwrap();
        assert!(search_folder.is_absolute());
        assert!(search_folder.ends_with("drop"));
        assert!(config.settings_file.unwrap().ends_with("settings/unit.runsettings"));
    }

    #[test]
    fn blank_paths_stay_unset() {
        let env = agent()
            .with_input("searchFolder", "   ")
            .with_input("pathtoCustomTestAdapters", " ");

        let config = Assembler::new().test_configuration(&env).unwrap();
        assert_eq!(config.search_folder, None);
        assert_eq!(config.path_to_custom_test_adapters, None);
    }

    #[test]
    fn accepts_existing_custom_adapter_folder() {
        let adapters = tempfile::tempdir().unwrap();
        let env = agent().with_input(
            "pathtoCustomTestAdapters",
            adapters.path().to_string_lossy().into_owned(),
        );

        let config = Assembler::new().test_configuration(&env).unwrap();
        assert_eq!(
            config.path_to_custom_test_adapters.as_deref(),
            Some(adapters.path())
        );
    }

    #[test]
    fn rejects_missing_custom_adapter_folder() {
        let adapters = tempfile::tempdir().unwrap();
        let missing = adapters.path().join("absent");
        let env = agent().with_input(
            "pathtoCustomTestAdapters",
            missing.to_string_lossy().into_owned(),
        );

        let err = Assembler::new().test_configuration(&env).unwrap_err();
        assert!(matches!(err, Error::InvalidCustomAdapterPath { path } if path == missing));
    }

    #[test]
    fn rejects_file_as_custom_adapter_folder() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let env = agent().with_input(
            "pathtoCustomTestAdapters",
            file.path().to_string_lossy().into_owned(),
        );

        assert!(Assembler::new().test_configuration(&env).is_err());
    }

    #[test]
    fn reads_flags_and_passthrough_inputs() {
        let env = agent()
            .with_input("runInParallel", "true")
            .with_input("runTestsInIsolation", "false")
            .with_input("codeCoverageEnabled", "True")
            .with_input("overrideTestrunParameters", "-url http://localhost")
            .with_input("configuration", "Release")
            .with_input("platform", "x64")
            .with_input("testRunTitle", "Nightly")
            .with_input("uiTests", "true");

        let config = Assembler::new().test_configuration(&env).unwrap();
        assert!(config.run_in_parallel);
        assert!(!config.run_tests_in_isolation);
        assert!(config.code_coverage_enabled);
        assert_eq!(
            config.override_testrun_parameters.as_deref(),
            Some("-url http://localhost")
        );
        assert_eq!(config.build_config.as_deref(), Some("Release"));
        assert_eq!(config.build_platform.as_deref(), Some("x64"));
        assert_eq!(config.test_run_title.as_deref(), Some("Nightly"));
    }

    #[test]
    fn resolver_runs_last() {
        let resolver = |config: &mut TestConfiguration| -> vstest_config::Result<()> {
            config.vs_test_location = Some("C:\\vstest\\vstest.console.exe".to_string());
            Ok(())
        };
        let env = agent()
            .with_input("vstestLocationMethod", "version")
            .with_input("vsTestVersion", "latest");

        let config = Assembler::new()
            .with_resolver(resolver)
            .test_configuration(&env)
            .unwrap();
        assert_eq!(config.vs_test_version.as_deref(), Some("latest"));
        assert_eq!(
            config.vs_test_location.as_deref(),
            Some("C:\\vstest\\vstest.console.exe")
        );
    }

    #[test]
    fn resolver_errors_propagate() {
        let resolver = |_: &mut TestConfiguration| -> vstest_config::Result<()> {
            Err(Error::unsupported("no test platform installed"))
        };
        let result = Assembler::new()
            .with_resolver(resolver)
            .test_configuration(&agent());
        assert!(result.unwrap_err().is_unsupported());
    }
}

/// Distributed runs.
mod distributed {
    use super::*;

    #[test]
    fn builds_full_configuration() {
        let mut env = agent()
            .with_variable("SYSTEM_TOTALJOBSINPHASE", "4")
            .with_input("distributeTestsOption", "distributeByTestBatch")
            .with_input("distributeByTestBatchOption", "25");

        let config = distributed_test_configurations(&mut env).unwrap();
        assert!(config.use_vs_test_console);
        assert_eq!(config.number_of_agents_in_phase, 4);
        assert_eq!(config.number_of_test_cases_per_slice, 25);
        assert_eq!(
            config.dta_environment.environment_uri,
            "dta://env/Fabrikam/_apis/build/120/1"
        );
        assert_eq!(config.dta_environment.agent_name, "BUILD01-Agent 1-3");
        assert!(matches!(
            config.base.selection,
            TestSelection::TestAssemblies { .. }
        ));
    }

    #[test]
    fn agent_count_defaults_to_zero() {
        let mut env = agent().with_variable("SYSTEM_TOTALJOBSINPHASE", "many");
        let config = distributed_test_configurations(&mut env).unwrap();
        assert_eq!(config.number_of_agents_in_phase, 0);
        assert_eq!(config.number_of_test_cases_per_slice, 0);
    }

    #[test]
    fn invalid_batch_size_falls_back_to_default() {
        for size in ["0", "abc"] {
            let mut env = agent()
                .with_input("distributeTestsOption", "distributeByTestBatch")
                .with_input("distributeByTestBatchOption", size);
            let config = distributed_test_configurations(&mut env).unwrap();
            assert_eq!(config.number_of_test_cases_per_slice, 10, "size {size:?}");
        }
    }

    #[test]
    fn vs2013_is_unsupported() {
        let mut env = agent()
            .with_input("vstestLocationMethod", "version")
            .with_input("vsTestVersion", "12.0");
        let err = distributed_test_configurations(&mut env).unwrap_err();
        assert!(err.is_unsupported());
    }

    #[test]
    fn vs2013_from_resolver_is_unsupported() {
        let resolver = |config: &mut TestConfiguration| -> vstest_config::Result<()> {
            config.vs_test_version = Some("12.0".to_string());
            Ok(())
        };
        let mut env = agent()
            .with_input("vstestLocationMethod", "version")
            .with_input("vsTestVersion", "latest");

        let err = Assembler::new()
            .with_resolver(resolver)
            .distributed(&mut env)
            .unwrap_err();
        assert!(err.is_unsupported());
    }

    #[test]
    fn vs2013_by_location_is_allowed() {
        let mut env = agent()
            .with_input("vstestLocationMethod", "location")
            .with_input("vsTestVersion", "12.0");
        assert!(distributed_test_configurations(&mut env).is_ok());
    }

    #[test]
    fn unsupported_options_only_warn() {
        let mut env = agent()
            .with_input("runTestsInIsolation", "true")
            .with_input("otherConsoleOptions", "/Platform:x64");
        let config = distributed_test_configurations(&mut env).unwrap();
        assert!(config.base.run_tests_in_isolation);
        assert_eq!(
            config.base.other_console_options.as_deref(),
            Some("/Platform:x64")
        );
    }

    #[test]
    fn use_vs_test_console_override() {
        let mut env = agent().with_variable("UseVsTestConsole", "false");
        let config = distributed_test_configurations(&mut env).unwrap();
        assert!(!config.use_vs_test_console);
    }

    #[test]
    fn instance_id_increments_across_invocations() {
        let mut env = agent();

        let first = distributed_test_configurations(&mut env).unwrap();
        let second = distributed_test_configurations(&mut env).unwrap();

        assert!(first.dta_environment.environment_uri.ends_with("/1"));
        assert!(second.dta_environment.environment_uri.ends_with("/2"));
        assert_eq!(env.variable(DTA_INSTANCE_ID).as_deref(), Some("2"));

        let updates = env.take_updates();
        assert_eq!(updates.len(), 2);
        assert_eq!(
            updates[1].to_string(),
            "##vso[task.setvariable variable=DTA_INSTANCE_ID]2"
        );
    }

    #[test]
    fn release_uri_with_multi_configuration() {
        let mut env = agent()
            .with_variable("Release.ReleaseId", "31")
            .with_variable("Release.DeployPhaseId", "2")
            .with_variable("System.ParallelExecutionType", "multiConfiguration")
            .with_variable("System.JobId", "8d2c")
            .with_variable("release.releaseUri", "vstfs:///ReleaseManagement/Release/31");

        let config = distributed_test_configurations(&mut env).unwrap();
        assert_eq!(
            config.dta_environment.environment_uri,
            "dta://env/Fabrikam/_apis/release/31/2/8d2c/1"
        );
        assert_eq!(config.base.tia_config.context, TiaContext::Cd);
    }

    #[test]
    fn missing_token_fails() {
        let mut env = MemoryEnvironment::new()
            .with_input("testSelector", "testAssemblies")
            .with_variable("System.TeamProject", "Fabrikam");
        let err = distributed_test_configurations(&mut env).unwrap_err();
        assert!(matches!(err, Error::MissingEndpointAuthorization { .. }));
        assert_eq!(env.variable(DTA_INSTANCE_ID), None);
        assert!(env.take_updates().is_empty());
    }

    #[test]
    fn missing_token_keeps_stored_counter() {
        let mut env = MemoryEnvironment::new()
            .with_input("testSelector", "testAssemblies")
            .with_variable(DTA_INSTANCE_ID, "5");
        assert!(distributed_test_configurations(&mut env).is_err());
        assert_eq!(env.variable(DTA_INSTANCE_ID).as_deref(), Some("5"));
        assert!(env.take_updates().is_empty());
    }

    #[test]
    fn serializes_flat_record() {
        let mut env = agent().with_input("runOnlyImpactedTests", "true");
        let config = distributed_test_configurations(&mut env).unwrap();
        let json = serde_json::to_value(&config).unwrap();

        assert_eq!(json["testSelection"], "testAssemblies");
        assert_eq!(json["sourceFilter"][1], "!**\\obj\\**");
        assert_eq!(json["useVsTestConsole"], true);
        assert_eq!(json["tiaConfig"]["tiaEnabled"], true);
        assert_eq!(json["tiaConfig"]["context"], "CI");
        assert_eq!(json["dtaEnvironment"]["patToken"], "token");
        assert_eq!(json["vsTestLocationMethod"], "location");
    }
}

/// Single-agent runs.
mod vstest {
    use super::*;

    #[test]
    fn builds_configuration() {
        let env = agent()
            .with_input("publishRunAttachments", "true")
            .with_variable("vstest.ignoretestfailures", "TRUE");

        let config = vs_test_configurations(&env).unwrap();
        assert!(config.publish_run_attachments);
        assert!(config.ignore_vstest_failure);
        assert!(config.vstest_diag_file.starts_with(std::env::temp_dir()));
    }

    #[test]
    fn does_not_touch_instance_counter() {
        let mut env = agent();
        vs_test_configurations(&env).unwrap();
        assert!(env.take_updates().is_empty());
        assert_eq!(env.variable(DTA_INSTANCE_ID), None);
    }

    #[test]
    fn diag_file_is_fresh_per_call() {
        let env = agent();
        let first = vs_test_configurations(&env).unwrap();
        let second = vs_test_configurations(&env).unwrap();
        assert_ne!(first.vstest_diag_file, second.vstest_diag_file);
    }

    #[test]
    fn test_plan_selection() {
        let env = agent()
            .with_input("testSelector", "testPlan")
            .with_input("testPlan", "44")
            .with_input("testConfiguration", "2")
            .with_input("testSuite", "1,2,3");

        let config = vs_test_configurations(&env).unwrap();
        assert_eq!(
            config.base.selection,
            TestSelection::TestPlan {
                plan_id: Some(44),
                config_id: Some(2),
                suite_ids: vec![Some(1), Some(2), Some(3)],
            }
        );
    }

    #[test]
    fn oversized_ids_are_kept() {
        let env = agent()
            .with_input("testSelector", "testPlan")
            .with_input("testPlan", "44")
            .with_input("testSuite", "1,99999999999999999999");
        let config = vs_test_configurations(&env).unwrap();
        assert!(matches!(
            config.base.selection,
            TestSelection::TestPlan { ref suite_ids, .. } if suite_ids == &[Some(1), Some(i64::MAX)]
        ));

        let env = agent()
            .with_input("testSelector", "testRun")
            .with_input("tcmTestRun", "99999999999999999999");
        let config = vs_test_configurations(&env).unwrap();
        assert_eq!(
            config.base.selection,
            TestSelection::TestRun {
                on_demand_test_run_id: "99999999999999999999".to_string()
            }
        );
    }

    #[test]
    fn invalid_test_run_id_fails() {
        let env = agent()
            .with_input("testSelector", "testRun")
            .with_input("tcmTestRun", "0");
        assert!(matches!(
            vs_test_configurations(&env),
            Err(Error::InvalidTestRunId { .. })
        ));
    }
}

/// End to end over the variables the agent exports.
#[test]
fn assembles_from_process_environment() {
    temp_env::with_vars(
        [
            ("INPUT_TESTSELECTOR", Some("testRun")),
            ("INPUT_TCMTESTRUN", Some("77")),
            ("INPUT_VSTESTLOCATIONMETHOD", Some("version")),
            ("INPUT_VSTESTVERSION", Some("15.0")),
            ("SYSTEM_TEAMPROJECT", Some("Fabrikam")),
            ("BUILD_BUILDID", Some("900")),
            ("RELEASE_RELEASEID", None),
            ("DTA_INSTANCE_ID", Some("6")),
            (
                "ENDPOINT_AUTH_SYSTEMVSSCONNECTION",
                Some(r#"{"parameters":{"AccessToken":"abc"},"scheme":"OAuth"}"#),
            ),
        ],
        || {
            let mut env = ProcessEnvironment::new();
            let config = distributed_test_configurations(&mut env).unwrap();

            assert_eq!(
                config.base.selection,
                TestSelection::TestRun {
                    on_demand_test_run_id: "77".to_string()
                }
            );
            assert_eq!(config.base.vs_test_version.as_deref(), Some("15.0"));
            assert_eq!(
                config.dta_environment.environment_uri,
                "dta://env/Fabrikam/_apis/build/900/7"
            );
            assert_eq!(env.take_updates().len(), 1);
        },
    );
}
