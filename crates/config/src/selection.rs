//! Test selection modes and their mode-specific inputs.

use crate::error::{Error, Result};
use crate::parse::parse_leading_int;
use crate::variables::TaskEnvironment;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use tracing::info;

/// Which tests the run picks up.
///
/// Each mode carries only its own fields, so a test-plan run never has an
/// assembly filter and an assembly run never has a suite list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "testSelection", rename_all = "camelCase")]
pub enum TestSelection {
    /// Tests associated with suites of a test plan.
    TestPlan {
        /// Test plan id; `None` when the input was not numeric
        #[serde(rename = "testplan")]
        plan_id: Option<i64>,
        /// Test plan configuration id
        #[serde(rename = "testPlanConfigId")]
        config_id: Option<i64>,
        /// Suite ids in input order
        #[serde(rename = "testSuites")]
        suite_ids: Vec<Option<i64>>,
    },
    /// Tests discovered from assemblies matching minimatch patterns.
    TestAssemblies {
        /// One pattern per line of the input
        #[serde(rename = "sourceFilter")]
        source_filter: Vec<String>,
        /// Test case filter expression
        #[serde(rename = "testcaseFilter")]
        test_case_filter: Option<String>,
    },
    /// Tests of an on-demand test run created elsewhere.
    TestRun {
        /// The run id, kept as supplied
        #[serde(rename = "onDemandTestRunId")]
        on_demand_test_run_id: String,
    },
}

/// Selection mode without its payload, parsed from the `testSelector` input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectorKind {
    /// `testPlan`
    TestPlan,
    /// `testAssemblies`
    TestAssemblies,
    /// `testRun`
    TestRun,
}

impl FromStr for SelectorKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "testplan" => Ok(Self::TestPlan),
            "testassemblies" => Ok(Self::TestAssemblies),
            "testrun" => Ok(Self::TestRun),
            _ => Err(Error::UnknownTestSelector {
                selector: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for SelectorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::TestPlan => "Test plan",
            Self::TestAssemblies => "Test assemblies",
            Self::TestRun => "Test run",
        };
        f.write_str(name)
    }
}

impl TestSelection {
    /// The mode of this selection.
    #[must_use]
    pub const fn kind(&self) -> SelectorKind {
        match self {
            Self::TestPlan { .. } => SelectorKind::TestPlan,
            Self::TestAssemblies { .. } => SelectorKind::TestAssemblies,
            Self::TestRun { .. } => SelectorKind::TestRun,
        }
    }

    /// Read the `testSelector` input and the inputs of the chosen mode.
    ///
    /// Inputs belonging to the other modes are never read.
    ///
    /// # Errors
    ///
    /// Fails on an unknown selector and on a test run id that is not a
    /// positive integer.
    pub fn from_inputs(env: &impl TaskEnvironment) -> Result<Self> {
        let raw = env.input("testSelector").unwrap_or_default();
        let kind: SelectorKind = raw.parse()?;
        info!("Test selector: {kind}");

        match kind {
            SelectorKind::TestPlan => Ok(Self::test_plan(env)),
            SelectorKind::TestAssemblies => Ok(Self::test_assemblies(env)),
            SelectorKind::TestRun => Self::test_run(env),
        }
    }

    fn test_plan(env: &impl TaskEnvironment) -> Self {
        let plan_id = env.input("testPlan").as_deref().and_then(parse_leading_int);
        info!("Test plan id: {plan_id:?}");

        let config_id = env
            .input("testConfiguration")
            .as_deref()
            .and_then(parse_leading_int);
        info!("Test plan configuration id: {config_id:?}");

        let suite_ids = env
            .delimited_input("testSuite", ',')
            .iter()
            .map(|suite| {
                let id = parse_leading_int(suite);
                info!("Test suite selected: {id:?}");
                id
            })
            .collect();

        Self::TestPlan {
            plan_id,
            config_id,
            suite_ids,
        }
    }

    fn test_assemblies(env: &impl TaskEnvironment) -> Self {
        let source_filter = env.delimited_input("testAssemblyVer2", '\n');
        info!("Test assemblies: {}", source_filter.join(", "));

        let test_case_filter = env.input("testFiltercriteria");
        info!("Test filter criteria: {test_case_filter:?}");

        Self::TestAssemblies {
            source_filter,
            test_case_filter,
        }
    }

    fn test_run(env: &impl TaskEnvironment) -> Result<Self> {
        let id = env.input("tcmTestRun").unwrap_or_default();
        match parse_leading_int(&id) {
            Some(parsed) if parsed > 0 => {}
            _ => return Err(Error::invalid_test_run_id(id)),
        }
        info!("Test run id: {id}");

        Ok(Self::TestRun {
            on_demand_test_run_id: id,
        })
    }
}
