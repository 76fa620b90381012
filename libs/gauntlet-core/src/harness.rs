//! Test Harness - drive the transformer and judge across a level's
//! test cases and aggregate pass/fail.
//!
//! Cases run strictly one at a time, in input order, which bounds load
//! on the remote judge and keeps generated-code debugging traceable.
//! A judge failure on one case is recorded on that case and never
//! aborts the rest; this module has no error path of its own.

use serde::Serialize;
use tracing::{debug, info};

use crate::judge::{Judge, VerdictStatus};
use crate::transform::transform;
use crate::types::TestCase;

/// Outcome of one test case. Either `status`/outputs are populated
/// (the judge produced a verdict) or `error` is (transport/timeout).
#[derive(Debug, Clone, Serialize)]
pub struct CaseResult {
    pub input: String,
    pub expected_output: String,
    pub actual_output: Option<String>,
    pub stderr: Option<String>,
    pub compile_output: Option<String>,
    pub time: Option<String>,
    pub memory: Option<f64>,
    pub status: Option<VerdictStatus>,
    pub passed: bool,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HarnessReport {
    pub all_passed: bool,
    pub passed_count: usize,
    pub total_count: usize,
    pub results: Vec<CaseResult>,
}

/// Pass iff the verdict is accepted and trimmed stdout equals the
/// trimmed expected output. Trailing/leading whitespace differences
/// are forgiven; interior differences are not.
fn classify(status: &VerdictStatus, stdout: Option<&str>, expected: &str) -> bool {
    status.is_accepted() && stdout.unwrap_or("").trim() == expected.trim()
}

pub async fn run_test_cases(
    judge: &dyn Judge,
    code: &str,
    language_id: u32,
    cases: &[TestCase],
) -> HarnessReport {
    let mut results = Vec::with_capacity(cases.len());

    for (idx, case) in cases.iter().enumerate() {
        let program = transform(code, language_id, &case.input);
        debug!(
            case = idx + 1,
            language_id,
            program_bytes = program.len(),
            "Submitting test case"
        );

        let result = match judge
            .evaluate(&program, language_id, &case.input, &case.output)
            .await
        {
            Ok(verdict) => {
                let passed = classify(&verdict.status, verdict.stdout.as_deref(), &case.output);
                CaseResult {
                    input: case.input.clone(),
                    expected_output: case.output.clone(),
                    actual_output: verdict.stdout,
                    stderr: verdict.stderr,
                    compile_output: verdict.compile_output,
                    time: verdict.time,
                    memory: verdict.memory,
                    status: Some(verdict.status),
                    passed,
                    error: None,
                }
            }
            Err(e) => CaseResult {
                input: case.input.clone(),
                expected_output: case.output.clone(),
                actual_output: None,
                stderr: None,
                compile_output: None,
                time: None,
                memory: None,
                status: None,
                passed: false,
                error: Some(e.to_string()),
            },
        };

        debug!(case = idx + 1, passed = result.passed, "Case evaluated");
        results.push(result);
    }

    let passed_count = results.iter().filter(|r| r.passed).count();
    let total_count = results.len();
    let all_passed = passed_count == total_count && total_count > 0;

    info!(passed_count, total_count, all_passed, "Harness run complete");

    HarnessReport {
        all_passed,
        passed_count,
        total_count,
        results,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::judge::testing::{accepted, compile_error, wrong_answer, ScriptedJudge};
    use crate::judge::JudgeError;
    use uuid::Uuid;

    fn make_case(input: &str, output: &str) -> TestCase {
        TestCase {
            id: Uuid::new_v4(),
            level_id: Uuid::nil(),
            input: input.to_string(),
            output: output.to_string(),
            description: String::new(),
        }
    }

    #[tokio::test]
    async fn test_all_cases_pass() {
        let judge = ScriptedJudge::new(vec![Ok(accepted("5")), Ok(accepted("15"))]);
        let cases = vec![make_case("[2,3]", "5"), make_case("[10,5]", "15")];

        let report = run_test_cases(&judge, "def add(a,b): return a+b", 71, &cases).await;

        assert!(report.all_passed);
        assert_eq!(report.passed_count, 2);
        assert_eq!(report.total_count, 2);
    }

    #[tokio::test]
    async fn test_trailing_newline_still_passes() {
        let judge = ScriptedJudge::new(vec![Ok(accepted("5\n"))]);
        let cases = vec![make_case("[2,3]", "5")];

        let report = run_test_cases(&judge, "def add(a,b): return a+b", 71, &cases).await;
        assert!(report.all_passed);
    }

    #[tokio::test]
    async fn test_interior_whitespace_difference_fails() {
        let judge = ScriptedJudge::new(vec![Ok(accepted("a  b"))]);
        let cases = vec![make_case("\"x\"", "a b")];

        let report = run_test_cases(&judge, "def f(s): return s", 71, &cases).await;
        assert!(!report.all_passed);
        assert_eq!(report.passed_count, 0);
    }

    #[tokio::test]
    async fn test_accepted_status_with_wrong_stdout_fails() {
        let judge = ScriptedJudge::new(vec![Ok(accepted("6"))]);
        let cases = vec![make_case("[2,3]", "5")];

        let report = run_test_cases(&judge, "def add(a,b): return a+b+1", 71, &cases).await;
        assert!(!report.results[0].passed);
    }

    #[tokio::test]
    async fn test_matching_stdout_without_accepted_status_fails() {
        let judge = ScriptedJudge::new(vec![Ok(wrong_answer("5"))]);
        let cases = vec![make_case("[2,3]", "5")];

        let report = run_test_cases(&judge, "def add(a,b): return a+b", 71, &cases).await;
        assert!(!report.results[0].passed);
    }

    #[tokio::test]
    async fn test_judge_failure_recorded_without_aborting_batch() {
        let judge = ScriptedJudge::new(vec![
            Err(JudgeError::PollTimeout(10)),
            Ok(accepted("15")),
        ]);
        let cases = vec![make_case("[2,3]", "5"), make_case("[10,5]", "15")];

        let report = run_test_cases(&judge, "def add(a,b): return a+b", 71, &cases).await;

        assert!(!report.all_passed);
        assert_eq!(report.passed_count, 1);
        assert_eq!(report.total_count, 2);
        assert!(!report.results[0].passed);
        assert!(report.results[0].error.as_ref().unwrap().contains("10 polls"));
        assert!(report.results[1].passed);
    }

    #[tokio::test]
    async fn test_result_order_matches_input_order() {
        let judge = ScriptedJudge::new(vec![
            Ok(accepted("one")),
            Ok(wrong_answer("nope")),
            Ok(accepted("three")),
        ]);
        let cases = vec![
            make_case("1", "one"),
            make_case("2", "two"),
            make_case("3", "three"),
        ];

        let report = run_test_cases(&judge, "code", 71, &cases).await;
        let inputs: Vec<&str> = report.results.iter().map(|r| r.input.as_str()).collect();
        assert_eq!(inputs, vec!["1", "2", "3"]);
        assert_eq!(report.passed_count, 2);
    }

    #[tokio::test]
    async fn test_compile_error_case_carries_compile_output() {
        let judge = ScriptedJudge::new(vec![Ok(compile_error("SyntaxError: line 1"))]);
        let cases = vec![make_case("[2,3]", "5")];

        let report = run_test_cases(&judge, "def add(a,b) return a+b", 71, &cases).await;
        assert!(!report.results[0].passed);
        assert_eq!(
            report.results[0].compile_output.as_deref(),
            Some("SyntaxError: line 1")
        );
    }

    #[tokio::test]
    async fn test_empty_case_list_is_not_all_passed() {
        let judge = ScriptedJudge::new(vec![]);
        let report = run_test_cases(&judge, "code", 71, &[]).await;
        assert!(!report.all_passed);
        assert_eq!(report.total_count, 0);
    }
}
