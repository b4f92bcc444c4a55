use super::*;

#[tokio::test]
async fn test_mock_runner_matches_args() {
    let mut mock = MockProcessRunner::new();
    mock.expect_command("nextflow")
        .with_args(|args| args.first().map(String::as_str) == Some("log"))
        .returns_stdout("/work/ab/123\n")
        .finish();

    let output = mock
        .run(ProcessCommandBuilder::new("nextflow").args(["log", "abc"]).build())
        .await
        .unwrap();
    assert_eq!(output.stdout, "/work/ab/123\n");

    let unmatched = mock
        .run(ProcessCommandBuilder::new("nextflow").arg("run").build())
        .await;
    assert!(matches!(
        unmatched,
        Err(ProcessError::MockExpectationNotMet(_))
    ));
    assert!(mock.verify_called("nextflow", 2));
}

#[tokio::test]
async fn test_mock_runner_enforces_times() {
    let mut mock = MockProcessRunner::new();
    mock.expect_command("git")
        .with_args(|args| args == ["pull"])
        .returns_success()
        .times(2)
        .finish();

    for _ in 0..2 {
        let result = mock
            .run(ProcessCommandBuilder::new("git").arg("pull").build())
            .await;
        assert!(result.is_ok());
    }

    let third = mock
        .run(ProcessCommandBuilder::new("git").arg("pull").build())
        .await;
    assert!(third.is_err());
}

#[tokio::test]
async fn test_subprocess_manager_git_uses_shared_runner() {
    let (manager, mut mock) = SubprocessManager::mock();

    mock.expect_command("git")
        .with_args(|args| args == ["branch", "--show-current"])
        .returns_stdout("main\n")
        .finish();

    let branch = manager
        .git()
        .current_branch(std::path::Path::new("."))
        .await
        .unwrap();

    assert_eq!(branch, "main");
    assert_eq!(mock.get_call_history().len(), 1);
}

#[test]
fn test_process_command_builder() {
    let command = ProcessCommandBuilder::new("nextflow")
        .arg("run")
        .args(["main.nf", "-resume"])
        .current_dir(std::path::Path::new("/tmp"))
        .inherit_stdio()
        .build();

    assert_eq!(command.program, "nextflow");
    assert_eq!(command.args, vec!["run", "main.nf", "-resume"]);
    assert_eq!(command.working_dir, Some(std::path::PathBuf::from("/tmp")));
    assert!(command.inherit_stdio);
}

#[tokio::test]
async fn test_tokio_runner_captures_output() {
    let runner = runner::TokioProcessRunner;
    let output = runner
        .run(ProcessCommandBuilder::new("sh").args(["-c", "echo hello; exit 3"]).build())
        .await
        .unwrap();

    assert_eq!(output.stdout.trim(), "hello");
    assert_eq!(output.status, ExitStatus::Error(3));
}

#[tokio::test]
async fn test_tokio_runner_missing_program() {
    let runner = runner::TokioProcessRunner;
    let result = runner
        .run(ProcessCommandBuilder::new("raft_nonexistent_command_12345").build())
        .await;
    assert!(matches!(result, Err(ProcessError::CommandNotFound(_))));
}
