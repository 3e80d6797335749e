// ABOUTME: Integration tests for the fragment execution protocol using a stub provider
// ABOUTME: Covers provisioning failure, teardown semantics, and concurrent deploys

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crucible_core::filetree::{EntryKind, ProviderEntry};
use crucible_sandbox::{
    CodeExecution, CommandOpts, CommandResult, ConnectOpts, CreateOpts, ExecutionResult, Fragment,
    FragmentCode, FragmentFile, FragmentRunner, RunCredentials, SandboxClient, SandboxError,
    SandboxHandle,
};

/// Failure switches for the stub provider
#[derive(Debug, Clone, Copy, Default)]
struct StubBehavior {
    fail_create: bool,
    fail_run_code: bool,
    fail_command: bool,
    fail_kill: bool,
}

/// Stub provider recording every call in order
struct StubClient {
    behavior: StubBehavior,
    ops: Arc<Mutex<Vec<String>>>,
    written: Arc<Mutex<HashMap<String, String>>>,
}

impl StubClient {
    fn new(behavior: StubBehavior) -> Self {
        Self {
            behavior,
            ops: Arc::new(Mutex::new(Vec::new())),
            written: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn ops(&self) -> Vec<String> {
        self.ops.lock().unwrap().clone()
    }

    fn written(&self) -> HashMap<String, String> {
        self.written.lock().unwrap().clone()
    }
}

#[async_trait]
impl SandboxClient for StubClient {
    async fn create(&self, template: &str, _opts: CreateOpts) -> Result<Box<dyn SandboxHandle>, SandboxError> {
        self.ops.lock().unwrap().push(format!("create:{}", template));
        if self.behavior.fail_create {
            return Err(SandboxError::Api {
                status: 500,
                message: "no capacity".to_string(),
            });
        }
        Ok(Box::new(StubHandle {
            behavior: self.behavior,
            ops: Arc::clone(&self.ops),
            written: Arc::clone(&self.written),
            template: template.to_string(),
        }))
    }

    async fn connect(
        &self,
        _sandbox_id: &str,
        _opts: ConnectOpts,
    ) -> Result<Box<dyn SandboxHandle>, SandboxError> {
        unimplemented!("not exercised by these tests")
    }
}

struct StubHandle {
    behavior: StubBehavior,
    ops: Arc<Mutex<Vec<String>>>,
    written: Arc<Mutex<HashMap<String, String>>>,
    template: String,
}

#[async_trait]
impl SandboxHandle for StubHandle {
    fn sandbox_id(&self) -> &str {
        "sbx-stub"
    }

    fn template(&self) -> &str {
        &self.template
    }

    async fn write_file(&self, path: &str, content: &str) -> Result<(), SandboxError> {
        self.ops.lock().unwrap().push(format!("write:{}", path));
        self.written
            .lock()
            .unwrap()
            .insert(path.to_string(), content.to_string());
        Ok(())
    }

    async fn read_file(&self, path: &str) -> Result<String, SandboxError> {
        self.written
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| SandboxError::Unknown(format!("no such file: {}", path)))
    }

    async fn list_files(&self, _path: &str) -> Result<Vec<ProviderEntry>, SandboxError> {
        self.ops.lock().unwrap().push("list_files".to_string());
        Ok(vec![
            ProviderEntry {
                name: "node_modules".to_string(),
                path: "/node_modules".to_string(),
                kind: EntryKind::Dir,
                children: Some(vec![ProviderEntry {
                    name: "left-pad".to_string(),
                    path: "/node_modules/left-pad".to_string(),
                    kind: EntryKind::Dir,
                    children: None,
                }]),
            },
            ProviderEntry {
                name: "main.py".to_string(),
                path: "/main.py".to_string(),
                kind: EntryKind::File,
                children: None,
            },
        ])
    }

    async fn run_command(
        &self,
        command: &str,
        opts: CommandOpts,
    ) -> Result<CommandResult, SandboxError> {
        let mut envs: Vec<_> = opts.envs.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
        envs.sort();
        self.ops
            .lock()
            .unwrap()
            .push(format!("command:{}[{}]", command, envs.join(",")));
        if self.behavior.fail_command {
            return Ok(CommandResult {
                stdout: String::new(),
                stderr: "command not found".to_string(),
                exit_code: 127,
            });
        }
        Ok(CommandResult {
            stdout: "ok".to_string(),
            stderr: String::new(),
            exit_code: 0,
        })
    }

    async fn run_code(&self, _code: &str) -> Result<CodeExecution, SandboxError> {
        self.ops.lock().unwrap().push("run_code".to_string());
        if self.behavior.fail_run_code {
            return Err(SandboxError::Api {
                status: 500,
                message: "kernel died".to_string(),
            });
        }
        Ok(CodeExecution {
            stdout: vec!["2".to_string()],
            stderr: vec![],
            runtime_error: None,
            results: vec![],
        })
    }

    async fn get_host(&self, port: u16) -> Result<String, SandboxError> {
        self.ops.lock().unwrap().push(format!("get_host:{}", port));
        Ok(format!("{}-sbx-stub.e2b.dev", port))
    }

    async fn kill(&self) -> Result<(), SandboxError> {
        self.ops.lock().unwrap().push("kill".to_string());
        if self.behavior.fail_kill {
            return Err(SandboxError::Api {
                status: 502,
                message: "already gone".to_string(),
            });
        }
        Ok(())
    }
}

fn interpreter_fragment(code: &str) -> Fragment {
    Fragment {
        template: "code-interpreter-v1".to_string(),
        code: FragmentCode::Single(code.to_string()),
        has_additional_dependencies: false,
        install_dependencies_command: None,
        file_path: Some("main.py".to_string()),
        port: None,
    }
}

fn runner_with(behavior: StubBehavior) -> (FragmentRunner, Arc<StubClient>) {
    let client = Arc::new(StubClient::new(behavior));
    let runner = FragmentRunner::new(client.clone() as Arc<dyn SandboxClient>);
    (runner, client)
}

#[tokio::test]
async fn test_interpreter_run_captures_output_and_snapshot() {
    let (runner, client) = runner_with(StubBehavior::default());

    let run = runner
        .run_fragment(&interpreter_fragment("print(1+1)"), &RunCredentials::default())
        .await
        .expect("run should succeed");

    assert_eq!(run.sbx_id, "sbx-stub");
    match run.result {
        ExecutionResult::Interpreter { stdout, files, .. } => {
            assert_eq!(stdout, vec!["2".to_string()]);
            // Dependency caches are pruned from the snapshot
            assert_eq!(files.len(), 1);
            assert_eq!(files[0].path, "/main.py");
        }
        ExecutionResult::Web { .. } => panic!("expected interpreter result"),
    }

    assert_eq!(
        client.ops(),
        vec![
            "create:code-interpreter-v1",
            "write:main.py",
            "run_code",
            "list_files"
        ]
    );
}

#[tokio::test]
async fn test_provision_failure_skips_cleanup() {
    let (runner, client) = runner_with(StubBehavior {
        fail_create: true,
        ..Default::default()
    });

    let err = runner
        .run_fragment(&interpreter_fragment("print(1)"), &RunCredentials::default())
        .await
        .expect_err("provisioning must fail");

    assert!(matches!(err, SandboxError::Creation(_)));
    // Nothing was created, so no kill is attempted
    assert_eq!(client.ops(), vec!["create:code-interpreter-v1"]);
}

#[tokio::test]
async fn test_execution_failure_triggers_kill() {
    let (runner, client) = runner_with(StubBehavior {
        fail_run_code: true,
        ..Default::default()
    });

    let err = runner
        .run_fragment(&interpreter_fragment("print(1)"), &RunCredentials::default())
        .await
        .expect_err("execution must fail");

    assert!(matches!(err, SandboxError::Execution(_)));
    assert_eq!(client.ops().last().unwrap(), "kill");
}

#[tokio::test]
async fn test_failed_kill_never_masks_execution_error() {
    let (runner, client) = runner_with(StubBehavior {
        fail_run_code: true,
        fail_kill: true,
        ..Default::default()
    });

    let err = runner
        .run_fragment(&interpreter_fragment("print(1)"), &RunCredentials::default())
        .await
        .expect_err("execution must fail");

    // The surfaced error is the execution failure, not the kill failure
    match err {
        SandboxError::Execution(message) => assert!(message.contains("kernel died")),
        other => panic!("expected execution error, got {:?}", other),
    }
    assert_eq!(client.ops().last().unwrap(), "kill");
}

#[tokio::test]
async fn test_multi_file_deploy_writes_every_file() {
    let (runner, client) = runner_with(StubBehavior::default());

    let files: Vec<FragmentFile> = (0..8)
        .map(|i| FragmentFile {
            file_path: format!("src/module_{}.py", i),
            file_content: format!("VALUE = {}", i),
        })
        .collect();

    let fragment = Fragment {
        template: "code-interpreter-v1".to_string(),
        code: FragmentCode::Files(files.clone()),
        has_additional_dependencies: false,
        install_dependencies_command: None,
        file_path: Some("src/module_0.py".to_string()),
        port: None,
    };

    runner
        .run_fragment(&fragment, &RunCredentials::default())
        .await
        .expect("run should succeed");

    // Writes are concurrent and unordered; the final file set is what counts
    let written = client.written();
    assert_eq!(written.len(), files.len());
    for file in &files {
        assert_eq!(written.get(&file.file_path), Some(&file.file_content));
    }
}

#[tokio::test]
async fn test_install_runs_before_deploy() {
    let (runner, client) = runner_with(StubBehavior::default());

    let fragment = Fragment {
        template: "code-interpreter-v1".to_string(),
        code: FragmentCode::Single("import pandas".to_string()),
        has_additional_dependencies: true,
        install_dependencies_command: Some("pip install pandas".to_string()),
        file_path: Some("main.py".to_string()),
        port: None,
    };

    runner
        .run_fragment(&fragment, &RunCredentials::default())
        .await
        .expect("run should succeed");

    let ops = client.ops();
    let install_idx = ops
        .iter()
        .position(|op| op.starts_with("command:pip install pandas"))
        .expect("install command recorded");
    let write_idx = ops
        .iter()
        .position(|op| op.starts_with("write:"))
        .expect("write recorded");
    assert!(install_idx < write_idx);
}

#[tokio::test]
async fn test_failed_install_classified_as_execution_error() {
    let (runner, client) = runner_with(StubBehavior {
        fail_command: true,
        ..Default::default()
    });

    let fragment = Fragment {
        template: "code-interpreter-v1".to_string(),
        code: FragmentCode::Single("import missing".to_string()),
        has_additional_dependencies: true,
        install_dependencies_command: Some("pip install missing".to_string()),
        file_path: None,
        port: None,
    };

    let err = runner
        .run_fragment(&fragment, &RunCredentials::default())
        .await
        .expect_err("install must fail");

    match err {
        SandboxError::Execution(message) => assert!(message.contains("127")),
        other => panic!("expected execution error, got {:?}", other),
    }
    assert_eq!(client.ops().last().unwrap(), "kill");
}

#[tokio::test]
async fn test_web_run_builds_url_from_host_mapping() {
    let (runner, client) = runner_with(StubBehavior::default());

    let fragment = Fragment {
        template: "nextjs-developer".to_string(),
        code: FragmentCode::Files(vec![FragmentFile {
            file_path: "app/page.tsx".to_string(),
            file_content: "export default function Page() {}".to_string(),
        }]),
        has_additional_dependencies: false,
        install_dependencies_command: Some("npm run start".to_string()),
        file_path: None,
        port: Some(3000),
    };

    let run = runner
        .run_fragment(&fragment, &RunCredentials::default())
        .await
        .expect("run should succeed");

    match run.result {
        ExecutionResult::Web { url, .. } => {
            assert_eq!(url, "https://3000-sbx-stub.e2b.dev");
        }
        ExecutionResult::Interpreter { .. } => panic!("expected web result"),
    }

    // Start command runs with the serving port in its environment
    assert!(client
        .ops()
        .iter()
        .any(|op| op == "command:npm run start[PORT=3000]"));
}

#[tokio::test]
async fn test_empty_fragment_rejected_before_provisioning() {
    let (runner, client) = runner_with(StubBehavior::default());

    let err = runner
        .run_fragment(&interpreter_fragment(""), &RunCredentials::default())
        .await
        .expect_err("empty code must be rejected");

    assert!(matches!(err, SandboxError::InvalidFragment(_)));
    assert!(client.ops().is_empty());
}
