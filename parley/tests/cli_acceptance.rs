use assert_cmd::Command;
use std::fs;
use std::path::PathBuf;
use std::process::Output;
use tempfile::TempDir;

struct CliTestEnv {
    _temp_dir: TempDir,
    home: PathBuf,
    xdg_config: PathBuf,
    xdg_state: PathBuf,
}

impl CliTestEnv {
    fn new() -> Self {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let base = temp_dir.path().to_path_buf();
        let home = base.join("home");
        let xdg_config = base.join("xdg-config");
        let xdg_state = base.join("xdg-state");

        fs::create_dir_all(&home).expect("failed to create HOME");
        fs::create_dir_all(&xdg_config).expect("failed to create XDG_CONFIG_HOME");
        fs::create_dir_all(&xdg_state).expect("failed to create XDG_STATE_HOME");

        Self {
            _temp_dir: temp_dir,
            home,
            xdg_config,
            xdg_state,
        }
    }

    fn write_config(&self, contents: &str) {
        let dir = self.xdg_config.join("parley");
        fs::create_dir_all(&dir).expect("failed to create config dir");
        fs::write(dir.join("config.toml"), contents).expect("failed to write config");
    }
}

fn run_parley(env: &CliTestEnv, args: &[&str], stdin: &str) -> Output {
    let mut command = Command::new(assert_cmd::cargo::cargo_bin!("parley"));

    command
        .args(args)
        .env("HOME", &env.home)
        .env("XDG_CONFIG_HOME", &env.xdg_config)
        .env("XDG_STATE_HOME", &env.xdg_state)
        .env_remove("REDIS_URL")
        .env_remove("OPENAI_API_KEY")
        .env_remove("OPENAI_MODEL")
        .env_remove("APP_ENV")
        .env_remove("RUST_LOG")
        .write_stdin(stdin)
        .output()
        .unwrap_or_else(|e| panic!("failed to execute parley: {e}"))
}

fn assert_success(args: &[&str], output: &Output) {
    if output.status.success() {
        return;
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    panic!(
        "parley {} failed\nstatus: {}\nstdout:\n{}\nstderr:\n{}",
        args.join(" "),
        output.status,
        stdout,
        stderr
    );
}

#[test]
fn echo_chat_replies_and_exits_on_quit() {
    let env = CliTestEnv::new();
    let args = ["chat", "--provider", "echo"];

    let output = run_parley(&env, &args, "hello\n\n/quit\n");
    assert_success(&args, &output);

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("ephemeral history"), "stdout:\n{stdout}");
    assert!(stdout.contains("You said: hello"), "stdout:\n{stdout}");
    assert!(
        env.xdg_state.join("parley").exists(),
        "log directory should be created"
    );
}

#[test]
fn echo_chat_history_command_and_eof() {
    let env = CliTestEnv::new();
    let args = ["chat", "--provider", "echo", "--session", "abc123"];

    // No /quit: end of input ends the chat too
    let output = run_parley(&env, &args, "first\n/history\n");
    assert_success(&args, &output);

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Session abc123"));
    assert!(stdout.contains("[User] first"), "stdout:\n{stdout}");
    assert!(stdout.contains("[Assistant] You said: first"), "stdout:\n{stdout}");
}

#[test]
fn chat_banner_shows_short_session_id_and_resume_hint() {
    let env = CliTestEnv::new();
    let args = ["chat", "--provider", "echo", "--session", "0123456789abcdef"];

    let output = run_parley(&env, &args, "/quit\n");
    assert_success(&args, &output);

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Session 01234567 (ephemeral history)"), "stdout:\n{stdout}");
    assert!(
        stdout.contains("parley chat --session 0123456789abcdef"),
        "stdout:\n{stdout}"
    );
}

#[test]
fn openai_chat_without_key_fails() {
    let env = CliTestEnv::new();
    let args = ["chat"];

    let output = run_parley(&env, &args, "/quit\n");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("--provider echo"), "stderr:\n{stderr}");
}

#[test]
fn status_reports_ephemeral_backend() {
    let env = CliTestEnv::new();
    let args = ["status"];

    let output = run_parley(&env, &args, "");
    assert_success(&args, &output);

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Environment:     dev"));
    assert!(stdout.contains("Key prefix:      dev:"));
    assert!(stdout.contains("Redis URL:       <not set>"));
    assert!(stdout.contains("Backend:         ephemeral"));
}

const UNREACHABLE_REDIS: &str = r#"
[history]
redis_url = "redis://127.0.0.1:1/"
"#;

#[test]
fn unreachable_redis_degrades_with_warning() {
    let env = CliTestEnv::new();
    env.write_config(&format!("env = \"staging\"\n{UNREACHABLE_REDIS}"));
    let args = ["status", "--session", "abc123"];

    let output = run_parley(&env, &args, "");
    assert_success(&args, &output);

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stdout.contains("Key prefix:      staging:"));
    assert!(stdout.contains("Backend:         ephemeral"));
    assert!(stdout.contains("Messages:        0"));
    assert!(stderr.contains("warning:"), "stderr:\n{stderr}");
}

#[test]
fn export_without_durable_backend_explains_setup() {
    let env = CliTestEnv::new();
    let args = ["export", "--session", "abc123", "--format", "json"];

    let output = run_parley(&env, &args, "");
    assert!(!output.status.success());
    assert!(output.stdout.is_empty());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("no durable backend configured"), "stderr:\n{stderr}");
    assert!(stderr.contains("REDIS_URL"), "stderr:\n{stderr}");
}

#[test]
fn export_with_unreachable_redis_fails() {
    let env = CliTestEnv::new();
    env.write_config(UNREACHABLE_REDIS);
    let args = ["export", "--session", "abc123", "--format", "json"];

    let output = run_parley(&env, &args, "");
    assert!(!output.status.success());
    assert!(output.stdout.is_empty());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("durable backend unavailable; cannot export session abc123"),
        "stderr:\n{stderr}"
    );
}

#[test]
fn clear_with_unreachable_redis_fails_without_claiming_success() {
    let env = CliTestEnv::new();
    env.write_config(UNREACHABLE_REDIS);
    let args = ["clear", "--session", "abc123"];

    let output = run_parley(&env, &args, "");
    assert!(!output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(!stdout.contains("Cleared"), "stdout:\n{stdout}");
    assert!(stderr.contains("cannot clear session abc123"), "stderr:\n{stderr}");
}

#[test]
fn history_without_durable_backend_fails() {
    let env = CliTestEnv::new();
    let args = ["history", "--session", "abc123"];

    let output = run_parley(&env, &args, "");
    assert!(!output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(!stdout.contains("No messages"), "stdout:\n{stdout}");
}

#[test]
fn invalid_session_id_is_rejected() {
    let env = CliTestEnv::new();
    let args = ["history", "--session", "bad:id"];

    let output = run_parley(&env, &args, "");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("invalid --session"), "stderr:\n{stderr}");
}

#[test]
fn invalid_config_is_reported() {
    let env = CliTestEnv::new();
    env.write_config("[history]\nmax_turns = 0\n");
    let args = ["status"];

    let output = run_parley(&env, &args, "");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("max_turns"), "stderr:\n{stderr}");
}

#[test]
fn unknown_log_level_is_reported() {
    let env = CliTestEnv::new();
    env.write_config("[logging]\nlevel = \"loud\"\n");
    let args = ["status"];

    let output = run_parley(&env, &args, "");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("logging.level"), "stderr:\n{stderr}");
}
