//! The command runner.
//!
//! A [`Runner`] owns the per-client invocation state: output format, debug
//! and color switches, working directory and extra environment. Every change
//! applies to the next [`Runner::run`] call and nothing is shared between
//! runners, so each client gets its own scope.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use rosacli_core::{CapturedOutput, CommandArgs, OutputFormat, is_flag_token};
use tracing::{debug, info, warn};

use crate::config::RunnerConfig;
use crate::error::{ExecError, Result};
use crate::executor::{CommandExecutor, Completion, Invocation, ProcessExecutor};

/// Marker the CLI prints when it could not refresh its token. Usually
/// transient, so the runner retries.
pub const AUTH_TOKEN_FAILURE: &str = "Not able to get authentication token";

/// Arguments that mean the output may contain credentials.
const SENSITIVE_KEYWORDS: &[&str] = &["token", "access_token", "refresh_token"];

const OUTPUT_FLAGS: &[&str] = &["-o", "--output"];

/// Runs the CLI binary with persistent flags, directory and environment.
///
/// # Examples
///
/// ```
/// use rosacli_exec::{Runner, RunnerConfig};
///
/// let mut runner = Runner::new(RunnerConfig::default());
/// runner.json_format().set_debug(true);
/// assert_eq!(
///     runner.command_line(["list", "machinepool", "-c", "c-1"]),
///     "rosa list machinepool --output json --debug -c c-1"
/// );
/// ```
pub struct Runner {
    config: RunnerConfig,
    dir: PathBuf,
    env: Vec<(String, String)>,
    executor: Arc<dyn CommandExecutor>,
}

impl std::fmt::Debug for Runner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runner")
            .field("config", &self.config)
            .field("dir", &self.dir)
            .field("env", &self.env)
            .finish_non_exhaustive()
    }
}

impl Runner {
    /// Creates a runner that spawns real processes.
    pub fn new(config: RunnerConfig) -> Self {
        Self::with_executor(config, Arc::new(ProcessExecutor))
    }

    pub fn with_executor(config: RunnerConfig, executor: Arc<dyn CommandExecutor>) -> Self {
        let dir = config
            .dir
            .clone()
            .or_else(|| std::env::current_dir().ok())
            .unwrap_or_else(|| PathBuf::from("."));
        let env = config
            .env
            .iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        Self {
            config,
            dir,
            env,
            executor,
        }
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    pub fn set_format(&mut self, format: OutputFormat) -> &mut Self {
        self.config.format = format;
        self
    }

    pub fn json_format(&mut self) -> &mut Self {
        self.set_format(OutputFormat::Json)
    }

    pub fn yaml_format(&mut self) -> &mut Self {
        self.set_format(OutputFormat::Yaml)
    }

    /// Back to plain text output.
    pub fn unset_format(&mut self) -> &mut Self {
        self.set_format(OutputFormat::Text)
    }

    pub fn format(&self) -> OutputFormat {
        self.config.format
    }

    pub fn set_debug(&mut self, debug: bool) -> &mut Self {
        self.config.debug = debug;
        self
    }

    pub fn set_color(&mut self, color: impl Into<String>) -> &mut Self {
        self.config.color = color.into();
        self
    }

    pub fn set_dir(&mut self, dir: impl Into<PathBuf>) -> &mut Self {
        self.dir = dir.into();
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Adds a variable to the child environment. The parent's environment is
    /// never touched; a later entry for the same key wins.
    pub fn add_env_var(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn env_vars(&self) -> &[(String, String)] {
        &self.env
    }

    /// Global flags derived from the current state.
    pub fn persistent_flags(&self) -> Vec<String> {
        let mut flags = Vec::new();
        if let Some(format) = self.config.format.flag_value() {
            flags.extend(["--output".to_string(), format.to_string()]);
        }
        if self.config.debug {
            flags.push("--debug".to_string());
        }
        if self.config.color != "auto" {
            flags.extend(["--color".to_string(), self.config.color.clone()]);
        }
        flags
    }

    /// Final argument vector for `args`.
    ///
    /// Persistent flags go after the leading subcommand words and before the
    /// caller's own flags. A persistent flag the caller already passed is
    /// left out so the caller's value is the only one.
    pub fn build_args<I, S>(&self, args: I) -> Vec<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let args: Vec<String> = args.into_iter().map(|arg| arg.as_ref().to_string()).collect();
        let split = args
            .iter()
            .position(|arg| is_flag_token(arg))
            .unwrap_or(args.len());

        let mut argv: Vec<String> = args[..split].to_vec();
        let persistent = self.persistent_flags();
        let mut index = 0;
        while index < persistent.len() {
            let flag = &persistent[index];
            let takes_value = flag != "--debug";
            let width = if takes_value { 2 } else { 1 };
            if !caller_has_flag(&args, flag) {
                argv.extend(persistent[index..index + width].iter().cloned());
            }
            index += width;
        }
        argv.extend(args[split..].iter().cloned());
        argv
    }

    /// The full command line `run(args)` would execute.
    pub fn command_line<I, S>(&self, args: I) -> String
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Invocation::new(&self.config.binary, self.build_args(args)).command_line()
    }

    /// Runs the CLI with `args` plus the persistent flags.
    ///
    /// The output is returned on success and carried inside the error on
    /// failure. Output that reports a transient authentication failure is
    /// retried per the configured [`AuthRetry`](crate::AuthRetry).
    pub fn run<I, S>(&self, args: I) -> Result<CapturedOutput>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let argv = self.build_args(args);
        let format = effective_format(&argv, self.config.format);
        let invocation = self.invocation(self.config.binary.clone(), argv);
        let sensitive = is_sensitive(&invocation.args);
        let retry = &self.config.auth_retry;

        let mut attempt = 0;
        loop {
            info!(command = %invocation.command_line(), attempt, "Running command");
            let completion = self.executor.execute(&invocation)?;
            log_output(&completion, sensitive);

            if contains(&completion.output, AUTH_TOKEN_FAILURE) {
                if attempt < retry.attempts {
                    attempt += 1;
                    warn!(attempt, delay_ms = retry.delay_ms, "Not able to get authentication token, retrying");
                    std::thread::sleep(retry.delay());
                    continue;
                }
                return Err(ExecError::AuthRetryExhausted {
                    attempts: attempt + 1,
                    output: CapturedOutput::new(completion.output, format),
                });
            }
            return self.finish(completion, format);
        }
    }

    /// Replays a full command line (program first) without persistent flags
    /// or authentication retries. Directory and environment still apply.
    pub fn run_command(&self, command: &CommandArgs) -> Result<CapturedOutput> {
        let mut argv = command.argv();
        if argv.is_empty() {
            return Err(ExecError::NotFound("empty command line".to_string()));
        }
        let program = argv.remove(0);
        let format = effective_format(&argv, OutputFormat::Text);
        let invocation = self.invocation(program, argv);
        info!(command = %invocation.command_line(), "Running command line");
        let completion = self.executor.execute(&invocation)?;
        log_output(&completion, is_sensitive(&invocation.args));
        self.finish(completion, format)
    }

    /// Runs full command lines as a pipeline, each stage's stdout feeding the
    /// next stage's stdin. Like [`Runner::run_command`], persistent flags and
    /// authentication retries do not apply.
    ///
    /// The output holds every stage's stderr plus the last stage's stdout. A
    /// failing stage fails the whole pipeline.
    pub fn run_pipeline(&self, commands: &[CommandArgs]) -> Result<CapturedOutput> {
        if commands.is_empty() {
            return Err(ExecError::NotFound("empty command pipeline".to_string()));
        }
        let mut stages = Vec::with_capacity(commands.len());
        for command in commands {
            let mut argv = command.argv();
            if argv.is_empty() {
                return Err(ExecError::NotFound("empty command line in pipeline".to_string()));
            }
            let program = argv.remove(0);
            stages.push(self.invocation(program, argv));
        }
        let format = stages
            .last()
            .map_or(OutputFormat::Text, |stage| effective_format(&stage.args, OutputFormat::Text));
        let line = stages
            .iter()
            .map(Invocation::command_line)
            .collect::<Vec<_>>()
            .join(" | ");
        info!(command = %line, stages = stages.len(), "Running pipeline");
        let completion = self.executor.execute_pipeline(&stages)?;
        log_output(&completion, stages.iter().any(|stage| is_sensitive(&stage.args)));
        self.finish(completion, format)
    }

    fn invocation(&self, program: String, args: Vec<String>) -> Invocation {
        Invocation {
            program,
            args,
            dir: Some(self.dir.clone()),
            env: self.env.clone(),
            timeout: self.config.timeout(),
        }
    }

    fn finish(&self, completion: Completion, format: OutputFormat) -> Result<CapturedOutput> {
        let success = completion.success();
        let Completion {
            output,
            exit_code,
            timed_out,
        } = completion;
        let output = CapturedOutput::new(output, format);
        if timed_out {
            return Err(ExecError::Timeout {
                secs: self.config.timeout_secs.unwrap_or_default(),
                output,
            });
        }
        if !success {
            debug!(?exit_code, "Command failed");
            return Err(ExecError::Exit {
                code: exit_code,
                output,
            });
        }
        Ok(output)
    }
}

fn flag_name(arg: &str) -> &str {
    arg.split_once('=').map_or(arg, |(name, _)| name)
}

fn caller_has_flag(args: &[String], flag: &str) -> bool {
    let is_output = OUTPUT_FLAGS.contains(&flag);
    args.iter().any(|arg| {
        let name = flag_name(arg);
        name == flag || (is_output && OUTPUT_FLAGS.contains(&name))
    })
}

/// Format the CLI will actually print: an explicit `-o/--output` wins.
fn effective_format(argv: &[String], default: OutputFormat) -> OutputFormat {
    for (index, arg) in argv.iter().enumerate() {
        let value = match arg.split_once('=') {
            Some((name, value)) if OUTPUT_FLAGS.contains(&name) => Some(value),
            None if OUTPUT_FLAGS.contains(&arg.as_str()) => {
                argv.get(index + 1).map(String::as_str)
            }
            _ => None,
        };
        if let Some(value) = value {
            return value.parse().unwrap_or(OutputFormat::Text);
        }
    }
    default
}

fn is_sensitive(args: &[String]) -> bool {
    args.iter().any(|arg| {
        let name = flag_name(arg).trim_start_matches('-');
        SENSITIVE_KEYWORDS.contains(&name)
    })
}

fn contains(haystack: &[u8], needle: &str) -> bool {
    haystack
        .windows(needle.len())
        .any(|window| window == needle.as_bytes())
}

fn log_output(completion: &Completion, sensitive: bool) {
    if sensitive {
        warn!("Command line mentions a token; not logging its output");
    } else {
        debug!(
            exit_code = ?completion.exit_code,
            output = %String::from_utf8_lossy(&completion.output),
            "Combined stdout and stderr"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Scripted {
        replies: Mutex<VecDeque<Completion>>,
        seen: Mutex<Vec<Invocation>>,
    }

    impl Scripted {
        fn replying(replies: Vec<Completion>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into()),
                seen: Mutex::default(),
            })
        }

        fn seen(&self) -> Vec<Invocation> {
            self.seen.lock().unwrap().clone()
        }
    }

    impl CommandExecutor for Scripted {
        fn execute(&self, invocation: &Invocation) -> Result<Completion> {
            self.seen.lock().unwrap().push(invocation.clone());
            Ok(self
                .replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Completion::exited(0, "")))
        }
    }

    fn quick_config() -> RunnerConfig {
        let mut config = RunnerConfig::default();
        config.dir = Some(PathBuf::from("/work"));
        config.auth_retry.delay_ms = 0;
        config
    }

    #[test]
    fn test_persistent_flags() {
        let mut runner = Runner::new(quick_config());
        assert!(runner.persistent_flags().is_empty());
        runner.yaml_format().set_debug(true).set_color("never");
        assert_eq!(
            runner.persistent_flags(),
            ["--output", "yaml", "--debug", "--color", "never"]
        );
        runner.unset_format().set_debug(false).set_color("auto");
        assert!(runner.persistent_flags().is_empty());
    }

    #[test]
    fn test_build_args_places_persistent_flags_after_words() {
        let mut runner = Runner::new(quick_config());
        runner.json_format();
        assert_eq!(
            runner.build_args(["describe", "cluster", "-c", "demo"]),
            ["describe", "cluster", "--output", "json", "-c", "demo"]
        );
        assert_eq!(runner.build_args(["whoami"]), ["whoami", "--output", "json"]);
    }

    #[test]
    fn test_build_args_skips_flags_the_caller_passed() {
        let mut runner = Runner::new(quick_config());
        runner.json_format().set_debug(true);
        assert_eq!(
            runner.build_args(["list", "clusters", "-o", "yaml", "--debug"]),
            ["list", "clusters", "-o", "yaml", "--debug"]
        );
        assert_eq!(
            runner.build_args(["list", "clusters", "--output=yaml"]),
            ["list", "clusters", "--debug", "--output=yaml"]
        );
    }

    #[test]
    fn test_run_tags_output_with_format() {
        let executor = Scripted::replying(vec![Completion::exited(0, r#"{"id":"x"}"#)]);
        let mut runner = Runner::with_executor(quick_config(), executor.clone());
        runner.json_format().add_env_var("OCM_CONFIG", "/tmp/ocm.json");

        let output = runner.run(["describe", "cluster", "-c", "x"]).unwrap();
        assert_eq!(output.format(), OutputFormat::Json);

        let seen = executor.seen();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].program, "rosa");
        assert_eq!(seen[0].dir.as_deref(), Some(Path::new("/work")));
        assert_eq!(
            seen[0].env,
            [("OCM_CONFIG".to_string(), "/tmp/ocm.json".to_string())]
        );
    }

    #[test]
    fn test_explicit_output_flag_decides_format() {
        let executor = Scripted::replying(vec![Completion::exited(0, "id: x\n")]);
        let runner = Runner::with_executor(quick_config(), executor);
        let output = runner.run(["describe", "cluster", "-o", "yaml"]).unwrap();
        assert_eq!(output.format(), OutputFormat::Yaml);
    }

    #[test]
    fn test_state_changes_apply_to_next_run() {
        let executor = Scripted::default();
        let executor = Arc::new(executor);
        let mut runner = Runner::with_executor(quick_config(), executor.clone());
        runner.run(["version"]).unwrap();
        let saved = runner.dir().to_path_buf();
        runner.set_dir("/elsewhere").yaml_format();
        runner.run(["version"]).unwrap();
        runner.set_dir(saved).unset_format();
        runner.run(["version"]).unwrap();

        let seen = executor.seen();
        assert_eq!(seen[0].args, ["version"]);
        assert_eq!(seen[1].args, ["version", "--output", "yaml"]);
        assert_eq!(seen[1].dir.as_deref(), Some(Path::new("/elsewhere")));
        assert_eq!(seen[2].dir.as_deref(), Some(Path::new("/work")));
        assert_eq!(seen[2].args, ["version"]);
    }

    #[test]
    fn test_failure_keeps_output() {
        let executor = Scripted::replying(vec![Completion::exited(
            1,
            "ERR: There is no cluster with identifier or name 'nope'\n",
        )]);
        let runner = Runner::with_executor(quick_config(), executor);
        let err = runner.run(["describe", "cluster", "-c", "nope"]).unwrap_err();
        assert_eq!(err.exit_code(), Some(1));
        assert!(err
            .output()
            .is_some_and(|output| output.contains("There is no cluster")));
    }

    #[test]
    fn test_timeout_is_reported() {
        let executor = Scripted::replying(vec![Completion {
            output: b"partial".to_vec(),
            exit_code: None,
            timed_out: true,
        }]);
        let mut config = quick_config();
        config.timeout_secs = Some(3);
        let runner = Runner::with_executor(config, executor);
        let err = runner.run(["create", "cluster"]).unwrap_err();
        assert!(matches!(err, ExecError::Timeout { secs: 3, .. }));
        assert_eq!(err.output().map(CapturedOutput::to_text), Some("partial".to_string()));
    }

    #[test]
    fn test_auth_failure_is_retried() {
        let executor = Scripted::replying(vec![
            Completion::exited(1, "ERR: Not able to get authentication token\n"),
            Completion::exited(0, "ok\n"),
        ]);
        let runner = Runner::with_executor(quick_config(), executor.clone());
        let output = runner.run(["whoami"]).unwrap();
        assert_eq!(output.to_text(), "ok\n");
        assert_eq!(executor.seen().len(), 2);
    }

    #[test]
    fn test_auth_retry_exhausted() {
        let replies = (0..10)
            .map(|_| Completion::exited(1, "ERR: Not able to get authentication token\n"))
            .collect();
        let executor = Scripted::replying(replies);
        let mut config = quick_config();
        config.auth_retry.attempts = 2;
        let runner = Runner::with_executor(config, executor.clone());
        let err = runner.run(["whoami"]).unwrap_err();
        assert!(matches!(err, ExecError::AuthRetryExhausted { attempts: 3, .. }));
        assert_eq!(executor.seen().len(), 3);
    }

    #[test]
    fn test_run_command_replays_without_persistent_flags() {
        let executor = Scripted::default();
        let executor = Arc::new(executor);
        let mut runner = Runner::with_executor(quick_config(), executor.clone());
        runner.json_format();
        let command = CommandArgs::parse("rosa create cluster --cluster-name demo --dry-run");
        let output = runner.run_command(&command).unwrap();
        assert_eq!(output.format(), OutputFormat::Text);

        let seen = executor.seen();
        assert_eq!(seen[0].program, "rosa");
        assert_eq!(seen[0].args, ["create", "cluster", "--cluster-name", "demo", "--dry-run"]);
    }

    #[test]
    fn test_run_command_rejects_empty_line() {
        let runner = Runner::with_executor(quick_config(), Arc::new(Scripted::default()));
        assert!(matches!(
            runner.run_command(&CommandArgs::new()),
            Err(ExecError::NotFound(_))
        ));
    }

    #[test]
    fn test_sensitive_arguments() {
        assert!(is_sensitive(&["login".into(), "--token".into(), "abc".into()]));
        assert!(is_sensitive(&["login".into(), "--token=abc".into()]));
        assert!(is_sensitive(&["get".into(), "access_token".into()]));
        assert!(!is_sensitive(&["list".into(), "clusters".into()]));
    }

    #[test]
    fn test_effective_format() {
        let args = |s: &str| s.split(' ').map(String::from).collect::<Vec<_>>();
        assert_eq!(effective_format(&args("list -o json"), OutputFormat::Text), OutputFormat::Json);
        assert_eq!(effective_format(&args("list --output=yaml"), OutputFormat::Json), OutputFormat::Yaml);
        assert_eq!(effective_format(&args("list"), OutputFormat::Yaml), OutputFormat::Yaml);
        assert_eq!(effective_format(&args("list -o"), OutputFormat::Json), OutputFormat::Json);
    }
}
