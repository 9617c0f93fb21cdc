use std::path::{Path, PathBuf};

use tokio::process::Command;

use crate::process::AgentProcess;
use crate::{Result, RunOptions, RunOutput, RunnerError};

/// Agent CLI looked up when no executable is configured.
pub const DEFAULT_COMMAND: &str = "cursor-agent";

// ─── Executable resolution ────────────────────────────────────────────────

/// Pick the executable to spawn: the explicit one if given, else
/// [`DEFAULT_COMMAND`] on `PATH`, else `~/.local/bin/cursor-agent`.
pub fn resolve_executable(explicit: Option<&str>) -> Result<PathBuf> {
    resolve_with(
        explicit,
        |name| which::which(name).ok(),
        home::home_dir(),
    )
}

fn resolve_with(
    explicit: Option<&str>,
    lookup: impl Fn(&str) -> Option<PathBuf>,
    home: Option<PathBuf>,
) -> Result<PathBuf> {
    if let Some(cmd) = explicit.map(str::trim).filter(|c| !c.is_empty()) {
        return Ok(lookup(cmd).unwrap_or_else(|| PathBuf::from(cmd)));
    }
    if let Some(found) = lookup(DEFAULT_COMMAND) {
        return Ok(found);
    }
    if let Some(home) = home {
        let local = home.join(".local").join("bin").join(DEFAULT_COMMAND);
        if local.is_file() {
            return Ok(local);
        }
    }
    Err(RunnerError::ExecutableNotFound(DEFAULT_COMMAND.to_string()))
}

// ─── Command builder ──────────────────────────────────────────────────────

/// `<exe> -p -f <instruction>` in `opts.cwd`, with `opts.env` added.
pub fn build_command(exe: &Path, opts: &RunOptions) -> Command {
    let mut cmd = Command::new(exe);
    cmd.arg("-p").arg("-f").arg(&opts.instruction);
    if let Some(cwd) = &opts.cwd {
        cmd.current_dir(cwd);
    }
    for (k, v) in &opts.env {
        cmd.env(k, v);
    }
    cmd
}

// ─── Public API ───────────────────────────────────────────────────────────

/// Run the agent CLI to completion and return everything it printed.
///
/// A non-zero exit is not an error; only failing to start or read the
/// process is.
pub async fn run(opts: RunOptions) -> Result<RunOutput> {
    let exe = resolve_executable(opts.executable.as_deref())?;
    tracing::info!(
        exe = %exe.display(),
        cwd = ?opts.cwd,
        credential = opts.env.iter().any(|(k, _)| k.ends_with("_API_KEY")),
        "spawning agent"
    );
    let out = AgentProcess::from_command(build_command(&exe, &opts))?
        .wait()
        .await?;
    tracing::info!(exit_code = ?out.exit_code, "agent exited");
    Ok(out)
}

// ─── Tests ────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn explicit_command_wins() {
        let exe = resolve_with(Some("my-agent"), |_| None, None).unwrap();
        assert_eq!(exe, PathBuf::from("my-agent"));
        let exe = resolve_with(
            Some("my-agent"),
            |n| Some(PathBuf::from(format!("/usr/bin/{n}"))),
            None,
        )
        .unwrap();
        assert_eq!(exe, PathBuf::from("/usr/bin/my-agent"));
    }

    #[test]
    fn falls_back_to_path_then_home() {
        let exe = resolve_with(None, |n| Some(PathBuf::from(format!("/opt/{n}"))), None).unwrap();
        assert_eq!(exe, PathBuf::from("/opt/cursor-agent"));

        let home = TempDir::new().unwrap();
        let local = home.path().join(".local/bin");
        std::fs::create_dir_all(&local).unwrap();
        std::fs::write(local.join("cursor-agent"), "").unwrap();
        let exe = resolve_with(None, |_| None, Some(home.path().to_path_buf())).unwrap();
        assert_eq!(exe, local.join("cursor-agent"));
    }

    #[test]
    fn nothing_found_is_an_error() {
        let home = TempDir::new().unwrap();
        let err = resolve_with(None, |_| None, Some(home.path().to_path_buf()));
        assert!(matches!(err, Err(RunnerError::ExecutableNotFound(_))));
        let err = resolve_with(Some("  "), |_| None, None);
        assert!(err.is_err());
    }

    #[tokio::test]
    async fn passes_instruction_cwd_and_env() {
        let dir = TempDir::new().unwrap();
        let opts = RunOptions {
            executable: None,
            instruction: "Please execute the instructions defined in the file: x.md".into(),
            cwd: Some(dir.path().to_path_buf()),
            env: vec![("CURSOR_API_KEY".into(), "k-123".into())],
        };
        let mut cmd = Command::new("sh");
        cmd.arg("-c")
            .arg(r#"printf '%s|%s|%s\n' "$1" "$2" "$3"; printf '%s\n' "$CURSOR_API_KEY"; pwd"#)
            .arg("sh");
        // Echo back whatever `build_command` wired up, via `sh -c`.
        let built = build_command(Path::new("ignored"), &opts);
        let std_cmd = built.as_std();
        for arg in std_cmd.get_args() {
            cmd.arg(arg);
        }
        for (k, v) in std_cmd.get_envs() {
            if let Some(v) = v {
                cmd.env(k, v);
            }
        }
        if let Some(cwd) = std_cmd.get_current_dir() {
            cmd.current_dir(cwd);
        }

        let out = AgentProcess::from_command(cmd).unwrap().wait().await.unwrap();
        let lines: Vec<&str> = out.stdout.lines().collect();
        assert_eq!(
            lines[0],
            "-p|-f|Please execute the instructions defined in the file: x.md"
        );
        assert_eq!(lines[1], "k-123");
        let cwd = std::fs::canonicalize(dir.path()).unwrap();
        assert_eq!(std::fs::canonicalize(lines[2]).unwrap(), cwd);
    }
}
