use std::path::{Path, PathBuf};

/// Data directory and agent template directory for one invocation.
#[derive(Debug, Clone)]
pub struct Dirs {
    pub home: PathBuf,
    pub agents: PathBuf,
}

/// Resolve the data directory.
///
/// Priority:
/// 1. `--home` flag / `YABP_HOME` env var (passed in as `explicit`)
/// 2. `~/.yabp`
/// 3. `./.yabp` in the current directory
pub fn resolve_home(explicit: Option<&Path>) -> PathBuf {
    if let Some(p) = explicit {
        return p.to_path_buf();
    }
    match home::home_dir() {
        Some(h) => h.join(".yabp"),
        None => std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(".yabp"),
    }
}

/// Agent templates live under `<home>/agents` unless `--agents` /
/// `YABP_AGENTS_DIR` says otherwise.
pub fn resolve_dirs(home: Option<&Path>, agents: Option<&Path>) -> Dirs {
    let home = resolve_home(home);
    let agents = agents
        .map(Path::to_path_buf)
        .unwrap_or_else(|| home.join("agents"));
    Dirs { home, agents }
}
