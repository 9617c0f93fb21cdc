//! Fixture helpers shared by unit tests.

use std::path::Path;

/// Write `<agents>/<id>/metadata.yaml` plus each `(relative path, content)`
/// file under the agent directory.
pub fn write_agent(agents_dir: &Path, id: &str, metadata: &str, files: &[(&str, &str)]) {
    let dir = agents_dir.join(id);
    std::fs::create_dir_all(dir.join("prompts")).unwrap();
    std::fs::write(dir.join("metadata.yaml"), metadata).unwrap();
    for (rel, content) in files {
        let path = dir.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }
}
