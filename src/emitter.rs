//! Applies a [`FileAction`] plan to an output directory, atomically.
//!
//! Either every action succeeds and the tree is left exactly as
//! planned, or none of the engine's changes persist: any failure
//! unwinds the per-call undo log in reverse order before the error is
//! returned to the caller.

use crate::error::{EngineError, EngineResult};
use crate::model::{FileAction, Options};
use crate::template::normalize_relative;
use std::path::{Path, PathBuf};

const RESERVED_ROOTS: &[&str] = &["/", "/etc", "/bin", "/usr", "/sbin", "/boot", "/dev", "/proc", "/sys"];

#[derive(Debug, Default)]
pub struct EmitOutcome {
    pub files_created: Vec<String>,
    pub dirs_created: Vec<String>,
}

enum UndoEntry {
    /// A file created by this call; rollback deletes it.
    NewFile(PathBuf),
    /// A file that already existed before this call and was
    /// overwritten; rollback restores its original bytes rather than
    /// deleting it, so a caller's pre-existing tree survives a failed
    /// `ForceOverwrite` generation untouched.
    OverwrittenFile(PathBuf, Vec<u8>),
    Dir(PathBuf),
}

pub struct Emitter;

impl Emitter {
    pub fn apply(plan: &[FileAction], options: &Options) -> EngineResult<EmitOutcome> {
        let output_root = &options.output_path;
        Self::check_safe_root(output_root)?;

        let root_preexisted = output_root.exists();
        if root_preexisted {
            if std::fs::symlink_metadata(output_root)?.file_type().is_symlink() {
                return Err(EngineError::PathTraversal {
                    path: output_root.display().to_string(),
                });
            }
            let non_empty = std::fs::read_dir(output_root)?.next().is_some();
            if non_empty && !options.force_overwrite {
                return Err(EngineError::OutputExists {
                    path: output_root.clone(),
                });
            }
        }

        if options.dry_run {
            return Ok(Self::simulate(plan));
        }

        let mut undo_log: Vec<UndoEntry> = Vec::new();
        let mut outcome = EmitOutcome::default();

        match Self::apply_plan(plan, output_root, &mut undo_log, &mut outcome) {
            Ok(()) => {
                tracing::debug!(
                    files = outcome.files_created.len(),
                    dirs = outcome.dirs_created.len(),
                    "plan: {} files, {} dirs",
                    outcome.files_created.len(),
                    outcome.dirs_created.len()
                );
                Ok(outcome)
            }
            Err(err) => {
                tracing::warn!(output_root = %output_root.display(), error = %err, "rolling back partially applied plan");
                Self::rollback(&undo_log);
                if !root_preexisted {
                    let _ = std::fs::remove_dir_all(output_root);
                }
                Err(EngineError::aborted(err.to_string()))
            }
        }
    }

    fn apply_plan(
        plan: &[FileAction],
        output_root: &Path,
        undo_log: &mut Vec<UndoEntry>,
        outcome: &mut EmitOutcome,
    ) -> EngineResult<()> {
        if !output_root.exists() {
            std::fs::create_dir_all(output_root)?;
        }

        for action in plan {
            let relative = normalize_relative(action.path())?;
            let absolute = output_root.join(&relative);

            match action {
                FileAction::MkDir(_) => {
                    Self::mkdir_tracked(output_root, &relative, undo_log)?;
                    outcome.dirs_created.push(relative);
                }
                FileAction::WriteFile { bytes, mode, .. } => {
                    if let Some(parent) = absolute.parent() {
                        Self::mkdir_tracked(
                            output_root,
                            parent.strip_prefix(output_root).unwrap_or(parent).to_string_lossy().as_ref(),
                            undo_log,
                        )?;
                    }
                    let preexisting = if absolute.exists() {
                        Some(std::fs::read(&absolute)?)
                    } else {
                        None
                    };
                    std::fs::write(&absolute, bytes)?;
                    match preexisting {
                        Some(original) => undo_log.push(UndoEntry::OverwrittenFile(absolute.clone(), original)),
                        None => undo_log.push(UndoEntry::NewFile(absolute.clone())),
                    }
                    Self::set_mode(&absolute, *mode)?;
                    outcome.files_created.push(relative);
                }
                FileAction::Chmod { mode, .. } => {
                    Self::set_mode(&absolute, *mode)?;
                }
            }
        }
        Ok(())
    }

    fn mkdir_tracked(root: &Path, relative: &str, undo_log: &mut Vec<UndoEntry>) -> EngineResult<()> {
        if relative.is_empty() {
            return Ok(());
        }
        let mut current = root.to_path_buf();
        for component in relative.split('/') {
            current.push(component);
            if !current.exists() {
                std::fs::create_dir(&current)?;
                undo_log.push(UndoEntry::Dir(current.clone()));
            }
        }
        Ok(())
    }

    #[cfg(unix)]
    fn set_mode(path: &Path, mode: u32) -> EngineResult<()> {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(mode);
        std::fs::set_permissions(path, perms)?;
        Ok(())
    }

    #[cfg(not(unix))]
    fn set_mode(_path: &Path, _mode: u32) -> EngineResult<()> {
        // Windows has no POSIX executable bit; per the documented
        // open-question resolution this is a silent no-op here (the
        // caller-visible warning is emitted one layer up, in the plan
        // builder, where the blueprint's `executable` flag is known).
        Ok(())
    }

    fn rollback(undo_log: &[UndoEntry]) {
        for entry in undo_log.iter().rev() {
            match entry {
                UndoEntry::NewFile(path) => {
                    let _ = std::fs::remove_file(path);
                }
                UndoEntry::OverwrittenFile(path, original) => {
                    let _ = std::fs::write(path, original);
                }
                UndoEntry::Dir(path) => {
                    let _ = std::fs::remove_dir(path);
                }
            }
        }
    }

    fn simulate(plan: &[FileAction]) -> EmitOutcome {
        let mut outcome = EmitOutcome::default();
        for action in plan {
            match action {
                FileAction::MkDir(path) => outcome.dirs_created.push(path.clone()),
                FileAction::WriteFile { path, .. } => outcome.files_created.push(path.clone()),
                FileAction::Chmod { .. } => {}
            }
        }
        outcome
    }

    fn check_safe_root(output_root: &Path) -> EngineResult<()> {
        let as_str = output_root.to_string_lossy();
        if RESERVED_ROOTS.iter().any(|r| as_str == *r) {
            return Err(EngineError::PathTraversal {
                path: as_str.to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FileAction;

    fn opts(output_path: PathBuf) -> Options {
        Options {
            output_path,
            ..Options::default()
        }
    }

    #[test]
    fn applies_a_simple_plan() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("proj");
        let plan = vec![
            FileAction::MkDir("internal".into()),
            FileAction::WriteFile {
                path: "go.mod".into(),
                bytes: b"module tidy\n".to_vec(),
                mode: 0o644,
            },
            FileAction::WriteFile {
                path: "internal/app.go".into(),
                bytes: b"package internal\n".to_vec(),
                mode: 0o644,
            },
        ];
        let outcome = Emitter::apply(&plan, &opts(target.clone())).unwrap();
        assert_eq!(outcome.files_created.len(), 2);
        assert!(target.join("go.mod").exists());
        assert!(target.join("internal/app.go").exists());
    }

    #[test]
    fn rolls_back_on_failure_and_removes_created_root() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("proj");
        // A WriteFile whose path resolves outside the root trips the
        // defense-in-depth recheck and aborts mid-plan.
        let plan = vec![
            FileAction::WriteFile {
                path: "go.mod".into(),
                bytes: b"module tidy\n".to_vec(),
                mode: 0o644,
            },
            FileAction::WriteFile {
                path: "../../etc/bad".into(),
                bytes: b"x".to_vec(),
                mode: 0o644,
            },
        ];
        let err = Emitter::apply(&plan, &opts(target.clone())).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::GenerationAborted);
        assert!(!target.exists());
    }

    #[test]
    fn rejects_non_empty_existing_root_without_force() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("proj");
        std::fs::create_dir(&target).unwrap();
        std::fs::write(target.join("existing.txt"), b"x").unwrap();

        let plan = vec![FileAction::WriteFile {
            path: "go.mod".into(),
            bytes: b"module tidy\n".to_vec(),
            mode: 0o644,
        }];
        let err = Emitter::apply(&plan, &opts(target)).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::OutputExists);
    }

    #[test]
    fn rollback_restores_preexisting_file_instead_of_deleting_it() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("proj");
        std::fs::create_dir(&target).unwrap();
        std::fs::write(target.join("go.mod"), b"module original\n").unwrap();

        let plan = vec![
            FileAction::WriteFile {
                path: "go.mod".into(),
                bytes: b"module tidy\n".to_vec(),
                mode: 0o644,
            },
            FileAction::WriteFile {
                path: "../../etc/bad".into(),
                bytes: b"x".to_vec(),
                mode: 0o644,
            },
        ];
        let mut options = opts(target.clone());
        options.force_overwrite = true;
        let err = Emitter::apply(&plan, &options).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::GenerationAborted);
        assert!(target.exists(), "pre-existing root must survive rollback");
        let restored = std::fs::read(target.join("go.mod")).unwrap();
        assert_eq!(restored, b"module original\n");
    }

    #[test]
    fn dry_run_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("proj");
        let plan = vec![FileAction::WriteFile {
            path: "go.mod".into(),
            bytes: b"module tidy\n".to_vec(),
            mode: 0o644,
        }];
        let mut options = opts(target.clone());
        options.dry_run = true;
        let outcome = Emitter::apply(&plan, &options).unwrap();
        assert_eq!(outcome.files_created, vec!["go.mod".to_string()]);
        assert!(!target.exists());
    }
}
