// src/tasks/outputs.rs

//! Declared output ownership.
//!
//! Tasks in the same stage run concurrently against one output tree, so
//! the paths they write or delete must not overlap. The scheduler catches
//! actual write collisions after the fact; this module rejects
//! configurations whose declarations already overlap, before anything runs.

use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::config::model::{ConfigFile, StepConfig, TaskAction, TaskConfig};
use crate::dag::TaskGraph;
use crate::engine::TaskName;
use crate::errors::GraphError;

/// What a task declares it writes or deletes, relative to the output root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputClaim {
    /// The whole output root (`clean = []`).
    Root,
    /// Files at any depth under `dir`; `extensions: None` means any extension.
    Files {
        dir: PathBuf,
        extensions: Option<BTreeSet<String>>,
    },
    /// A single file.
    File(PathBuf),
}

impl OutputClaim {
    pub fn overlaps(&self, other: &OutputClaim) -> bool {
        match (self, other) {
            (OutputClaim::Root, _) | (_, OutputClaim::Root) => true,
            (OutputClaim::File(a), OutputClaim::File(b)) => a == b,
            (OutputClaim::File(file), OutputClaim::Files { dir, extensions })
            | (OutputClaim::Files { dir, extensions }, OutputClaim::File(file)) => {
                file.starts_with(dir) && extension_allowed(file, extensions.as_ref())
            }
            (
                OutputClaim::Files {
                    dir: a,
                    extensions: ea,
                },
                OutputClaim::Files {
                    dir: b,
                    extensions: eb,
                },
            ) => {
                (a.starts_with(b) || b.starts_with(a))
                    && match (ea, eb) {
                        (Some(x), Some(y)) => !x.is_disjoint(y),
                        _ => true,
                    }
            }
        }
    }
}

fn extension_allowed(file: &Path, extensions: Option<&BTreeSet<String>>) -> bool {
    match extensions {
        None => true,
        Some(set) => file
            .extension()
            .is_some_and(|e| set.contains(e.to_string_lossy().as_ref())),
    }
}

/// Extensions a glob can match, from its last segment: `*.html` gives
/// `{html}`, `*.{png,jpg}` gives `{png, jpg}`, `**/*` gives `None` (any).
fn pattern_extensions(pattern: &str) -> Option<BTreeSet<String>> {
    let segment = pattern.rsplit('/').next().unwrap_or(pattern);

    if let Some(start) = segment.find(".{") {
        let rest = &segment[start + 2..];
        let list = rest.strip_suffix('}')?;
        if list.contains(['*', '?', '[', '{', '}']) {
            return None;
        }
        return Some(list.split(',').map(|e| e.trim().to_string()).collect());
    }

    let ext = &segment[segment.rfind('.')? + 1..];
    if ext.is_empty() || ext.contains(['*', '?', '[', '{', '}']) {
        return None;
    }
    Some(BTreeSet::from([ext.to_string()]))
}

fn has_glob_meta(segment: &str) -> bool {
    segment.contains(['*', '?', '[', '{'])
}

/// Claim of one clean glob: its literal leading directories, narrowed to
/// the extensions the glob can match; a glob without wildcards names a file.
fn clean_claim(pattern: &str) -> OutputClaim {
    let segments: Vec<&str> = pattern.split('/').filter(|s| !s.is_empty()).collect();
    let literal = segments.iter().take_while(|s| !has_glob_meta(s)).count();
    if literal == segments.len() {
        return OutputClaim::File(segments.iter().collect());
    }
    OutputClaim::Files {
        dir: segments[..literal].iter().collect(),
        extensions: pattern_extensions(pattern),
    }
}

/// Output claims of a configured task; empty for tasks that touch nothing
/// under the output root (check-only pipelines and command tasks).
pub fn claims_of(task: &TaskConfig) -> Vec<OutputClaim> {
    match task.action() {
        Some(TaskAction::Clean(globs)) if globs.is_empty() => vec![OutputClaim::Root],
        Some(TaskAction::Clean(globs)) => globs.iter().map(|g| clean_claim(g)).collect(),
        Some(TaskAction::Pipeline(src)) => pipeline_claim(task, src).into_iter().collect(),
        Some(TaskAction::Command(_)) | None => Vec::new(),
    }
}

fn pipeline_claim(task: &TaskConfig, src: &[String]) -> Option<OutputClaim> {
    let dir = PathBuf::from(task.dest.as_ref()?);

    let mut extensions: Option<BTreeSet<String>> = Some(BTreeSet::new());
    for pattern in src {
        match (extensions.as_mut(), pattern_extensions(pattern)) {
            (Some(acc), Some(exts)) => acc.extend(exts),
            _ => extensions = None,
        }
    }

    let mut single: Option<PathBuf> = None;
    for step in &task.steps {
        match step {
            StepConfig::Concat { output, .. } => single = Some(PathBuf::from(output)),
            StepConfig::Rename { extension } => match single.as_mut() {
                Some(file) => {
                    file.set_extension(extension);
                }
                None => extensions = Some(BTreeSet::from([extension.clone()])),
            },
            StepConfig::Command { .. } | StepConfig::Check { .. } | StepConfig::Copy => {}
        }
    }

    Some(match single {
        Some(file) => OutputClaim::File(dir.join(file)),
        None => OutputClaim::Files { dir, extensions },
    })
}

/// Two tasks that may run at the same time with overlapping outputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputOverlap {
    pub phase: usize,
    pub first: TaskName,
    pub second: TaskName,
}

impl fmt::Display for OutputOverlap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "tasks '{}' and '{}' run concurrently in build phase {} and declare overlapping outputs",
            self.first, self.second, self.phase
        )
    }
}

/// Check every stage of every build phase for overlapping output claims.
pub fn find_overlaps(cfg: &ConfigFile, graph: &TaskGraph) -> Result<Vec<OutputOverlap>, GraphError> {
    let mut overlaps = Vec::new();

    for (phase_idx, phase) in cfg.build.phases.iter().enumerate() {
        let plan = graph.resolve_closure(phase)?;
        for stage in plan.stages() {
            let claims: Vec<(&TaskName, Vec<OutputClaim>)> = stage
                .iter()
                .filter_map(|name| Some((name, claims_of(cfg.task.get(name)?))))
                .collect();

            for (i, (first, a)) in claims.iter().enumerate() {
                for (second, b) in &claims[i + 1..] {
                    if a.iter().any(|x| b.iter().any(|y| x.overlaps(y))) {
                        overlaps.push(OutputOverlap {
                            phase: phase_idx,
                            first: (*first).clone(),
                            second: (*second).clone(),
                        });
                    }
                }
            }
        }
    }

    Ok(overlaps)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exts(items: &[&str]) -> Option<BTreeSet<String>> {
        Some(items.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn extensions_come_from_the_last_segment() {
        assert_eq!(pattern_extensions("**/*.html"), exts(&["html"]));
        assert_eq!(pattern_extensions("images/*.{png,jpg}"), exts(&["jpg", "png"]));
        assert_eq!(pattern_extensions("styles/main.less"), exts(&["less"]));
        assert_eq!(pattern_extensions("**/*"), None);
        assert_eq!(pattern_extensions("*.*"), None);
    }

    #[test]
    fn rename_and_concat_shape_the_claim() {
        let styles = TaskConfig {
            src: Some(vec!["styles/main.less".into()]),
            dest: Some("styles".into()),
            steps: vec![StepConfig::Rename {
                extension: "css".into(),
            }],
            ..TaskConfig::default()
        };
        assert_eq!(
            claims_of(&styles),
            vec![OutputClaim::Files {
                dir: "styles".into(),
                extensions: exts(&["css"])
            }]
        );

        let scripts = TaskConfig {
            src: Some(vec!["scripts/**/*.js".into()]),
            dest: Some("scripts".into()),
            steps: vec![StepConfig::Concat {
                output: "bundle.js".into(),
                separator: "\n".into(),
            }],
            ..TaskConfig::default()
        };
        assert_eq!(claims_of(&scripts), vec![OutputClaim::File("scripts/bundle.js".into())]);

        let lint = TaskConfig {
            src: Some(vec!["**/*.js".into()]),
            ..TaskConfig::default()
        };
        assert!(claims_of(&lint).is_empty());
    }

    #[test]
    fn clean_globs_claim_what_they_delete() {
        let wipe = TaskConfig {
            clean: Some(Vec::new()),
            ..TaskConfig::default()
        };
        assert_eq!(claims_of(&wipe), vec![OutputClaim::Root]);

        let scoped = TaskConfig {
            clean: Some(vec!["**/*.js".into(), "docs/**/*.html".into(), "robots.txt".into()]),
            ..TaskConfig::default()
        };
        assert_eq!(
            claims_of(&scoped),
            vec![
                OutputClaim::Files {
                    dir: "".into(),
                    extensions: exts(&["js"])
                },
                OutputClaim::Files {
                    dir: "docs".into(),
                    extensions: exts(&["html"])
                },
                OutputClaim::File("robots.txt".into()),
            ]
        );
    }

    #[test]
    fn overlap_rules() {
        let html = OutputClaim::Files {
            dir: "".into(),
            extensions: exts(&["html"]),
        };
        let any = OutputClaim::Files {
            dir: "assets".into(),
            extensions: None,
        };
        let bundle = OutputClaim::File("scripts/bundle.js".into());
        let css = OutputClaim::Files {
            dir: "styles".into(),
            extensions: exts(&["css"]),
        };

        assert!(!html.overlaps(&bundle));
        assert!(!html.overlaps(&css));
        assert!(html.overlaps(&any));
        assert!(bundle.overlaps(&OutputClaim::Files {
            dir: "".into(),
            extensions: exts(&["js"])
        }));
        assert!(!css.overlaps(&any));
        assert!(OutputClaim::Root.overlaps(&css));
        assert!(bundle.overlaps(&OutputClaim::Root));
    }
}
