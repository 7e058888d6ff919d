// src/config/model.rs

use indexmap::IndexMap;
use serde::Deserialize;

use crate::types::HashStorageMode;

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [config]
/// source = "app"
/// output = "build"
///
/// [task.styles]
/// after = ["clean-styles"]
/// src = ["styles/main.less"]
/// steps = [{ kind = "command", cmd = "lessc -" }, { kind = "rename", extension = "css" }]
/// dest = "styles"
///
/// [[watch]]
/// pattern = ["styles/**/*.less"]
/// tasks = ["styles"]
/// ```
///
/// Only `[task.*]` is required. Tasks keep the order they appear in the file.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawConfigFile {
    #[serde(default)]
    pub config: ConfigSection,

    #[serde(default)]
    pub build: BuildSection,

    #[serde(default)]
    pub serve: ServeSection,

    #[serde(default)]
    pub reload: ReloadSection,

    #[serde(default)]
    pub publish: Option<PublishSection>,

    #[serde(default)]
    pub task: IndexMap<String, TaskConfig>,

    #[serde(default)]
    pub watch: Vec<WatchConfig>,
}

/// Validated configuration.
///
/// Obtain one through [`crate::config::loader::load_and_validate`] or
/// `ConfigFile::try_from(raw)`.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub config: ConfigSection,
    pub build: BuildSection,
    pub serve: ServeSection,
    pub reload: ReloadSection,
    pub publish: Option<PublishSection>,
    pub task: IndexMap<String, TaskConfig>,
    pub watch: Vec<WatchConfig>,
}

impl ConfigFile {
    /// Wrap a raw config without validating it.
    pub fn new_unchecked(raw: RawConfigFile) -> Self {
        Self {
            config: raw.config,
            build: raw.build,
            serve: raw.serve,
            reload: raw.reload,
            publish: raw.publish,
            task: raw.task,
            watch: raw.watch,
        }
    }

    pub fn tasks(&self) -> &IndexMap<String, TaskConfig> {
        &self.task
    }
}

/// `[config]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigSection {
    /// Source root, relative to the config file's directory.
    #[serde(default = "default_source")]
    pub source: String,

    /// Output root, relative to the config file's directory.
    #[serde(default = "default_output")]
    pub output: String,

    /// Quiet period after the last watch event before a re-run starts.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Maximum number of files a pipeline processes at once.
    #[serde(default = "default_max_in_flight")]
    pub max_in_flight: usize,

    #[serde(default)]
    pub hash_storage_mode: HashStorageMode,
}

fn default_source() -> String {
    "app".to_string()
}

fn default_output() -> String {
    "build".to_string()
}

fn default_debounce_ms() -> u64 {
    150
}

fn default_max_in_flight() -> usize {
    16
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            source: default_source(),
            output: default_output(),
            debounce_ms: default_debounce_ms(),
            max_in_flight: default_max_in_flight(),
            hash_storage_mode: HashStorageMode::default(),
        }
    }
}

/// `[build]` section: the phases `build` runs, in order.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BuildSection {
    #[serde(default = "default_phases")]
    pub phases: Vec<Vec<String>>,
}

pub fn default_phases() -> Vec<Vec<String>> {
    vec![
        vec!["clean".to_string()],
        vec![
            "html".to_string(),
            "scripts".to_string(),
            "styles".to_string(),
            "statics".to_string(),
        ],
    ]
}

impl Default for BuildSection {
    fn default() -> Self {
        Self {
            phases: default_phases(),
        }
    }
}

/// `[serve]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServeSection {
    #[serde(default = "default_port")]
    pub port: u16,

    /// Server command; `{output}` and `{port}` are substituted.
    /// Without one, `default` runs the watch controller only.
    #[serde(default)]
    pub cmd: Option<String>,
}

fn default_port() -> u16 {
    8080
}

impl Default for ServeSection {
    fn default() -> Self {
        Self {
            port: default_port(),
            cmd: None,
        }
    }
}

/// `[reload]` section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReloadSection {
    /// Notification command; `{task}` is substituted. Reloads are only
    /// logged when unset.
    #[serde(default)]
    pub cmd: Option<String>,
}

/// `[publish]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PublishSection {
    pub host: String,
    pub project: String,
    /// Upload command; `{output}`, `{host}` and `{project}` are substituted.
    pub cmd: String,
}

/// `[task.<name>]` section.
///
/// Exactly one of `src`, `clean` or `cmd` must be set.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TaskConfig {
    /// Dependency list: this task runs after all tasks listed here.
    #[serde(default)]
    pub after: Vec<String>,

    /// Source globs (relative to the source root) for a pipeline task.
    #[serde(default)]
    pub src: Option<Vec<String>>,

    #[serde(default)]
    pub exclude: Vec<String>,

    /// Destination directory under the output root. Unset makes the
    /// pipeline check-only.
    #[serde(default)]
    pub dest: Option<String>,

    #[serde(default)]
    pub steps: Vec<StepConfig>,

    /// Globs under the output root to delete; empty wipes the whole root.
    #[serde(default)]
    pub clean: Option<Vec<String>>,

    /// Shell command run in the config directory.
    #[serde(default)]
    pub cmd: Option<String>,

    /// Succeed even if some files fail to transform.
    #[serde(default)]
    pub tolerate_errors: bool,

    /// Notify the reload sink after this task succeeds.
    #[serde(default)]
    pub reload: bool,
}

impl TaskConfig {
    pub fn action(&self) -> Option<TaskAction<'_>> {
        match (&self.src, &self.clean, &self.cmd) {
            (Some(src), None, None) => Some(TaskAction::Pipeline(src)),
            (None, Some(globs), None) => Some(TaskAction::Clean(globs)),
            (None, None, Some(cmd)) => Some(TaskAction::Command(cmd)),
            _ => None,
        }
    }
}

/// What a task does, borrowed from its config.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskAction<'a> {
    Pipeline(&'a [String]),
    Clean(&'a [String]),
    Command(&'a str),
}

/// One entry of a pipeline task's `steps`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum StepConfig {
    /// Pipe contents through `cmd`; stdout replaces them.
    Command { cmd: String },
    /// Feed contents to `cmd`; fail the file on non-zero exit.
    Check { cmd: String },
    Rename { extension: String },
    Concat {
        output: String,
        #[serde(default = "default_separator")]
        separator: String,
    },
    Copy,
}

fn default_separator() -> String {
    "\n".to_string()
}

/// `[[watch]]` entry.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WatchConfig {
    pub pattern: Vec<String>,

    #[serde(default)]
    pub exclude: Vec<String>,

    pub tasks: Vec<String>,

    /// Only re-run when the matched files' contents changed.
    #[serde(default)]
    pub use_hash: bool,
}
