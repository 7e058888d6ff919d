#![allow(dead_code)]

use taskforge::config::model::{
    BuildSection, ConfigFile, ConfigSection, PublishSection, RawConfigFile, ReloadSection,
    ServeSection, StepConfig, TaskConfig, WatchConfig,
};
use taskforge::types::HashStorageMode;

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile {
                config: ConfigSection::default(),
                build: BuildSection::default(),
                serve: ServeSection::default(),
                reload: ReloadSection::default(),
                publish: None,
                task: Default::default(),
                watch: Vec::new(),
            },
        }
    }

    pub fn with_task(mut self, name: &str, task: TaskConfig) -> Self {
        self.config.task.insert(name.to_string(), task);
        self
    }

    pub fn with_phases(mut self, phases: &[&[&str]]) -> Self {
        self.config.build.phases = phases
            .iter()
            .map(|p| p.iter().map(|s| s.to_string()).collect())
            .collect();
        self
    }

    pub fn with_watch(mut self, patterns: &[&str], tasks: &[&str], use_hash: bool) -> Self {
        self.config.watch.push(WatchConfig {
            pattern: patterns.iter().map(|s| s.to_string()).collect(),
            exclude: Vec::new(),
            tasks: tasks.iter().map(|s| s.to_string()).collect(),
            use_hash,
        });
        self
    }

    pub fn with_roots(mut self, source: &str, output: &str) -> Self {
        self.config.config.source = source.to_string();
        self.config.config.output = output.to_string();
        self
    }

    pub fn with_debounce_ms(mut self, ms: u64) -> Self {
        self.config.config.debounce_ms = ms;
        self
    }

    pub fn with_hash_storage_mode(mut self, mode: HashStorageMode) -> Self {
        self.config.config.hash_storage_mode = mode;
        self
    }

    pub fn with_publish(mut self, host: &str, project: &str, cmd: &str) -> Self {
        self.config.publish = Some(PublishSection {
            host: host.to_string(),
            project: project.to_string(),
            cmd: cmd.to_string(),
        });
        self
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `TaskConfig`.
pub struct TaskConfigBuilder {
    task: TaskConfig,
}

impl TaskConfigBuilder {
    /// A pipeline task over `src` globs.
    pub fn pipeline(src: &[&str]) -> Self {
        Self {
            task: TaskConfig {
                src: Some(src.iter().map(|s| s.to_string()).collect()),
                ..TaskConfig::default()
            },
        }
    }

    /// A clean task; no globs wipes the output root.
    pub fn clean(globs: &[&str]) -> Self {
        Self {
            task: TaskConfig {
                clean: Some(globs.iter().map(|s| s.to_string()).collect()),
                ..TaskConfig::default()
            },
        }
    }

    pub fn command(cmd: &str) -> Self {
        Self {
            task: TaskConfig {
                cmd: Some(cmd.to_string()),
                ..TaskConfig::default()
            },
        }
    }

    pub fn after(mut self, dep: &str) -> Self {
        self.task.after.push(dep.to_string());
        self
    }

    pub fn exclude(mut self, pattern: &str) -> Self {
        self.task.exclude.push(pattern.to_string());
        self
    }

    pub fn dest(mut self, dest: &str) -> Self {
        self.task.dest = Some(dest.to_string());
        self
    }

    pub fn step(mut self, step: StepConfig) -> Self {
        self.task.steps.push(step);
        self
    }

    pub fn rename(self, extension: &str) -> Self {
        self.step(StepConfig::Rename {
            extension: extension.to_string(),
        })
    }

    pub fn concat(self, output: &str) -> Self {
        self.step(StepConfig::Concat {
            output: output.to_string(),
            separator: "\n".to_string(),
        })
    }

    pub fn tolerate_errors(mut self, val: bool) -> Self {
        self.task.tolerate_errors = val;
        self
    }

    pub fn reload(mut self, val: bool) -> Self {
        self.task.reload = val;
        self
    }

    pub fn build(self) -> TaskConfig {
        self.task
    }
}
