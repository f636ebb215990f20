use std::collections::BTreeMap;
use std::sync::Arc;

use common::Language;
use thiserror::Error;

use crate::config::WorkerConfig;
use crate::runner::{CppRunner, JavaRunner, NodeRunner, PythonRunner, Runner};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unsupported language: {0}")]
pub struct UnsupportedLanguage(pub String);

/// Maps each enabled language to its runner.
#[derive(Default)]
pub struct RunnerRegistry {
    runners: BTreeMap<Language, Arc<dyn Runner>>,
}

impl RunnerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding a runner for every language enabled in `config`.
    pub fn from_config(config: &WorkerConfig) -> Self {
        let limits = config.limits();
        let toolchain = &config.toolchain;
        let mut registry = Self::new();
        for language in &config.languages {
            let runner: Arc<dyn Runner> = match language {
                Language::Python => Arc::new(PythonRunner::new(&toolchain.python, limits.clone())),
                Language::Nodejs => Arc::new(NodeRunner::new(&toolchain.node, limits.clone())),
                Language::Cpp => Arc::new(CppRunner::new(
                    &toolchain.cpp_compiler,
                    toolchain.cpp_flags.clone(),
                    limits.clone(),
                )),
                Language::Java => Arc::new(JavaRunner::new(
                    &toolchain.javac,
                    &toolchain.java,
                    limits.clone(),
                )),
            };
            registry.register(runner);
        }
        registry
    }

    /// Add a runner, replacing any previous runner for its language.
    pub fn register(&mut self, runner: Arc<dyn Runner>) -> &mut Self {
        self.runners.insert(runner.language(), runner);
        self
    }

    pub fn get(&self, language: Language) -> Result<Arc<dyn Runner>, UnsupportedLanguage> {
        self.runners
            .get(&language)
            .cloned()
            .ok_or_else(|| UnsupportedLanguage(language.to_string()))
    }

    /// Resolve a runner from a wire tag.
    pub fn resolve(&self, tag: &str) -> Result<Arc<dyn Runner>, UnsupportedLanguage> {
        let language: Language = tag
            .parse()
            .map_err(|_| UnsupportedLanguage(tag.to_string()))?;
        self.get(language)
    }

    pub fn languages(&self) -> Vec<Language> {
        self.runners.keys().copied().collect()
    }
}
