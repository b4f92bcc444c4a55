//! Steps: named `workflow` and `process` blocks inside a module script

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use super::params;
use super::scanner::{classify, leading_call, StepKind, Token};
use crate::error::RaftError;

/// Which of a step's declared requirements become top-level parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequirePolicy {
    /// The step being added: body references plus required parameters
    Expose,
    /// A step reached through another one: body references minus its
    /// required parameters, which the caller satisfies
    Discard,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Workflow {
        name: String,
        requires: Vec<String>,
        body: Vec<String>,
    },
    Process {
        name: String,
        requires: Vec<String>,
        body: Vec<String>,
    },
}

impl Step {
    fn new(kind: StepKind, name: &str, requires: Vec<String>, body: Vec<String>) -> Self {
        let name = name.to_string();
        match kind {
            StepKind::Workflow => Step::Workflow {
                name,
                requires,
                body,
            },
            StepKind::Process => Step::Process {
                name,
                requires,
                body,
            },
        }
    }

    pub fn kind(&self) -> StepKind {
        match self {
            Step::Workflow { .. } => StepKind::Workflow,
            Step::Process { .. } => StepKind::Process,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Step::Workflow { name, .. } | Step::Process { name, .. } => name,
        }
    }

    /// Call arguments listed under `// require:`
    pub fn requires(&self) -> &[String] {
        match self {
            Step::Workflow { requires, .. } | Step::Process { requires, .. } => requires,
        }
    }

    /// The block's lines, header and closing brace included
    pub fn body(&self) -> &[String] {
        match self {
            Step::Workflow { body, .. } | Step::Process { body, .. } => body,
        }
    }

    /// `name(arg, ...)` as invoked from a main workflow
    pub fn call(&self) -> String {
        format!("{}({})", self.name(), self.requires().join(", "))
    }

    fn code_lines(&self) -> impl Iterator<Item = &str> {
        self.body()
            .iter()
            .skip(1)
            .map(String::as_str)
            .filter(|line| !matches!(classify(line), Token::Comment(_) | Token::RequireMarker))
    }

    /// `params.*` referenced by the block's code (comments excluded)
    pub fn body_parameters(&self) -> Vec<String> {
        self.code_lines()
            .flat_map(params::references)
            .map(str::to_string)
            .collect()
    }

    /// Required entries that are themselves parameters
    pub fn required_parameters(&self) -> Vec<String> {
        self.requires()
            .iter()
            .filter(|r| r.starts_with("params."))
            .cloned()
            .collect()
    }

    /// Parameters this step contributes to a main workflow
    pub fn parameters(&self, policy: RequirePolicy) -> Vec<String> {
        let required = self.required_parameters();
        match (self, policy) {
            (Step::Process { .. }, RequirePolicy::Expose) => required,
            (_, RequirePolicy::Expose) => {
                let mut all = self.body_parameters();
                all.extend(required);
                all
            }
            (_, RequirePolicy::Discard) => self
                .body_parameters()
                .into_iter()
                .filter(|p| !required.contains(p))
                .collect(),
        }
    }

    /// Names called at the start of a statement in the block
    pub fn calls(&self) -> Vec<String> {
        self.code_lines()
            .filter_map(leading_call)
            .filter(|name| *name != self.name())
            .map(str::to_string)
            .collect()
    }
}

/// A module's `.nf` file, held as lines
#[derive(Debug, Clone)]
pub struct ModuleScript {
    path: PathBuf,
    lines: Vec<String>,
}

/// Header of a step found in a module script, with its leading documentation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepSummary {
    pub kind: StepKind,
    pub name: String,
    pub docs: Vec<String>,
}

fn clean_require_entry(comment: &str) -> Option<String> {
    comment
        .split(',')
        .next()
        .and_then(|entry| entry.split_whitespace().next())
        .map(str::to_string)
}

impl ModuleScript {
    pub fn read(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(RaftError::ModuleNotLoaded {
                path: path.to_path_buf(),
            }
            .into());
        }
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read module {}", path.display()))?;
        Ok(Self::from_text(path, &text))
    }

    pub fn from_text(path: &Path, text: &str) -> Self {
        Self {
            path: path.to_path_buf(),
            lines: text.lines().map(str::to_string).collect(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Module name, taken from the file stem
    pub fn module_name(&self) -> String {
        self.path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default()
    }

    fn headers(&self) -> impl Iterator<Item = (usize, StepKind, &str)> {
        self.lines
            .iter()
            .enumerate()
            .filter_map(|(idx, line)| match classify(line) {
                Token::Header { kind, name } => Some((idx, kind, name)),
                _ => None,
            })
    }

    pub fn step_names(&self) -> Vec<String> {
        self.headers().map(|(_, _, name)| name.to_string()).collect()
    }

    /// Named workflow blocks only
    pub fn workflow_names(&self) -> Vec<String> {
        self.headers()
            .filter(|(_, kind, _)| *kind == StepKind::Workflow)
            .map(|(_, _, name)| name.to_string())
            .collect()
    }

    /// Imported names: `(local name, original name, source path)`
    pub fn includes(&self) -> Vec<(String, String, String)> {
        let mut out = Vec::new();
        for line in &self.lines {
            if let Token::Include { names, source } = classify(line) {
                for included in names {
                    out.push((
                        included.local_name().to_string(),
                        included.name.to_string(),
                        source.to_string(),
                    ));
                }
            }
        }
        out
    }

    /// Extract step `name`
    pub fn step(&self, name: &str) -> Result<Step> {
        let (start, kind, _) = self
            .headers()
            .find(|(_, _, header)| *header == name)
            .ok_or_else(|| RaftError::StepNotFound {
                module: self.module_name(),
                step: name.to_string(),
                available: self.step_names(),
            })?;

        let end = self.lines[start..]
            .iter()
            .position(|line| classify(line) == Token::Close)
            .map(|offset| start + offset)
            .ok_or_else(|| RaftError::UnterminatedStep {
                step: name.to_string(),
                path: self.path.clone(),
            })?;

        let body = self.lines[start..=end].to_vec();
        let requires = match kind {
            StepKind::Workflow => workflow_requires(&body),
            StepKind::Process => process_requires(&body),
        };
        Ok(Step::new(kind, name, requires, body))
    }

    /// Every step with the comment lines that open its block
    pub fn summaries(&self) -> Vec<StepSummary> {
        self.headers()
            .map(|(idx, kind, name)| {
                let docs = self.lines[idx + 1..]
                    .iter()
                    .map(|line| classify(line))
                    .take_while(|token| matches!(token, Token::Comment(_)))
                    .filter_map(|token| match token {
                        Token::Comment(text) => Some(text.to_string()),
                        _ => None,
                    })
                    .collect();
                StepSummary {
                    kind,
                    name: name.to_string(),
                    docs,
                }
            })
            .collect()
    }
}

/// Comments after `// require:` up to `take:`
fn workflow_requires(body: &[String]) -> Vec<String> {
    body.iter()
        .map(|line| classify(line))
        .skip_while(|token| *token != Token::RequireMarker)
        .skip(1)
        .take_while(|token| *token != Token::TakeMarker)
        .filter_map(|token| match token {
            Token::Comment(text) => clean_require_entry(text),
            _ => None,
        })
        .collect()
}

/// Comments after `// require:` up to the first line that is not a comment
fn process_requires(body: &[String]) -> Vec<String> {
    body.iter()
        .map(|line| classify(line))
        .skip_while(|token| *token != Token::RequireMarker)
        .skip(1)
        .take_while(|token| matches!(token, Token::Comment(_)))
        .filter_map(|token| match token {
            Token::Comment(text) => clean_require_entry(text),
            _ => None,
        })
        .collect()
}
