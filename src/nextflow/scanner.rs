//! Line scanner for Nextflow DSL2 text
//!
//! RAFT never parses Groovy. It classifies whole lines into the handful of
//! shapes the module conventions rely on and works from those tokens.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StepKind {
    Workflow,
    Process,
}

impl StepKind {
    pub fn keyword(self) -> &'static str {
        match self {
            StepKind::Workflow => "workflow",
            StepKind::Process => "process",
        }
    }
}

impl std::fmt::Display for StepKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.keyword())
    }
}

/// One imported name of an `include { a; b as c } from '...'` statement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncludedName<'a> {
    pub name: &'a str,
    pub alias: Option<&'a str>,
}

impl IncludedName<'_> {
    /// The name the including file calls it by
    pub fn local_name(&self) -> &str {
        self.alias.unwrap_or(self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token<'a> {
    /// `workflow <name> {` or `process <name> {` at column zero
    Header { kind: StepKind, name: &'a str },
    /// The unnamed `workflow {` entry block
    EntryWorkflow,
    /// `include { ... } from '<source>'`
    Include {
        names: Vec<IncludedName<'a>>,
        source: &'a str,
    },
    /// `// require:`
    RequireMarker,
    /// `take:`
    TakeMarker,
    /// A `//` comment; holds the text after the slashes, trimmed
    Comment(&'a str),
    /// A line holding only `}` at column zero
    Close,
    Blank,
    Line(&'a str),
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn parse_header(line: &str) -> Option<Token<'_>> {
    let (kind, rest) = if let Some(rest) = line.strip_prefix("workflow ") {
        (StepKind::Workflow, rest)
    } else if let Some(rest) = line.strip_prefix("process ") {
        (StepKind::Process, rest)
    } else {
        return None;
    };

    let name = rest.strip_suffix('{')?.trim();
    if name.is_empty() && kind == StepKind::Workflow {
        return Some(Token::EntryWorkflow);
    }
    is_identifier(name).then_some(Token::Header { kind, name })
}

fn parse_include(line: &str) -> Option<Token<'_>> {
    let rest = line.strip_prefix("include")?.trim_start();
    let rest = rest.strip_prefix('{')?;
    let (inner, after) = rest.split_once('}')?;
    let source = after
        .trim()
        .strip_prefix("from")?
        .trim()
        .trim_matches(|c| c == '\'' || c == '"');

    let names = inner
        .split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|entry| match entry.split_once(" as ") {
            Some((name, alias)) => IncludedName {
                name: name.trim(),
                alias: Some(alias.trim()),
            },
            None => IncludedName {
                name: entry,
                alias: None,
            },
        })
        .collect();

    Some(Token::Include { names, source })
}

/// Classify a single line (without its newline)
pub fn classify(line: &str) -> Token<'_> {
    let line = line.trim_end();
    let trimmed = line.trim_start();

    if trimmed.is_empty() {
        return Token::Blank;
    }
    if line == "}" {
        return Token::Close;
    }
    if let Some(token) = parse_header(line) {
        return token;
    }
    if trimmed == "take:" {
        return Token::TakeMarker;
    }
    if let Some(comment) = trimmed.strip_prefix("//") {
        let comment = comment.trim();
        if comment == "require:" {
            return Token::RequireMarker;
        }
        return Token::Comment(comment);
    }
    if let Some(token) = parse_include(trimmed) {
        return token;
    }
    Token::Line(trimmed)
}

/// Identifier at the start of a call statement such as `align(reads)` or `sort()`
pub fn leading_call(line: &str) -> Option<&str> {
    let trimmed = line.trim_start();
    let end = trimmed.find('(')?;
    let name = &trimmed[..end];
    is_identifier(name).then_some(name)
}
