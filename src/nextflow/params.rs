//! Parameter references and their declarations in a main workflow
//!
//! Parameter names may be tiered with `$`: `params.lens$align$bwa_mem$ref`
//! reads as "the `ref` of `bwa_mem`, used by `align`, inside `lens`". Tiered
//! declarations let a value set at any level be inherited below it.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{BTreeMap, HashSet};

static PARAM_REF_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"params\.[A-Za-z_][A-Za-z0-9_$]*").expect("Valid regex pattern"));

/// Value given to a parameter nobody has set yet
pub const UNSET: &str = "''";

/// Every `params.<name>` referenced on a line, in order
pub fn references(line: &str) -> impl Iterator<Item = &str> {
    PARAM_REF_REGEX.find_iter(line).map(|m| m.as_str())
}

/// Names already declared by a main workflow (`params.x = ...` lines)
pub fn declared<'a, I>(lines: I) -> HashSet<String>
where
    I: IntoIterator<Item = &'a str>,
{
    lines
        .into_iter()
        .map(str::trim_start)
        .filter(|line| line.starts_with("params"))
        .filter_map(|line| line.split_whitespace().next())
        .map(str::to_string)
        .collect()
}

/// Drop repeated entries, keeping the first occurrence
pub fn dedup_preserving_order(params: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    params
        .into_iter()
        .filter(|p| seen.insert(p.clone()))
        .collect()
}

/// Expand tiered names so each tier is declared and refers to its parent.
///
/// `params.foo$bar$tool` yields `params.tool = ''`,
/// `params.foo$tool = params.tool` and `params.foo$bar$tool = params.foo$tool`.
pub fn expand_tiers<S: AsRef<str>>(params: &[S]) -> BTreeMap<String, String> {
    let mut expanded = BTreeMap::new();
    for param in params {
        let name = param
            .as_ref()
            .split_once('.')
            .map_or("", |(_, rest)| rest);
        let tiers: Vec<&str> = name.split('$').collect();
        expanded.insert(format!("params.{}", tiers.join("$")), UNSET.to_string());

        if let Some((leaf, scopes)) = tiers.split_last().filter(|(_, scopes)| !scopes.is_empty()) {
            for depth in 0..scopes.len() {
                let key = tier_name(&scopes[..=depth], leaf);
                let parent = tier_name(&scopes[..depth], leaf);
                expanded.insert(key, parent);
            }
            expanded.insert(format!("params.{leaf}"), UNSET.to_string());
        }
    }
    expanded
}

fn tier_name(scopes: &[&str], leaf: &str) -> String {
    let mut parts = scopes.to_vec();
    parts.push(leaf);
    format!("params.{}", parts.join("$"))
}

/// Declarations to insert into a main workflow
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParameterBlock {
    /// `params.x = ''` lines under `/*Parameters*/`
    Flat(Vec<String>),
    /// Unset leaves under `/*General Parameters*/`, inheriting tiers under
    /// `/*Fine-tuned Parameters*/`
    Tiered {
        general: Vec<String>,
        fine_tuned: Vec<String>,
    },
}

impl ParameterBlock {
    pub fn flat(params: &[String], declared: &HashSet<String>) -> Self {
        ParameterBlock::Flat(
            params
                .iter()
                .filter(|p| !declared.contains(p.as_str()))
                .map(|p| format!("{p} = {UNSET}"))
                .collect(),
        )
    }

    pub fn tiered(params: &[String], declared: &HashSet<String>) -> Self {
        let expanded: Vec<(String, String)> = expand_tiers(params)
            .into_iter()
            .filter(|(name, _)| !declared.contains(name))
            .collect();

        let general = expanded
            .iter()
            .filter(|(_, value)| value == UNSET)
            .map(|(name, value)| format!("{name} = {value}"))
            .collect();

        let mut inherited: Vec<&(String, String)> =
            expanded.iter().filter(|(_, value)| value != UNSET).collect();
        inherited.sort_by(|(a, _), (b, _)| {
            let key = |name: &str| {
                let tiers: Vec<&str> = name.split('$').collect();
                (tiers.last().copied().unwrap_or_default().to_string(), tiers.len())
            };
            key(a).cmp(&key(b)).then_with(|| a.cmp(b))
        });
        let fine_tuned = inherited
            .into_iter()
            .map(|(name, value)| format!("{name} = {value}"))
            .collect();

        ParameterBlock::Tiered {
            general,
            fine_tuned,
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            ParameterBlock::Flat(lines) => lines.is_empty(),
            ParameterBlock::Tiered {
                general,
                fine_tuned,
            } => general.is_empty() && fine_tuned.is_empty(),
        }
    }

    /// Declared names, flattened across sections
    pub fn names(&self) -> Vec<&str> {
        let lines: Box<dyn Iterator<Item = &String>> = match self {
            ParameterBlock::Flat(lines) => Box::new(lines.iter()),
            ParameterBlock::Tiered {
                general,
                fine_tuned,
            } => Box::new(general.iter().chain(fine_tuned.iter())),
        };
        lines
            .filter_map(|line| line.split(" = ").next())
            .collect()
    }
}
