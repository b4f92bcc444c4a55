//! `--branches` values: one branch for every module, or per-module branches

use std::collections::BTreeMap;
use std::str::FromStr;

use crate::error::RaftError;

pub const DEFAULT_BRANCH: &str = "main";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BranchSpec {
    /// `dev`: every module is cloned from this branch
    All(String),
    /// `alignment:dev,utilities:main`; unlisted modules use `main`
    PerModule(BTreeMap<String, String>),
}

impl Default for BranchSpec {
    fn default() -> Self {
        BranchSpec::All(DEFAULT_BRANCH.to_string())
    }
}

impl BranchSpec {
    pub fn branch_for(&self, module: &str) -> &str {
        match self {
            BranchSpec::All(branch) => branch,
            BranchSpec::PerModule(map) => map.get(module).map_or(DEFAULT_BRANCH, String::as_str),
        }
    }
}

impl FromStr for BranchSpec {
    type Err = RaftError;

    fn from_str(spec: &str) -> Result<Self, Self::Err> {
        let spec = spec.trim();
        let invalid = || RaftError::InvalidBranchSpec(spec.to_string());
        if spec.is_empty() {
            return Err(invalid());
        }
        if !spec.contains(':') {
            if spec.contains(',') || spec.contains(char::is_whitespace) {
                return Err(invalid());
            }
            return Ok(BranchSpec::All(spec.to_string()));
        }

        let mut map = BTreeMap::new();
        for pair in spec.split(',') {
            let (module, branch) = pair.split_once(':').ok_or_else(invalid)?;
            let (module, branch) = (module.trim(), branch.trim());
            if module.is_empty() || branch.is_empty() {
                return Err(invalid());
            }
            map.insert(module.to_string(), branch.to_string());
        }
        Ok(BranchSpec::PerModule(map))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_branch() {
        let spec: BranchSpec = "dev".parse().unwrap();
        assert_eq!(spec.branch_for("alignment"), "dev");
        assert_eq!(spec.branch_for("anything"), "dev");
    }

    #[test]
    fn test_per_module_branches() {
        let spec: BranchSpec = "alignment:dev, utilities:release".parse().unwrap();
        assert_eq!(spec.branch_for("alignment"), "dev");
        assert_eq!(spec.branch_for("utilities"), "release");
        assert_eq!(spec.branch_for("samtools"), DEFAULT_BRANCH);
    }

    #[test]
    fn test_default_is_main() {
        assert_eq!(BranchSpec::default().branch_for("x"), "main");
    }

    #[test]
    fn test_invalid_specs() {
        for spec in ["", "alignment:", ":dev", "a:dev,b", "dev,main"] {
            assert!(
                matches!(spec.parse::<BranchSpec>(), Err(RaftError::InvalidBranchSpec(_))),
                "{spec:?} should be rejected"
            );
        }
    }
}
