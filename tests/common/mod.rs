//! Common test utilities: a RAFT installation in a temporary directory and
//! module remotes published as local git repositories.

#![allow(dead_code)]

use assert_cmd::Command;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const ALIGNMENT_NF: &str = r#"include { sort_bams } from '../samtools/samtools.nf'

workflow align_reads {
// Aligns paired reads and sorts the alignments.
// require:
//   FQS
//   params.align_reads$ref
  take:
    fqs
    ref
  main:
    bwa_mem(fqs, ref, params.align_reads$bwa_parameters)
    sort_bams(bwa_mem.out)
}

process bwa_mem {
// require:
//   FQS
//   params.bwa_mem$threads

  script:
  """
  bwa mem -t ${params.bwa_mem$threads}
  """
}
"#;

pub const ALIGNMENT_CONFIG: &str = "process {\n  withName: bwa_mem {\n    cpus = 8\n  }\n}\n";

pub const SAMTOOLS_NF: &str = r#"workflow sort_bams {
// require:
//   BAMS
  take:
    bams
  main:
    samtools_sort(bams, params.sort_bams$memory)
    index_bams(samtools_sort.out)
}

workflow index_bams {
  take:
    bams
  main:
    samtools_index(bams, params.index_bams$threads)
}
"#;

pub const LOOPS_NF: &str = r#"workflow ping {
  take:
    x
  main:
    pong(x, params.ping$rounds)
}

workflow pong {
  take:
    x
  main:
    ping(x, params.pong$rounds)
}
"#;

/// Run git with a fixed identity, panicking on failure
pub fn git(dir: &Path, args: &[&str]) {
    let status = std::process::Command::new("git")
        .args(["-c", "user.email=raft@example.org", "-c", "user.name=RAFT Tests"])
        .args(args)
        .current_dir(dir)
        .status()
        .expect("git is available");
    assert!(status.success(), "git {args:?} failed in {}", dir.display());
}

pub struct RaftFixture {
    pub root: TempDir,
    pub remotes: TempDir,
}

impl RaftFixture {
    /// `raft setup -d`, with the default module repository pointed at a local directory
    pub fn new() -> Self {
        let fixture = Self {
            root: TempDir::new().unwrap(),
            remotes: TempDir::new().unwrap(),
        };
        fixture.raft().args(["setup", "-d"]).assert().success();

        let cfg_path = fixture.raft_dir().join(".raft.cfg");
        let mut cfg: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&cfg_path).unwrap()).unwrap();
        cfg["nextflow_repos"]["nextflow_modules"] =
            serde_json::Value::String(fixture.remotes.path().display().to_string());
        fs::write(&cfg_path, serde_json::to_string_pretty(&cfg).unwrap()).unwrap();
        fixture
    }

    pub fn raft_dir(&self) -> &Path {
        self.root.path()
    }

    pub fn raft(&self) -> Command {
        let mut cmd = Command::cargo_bin("raft").unwrap();
        cmd.env("RAFT_DIR", self.root.path()).env_remove("RUST_LOG");
        cmd
    }

    pub fn project_dir(&self, id: &str) -> PathBuf {
        self.raft_dir().join("projects").join(id)
    }

    pub fn main_nf(&self, id: &str) -> String {
        fs::read_to_string(self.project_dir(id).join("workflow/main.nf")).unwrap()
    }

    pub fn audit_log(&self, id: &str) -> String {
        fs::read_to_string(self.project_dir(id).join(".raft/auto.raft")).unwrap()
    }

    pub fn init_project(&self, id: &str) {
        self.raft().args(["init-project", "-p", id]).assert().success();
    }

    /// Publish `<remotes>/<subgroup>/<module>` as a git repository on branch `main`
    pub fn publish_module(&self, subgroup: &str, module: &str, files: &[(&str, &str)]) -> PathBuf {
        let dir = self.remotes.path().join(subgroup).join(module);
        fs::create_dir_all(&dir).unwrap();
        git(&dir, &["init", "--quiet", "--initial-branch=main"]);
        for (name, content) in files {
            fs::write(dir.join(name), content).unwrap();
        }
        git(&dir, &["add", "."]);
        git(&dir, &["commit", "--quiet", "-m", "publish"]);
        dir
    }

    /// The alignment and samtools modules, alignment depending on samtools
    pub fn publish_alignment_modules(&self) {
        self.publish_module(
            "Tools",
            "alignment",
            &[("alignment.nf", ALIGNMENT_NF), ("alignment.config", ALIGNMENT_CONFIG)],
        );
        self.publish_module("Projects", "samtools", &[("samtools.nf", SAMTOOLS_NF)]);
    }

    pub fn load_module(&self, id: &str, module: &str) {
        self.raft()
            .args(["load-module", "-p", id, "-m", module, "--delay", "0"])
            .assert()
            .success();
    }
}
