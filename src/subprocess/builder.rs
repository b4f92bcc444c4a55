use std::path::Path;

use crate::subprocess::ProcessCommand;

pub struct ProcessCommandBuilder {
    command: ProcessCommand,
}

impl ProcessCommandBuilder {
    pub fn new(program: &str) -> Self {
        Self {
            command: ProcessCommand {
                program: program.to_string(),
                args: Vec::new(),
                working_dir: None,
                inherit_stdio: false,
            },
        }
    }

    pub fn arg(mut self, arg: impl AsRef<str>) -> Self {
        self.command.args.push(arg.as_ref().to_string());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.command
            .args
            .extend(args.into_iter().map(|s| s.as_ref().to_string()));
        self
    }

    /// Append a path argument
    pub fn path_arg(self, path: &Path) -> Self {
        let arg = path.to_string_lossy().to_string();
        self.arg(arg)
    }

    pub fn current_dir(mut self, dir: &Path) -> Self {
        self.command.working_dir = Some(dir.to_path_buf());
        self
    }

    pub fn inherit_stdio(mut self) -> Self {
        self.command.inherit_stdio = true;
        self
    }

    pub fn build(self) -> ProcessCommand {
        self.command
    }
}
