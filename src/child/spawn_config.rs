use crate::config::ChildConfig;

/// Resolved command line for the calculator process.
///
/// The executable comes from the single optional positional argument when
/// given, otherwise from `[child] program`. Arguments and environment always
/// come from the config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildSpawnConfig {
    program: String,
    args: Vec<String>,
    env: Vec<(String, String)>,
}

impl ChildSpawnConfig {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            env: Vec::new(),
        }
    }

    pub fn resolve(program_override: Option<String>, config: &ChildConfig) -> Self {
        let program = program_override
            .filter(|program| !program.trim().is_empty())
            .unwrap_or_else(|| config.program.clone());
        let mut env: Vec<(String, String)> = config
            .env
            .iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        env.sort();
        Self {
            program,
            args: config.args.clone(),
            env,
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn env(&self) -> &[(String, String)] {
        &self.env
    }
}
