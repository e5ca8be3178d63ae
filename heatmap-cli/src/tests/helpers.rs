//! Test helpers for driving the heatmap CLI against a scratch database.

use super::*;
use camino::Utf8PathBuf;
use serde_json::Value;
use tempfile::TempDir;

/// Temporary directory holding a heatmap database.
#[derive(Debug)]
pub(super) struct Workspace {
    _dir: TempDir,
    root: Utf8PathBuf,
}

impl Workspace {
    pub(super) fn new() -> Self {
        let dir = TempDir::new().expect("tempdir");
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf-8 workspace");
        Self { _dir: dir, root }
    }

    pub(super) fn database(&self) -> Utf8PathBuf {
        self.root.join("heatmap.db")
    }

    pub(super) fn path(&self, relative: &str) -> Utf8PathBuf {
        self.root.join(relative)
    }

    /// Run `heatmap <command> --database <db> <args..>` and capture stdout.
    pub(super) fn invoke(&self, command: &str, args: &[&str]) -> Result<String, CliError> {
        let database = self.database();
        let mut invocation = vec![
            "heatmap".to_owned(),
            command.to_owned(),
            format!("--{ARG_DATABASE}"),
            database.to_string(),
        ];
        invocation.extend(args.iter().map(|arg| (*arg).to_owned()));
        let cli = Cli::try_parse_from(invocation).map_err(CliError::ArgumentParsing)?;
        let mut output = Vec::new();
        run_with(cli, &mut output)?;
        Ok(String::from_utf8(output).expect("utf-8 output"))
    }

    /// Like [`Workspace::invoke`] but panics on failure and decodes JSON.
    pub(super) fn invoke_json(&self, command: &str, args: &[&str]) -> Value {
        let output = self
            .invoke(command, args)
            .unwrap_or_else(|err| panic!("{command} failed: {err}"));
        serde_json::from_str(&output).expect("command prints JSON")
    }

    /// Create the schema, a location and optionally businesses under it.
    pub(super) fn seed(&self, location: &str, businesses: &[&str]) {
        if !self.database().as_std_path().exists() {
            self.invoke_json("init", &[]);
        }
        self.invoke_json("add-location", &["--id", location]);
        for business in businesses {
            self.invoke_json("add-business", &["--id", business, "--location", location]);
        }
    }
}

pub(super) fn approx_eq(actual: &Value, expected: f64) -> bool {
    actual
        .as_f64()
        .is_some_and(|value| (value - expected).abs() < 1e-9)
}
