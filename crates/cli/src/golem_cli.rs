//! Bridge to the external `golem` CLI.
//!
//! All real work (invoking workers, reading component metadata) is done by
//! spawning `golem`; this module only builds argument lists and collects
//! output.

use anyhow::{Context, Result, bail};
use golem_desk_types::{ComponentExportFunction, parse_component_exports};
use golem_desk_wave::Invocation;
use std::path::PathBuf;
use tokio::process::Command;

use crate::settings::LoadedSettings;

#[derive(Debug, Clone)]
pub struct GolemCli {
    program: PathBuf,
    profile: Option<String>,
    extra_args: Vec<String>,
    working_dir: PathBuf,
}

impl GolemCli {
    pub fn from_settings(loaded: &LoadedSettings) -> Self {
        Self {
            program: loaded.settings.golem_cli.clone(),
            profile: loaded.settings.profile.clone(),
            extra_args: loaded.settings.extra_args.clone(),
            working_dir: loaded.working_dir(),
        }
    }

    fn base_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if let Some(profile) = &self.profile {
            args.push("--profile".to_string());
            args.push(profile.clone());
        }
        args.extend(self.extra_args.iter().cloned());
        args
    }

    /// `golem worker invoke <worker> <function> <arg>...`
    pub fn invoke_args(&self, invocation: &Invocation) -> Result<Vec<String>> {
        let Some(target) = invocation.target.as_deref() else {
            bail!(
                "no worker given for invocation of {}",
                invocation.function
            );
        };
        let mut args = self.base_args();
        args.extend(["worker", "invoke", target].map(String::from));
        args.push(invocation.function.clone());
        args.extend(invocation.args.iter().cloned());
        Ok(args)
    }

    /// `golem component get <component> --format json`
    pub fn component_get_args(&self, component: &str) -> Vec<String> {
        let mut args = self.base_args();
        args.extend(["component", "get", component, "--format", "json"].map(String::from));
        args
    }

    /// Render a command line for display, quoting arguments for a POSIX shell.
    pub fn render_command(&self, args: &[String]) -> String {
        std::iter::once(self.program.display().to_string())
            .chain(args.iter().map(|a| shell_quote(a)))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Run `golem` with `args`, returning its stdout.
    pub async fn run(&self, args: &[String]) -> Result<String> {
        tracing::debug!(
            program = %self.program.display(),
            dir = %self.working_dir.display(),
            ?args,
            "spawning golem"
        );

        let output = Command::new(&self.program)
            .args(args)
            .current_dir(&self.working_dir)
            .output()
            .await
            .with_context(|| format!("failed to run {}", self.program.display()))?;

        if !output.status.success() {
            bail!(
                "`{}` failed ({}):\n{}",
                self.render_command(args),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim_end()
            );
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    pub async fn invoke(&self, invocation: &Invocation) -> Result<String> {
        let args = self.invoke_args(invocation)?;
        self.run(&args).await
    }

    /// Fetch and parse the exported functions of a deployed component.
    pub async fn component_exports(&self, component: &str) -> Result<Vec<ComponentExportFunction>> {
        let stdout = self.run(&self.component_get_args(component)).await?;
        let doc: serde_json::Value = serde_json::from_str(&stdout)
            .with_context(|| format!("`golem component get {component}` did not print JSON"))?;
        parse_component_exports(&doc)
            .with_context(|| format!("failed to read exports of component {component}"))
    }
}

fn shell_quote(arg: &str) -> String {
    let plain = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./:=@,+%".contains(c));
    if plain {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', "'\\''"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::Settings;

    fn cli(profile: Option<&str>) -> GolemCli {
        GolemCli::from_settings(&LoadedSettings {
            base_dir: PathBuf::from("/work"),
            settings: Settings {
                profile: profile.map(String::from),
                extra_args: vec!["--yes".to_string()],
                ..Default::default()
            },
        })
    }

    fn invocation(target: Option<&str>) -> Invocation {
        Invocation {
            target: target.map(String::from),
            function: "golem:it/api.{add}".to_string(),
            args: vec!["{qty: 1}".to_string(), "low".to_string()],
        }
    }

    #[test]
    fn invoke_args_put_worker_and_function_first() {
        let args = cli(Some("local"))
            .invoke_args(&invocation(Some("shop/cart-1")))
            .unwrap();
        assert_eq!(
            args,
            vec![
                "--profile",
                "local",
                "--yes",
                "worker",
                "invoke",
                "shop/cart-1",
                "golem:it/api.{add}",
                "{qty: 1}",
                "low"
            ]
        );
    }

    #[test]
    fn invoke_requires_a_worker() {
        let err = cli(None).invoke_args(&invocation(None)).unwrap_err();
        assert!(err.to_string().contains("no worker given"), "{err}");
    }

    #[test]
    fn component_get_requests_json() {
        assert_eq!(
            cli(None).component_get_args("shop"),
            vec!["--yes", "component", "get", "shop", "--format", "json"]
        );
    }

    #[test]
    fn rendered_commands_are_quoted() {
        let c = cli(None);
        let args = c.invoke_args(&invocation(Some("w"))).unwrap();
        assert_eq!(
            c.render_command(&args),
            "golem --yes worker invoke w 'golem:it/api.{add}' '{qty: 1}' low"
        );
        assert_eq!(shell_quote("it's"), "'it'\\''s'");
        assert_eq!(shell_quote(""), "''");
    }
}
