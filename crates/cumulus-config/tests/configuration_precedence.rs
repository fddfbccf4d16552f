//! Behavioural coverage for configuration layering.

use std::ffi::OsString;
use std::fs;

use camino::Utf8Path;
use ortho_config::OrthoConfig;
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use tempfile::TempDir;

use cumulus_config::{
    ArchiveFormat, Config, default_listen_endpoint, default_log_filter, default_log_format,
    default_packer, default_root,
};

struct Harness {
    temp_dir: TempDir,
    cli_args: std::cell::RefCell<Vec<OsString>>,
    env_overrides: std::cell::RefCell<Vec<(String, Option<OsString>)>>,
    loaded: std::cell::RefCell<Option<Config>>,
    error: std::cell::RefCell<Option<String>>,
}

impl Harness {
    fn new() -> Self {
        let temp_dir = match TempDir::new() {
            Ok(dir) => dir,
            Err(error) => panic!("failed to create temporary directory: {error}"),
        };
        Self {
            temp_dir,
            cli_args: std::cell::RefCell::new(vec![OsString::from("cumulusd")]),
            env_overrides: std::cell::RefCell::new(Vec::new()),
            loaded: std::cell::RefCell::new(None),
            error: std::cell::RefCell::new(None),
        }
    }

    fn write_config(&self, root: &str) {
        let path = self.temp_dir.path().join("cumulus.toml");
        if let Err(error) = fs::write(&path, format!("root = \"{root}\"\n")) {
            panic!("failed to write configuration: {error}");
        }

        let mut args = self.cli_args.borrow_mut();
        args.push(OsString::from("--config-path"));
        args.push(path.into_os_string());
    }

    fn set_env(&self, key: &str, value: &str) {
        let previous = std::env::var_os(key);
        // Environment mutation is `unsafe` in edition 2024; `Drop` restores
        // every override.
        unsafe { std::env::set_var(key, value) };
        self.env_overrides
            .borrow_mut()
            .push((key.to_owned(), previous));
    }

    fn push_cli_arg(&self, arg: impl Into<OsString>) {
        self.cli_args.borrow_mut().push(arg.into());
    }

    fn load(&self) {
        if self.loaded.borrow().is_some() || self.error.borrow().is_some() {
            return;
        }

        let args = self.cli_args.borrow().clone();
        match Config::load_from_iter(args) {
            Ok(config) => {
                *self.loaded.borrow_mut() = Some(config);
            }
            Err(error) => {
                *self.error.borrow_mut() = Some(error.to_string());
            }
        }
    }

    fn loaded_config(&self) -> Config {
        self.load();

        if let Some(error) = self.error.borrow().as_ref() {
            panic!("configuration failed to load: {error}");
        }

        match self.loaded.borrow().as_ref() {
            Some(config) => config.clone(),
            None => panic!("configuration was not loaded"),
        }
    }
}

impl Drop for Harness {
    fn drop(&mut self) {
        let mut overrides = self.env_overrides.borrow_mut();
        while let Some((key, value)) = overrides.pop() {
            if let Some(os_value) = value {
                unsafe { std::env::set_var(&key, os_value) };
            } else {
                unsafe { std::env::remove_var(&key) };
            }
        }
    }
}

#[fixture]
fn harness() -> Harness {
    Harness::new()
}

#[given("a configuration file setting the root to \"{root}\"")]
fn given_configuration_file(harness: &Harness, root: String) {
    harness.write_config(&root);
}

#[given("the environment overrides the root to \"{root}\"")]
fn given_environment_root(harness: &Harness, root: String) {
    harness.set_env("CUMULUS_ROOT", &root);
}

#[given("the environment overrides the packer to \"{packer}\"")]
fn given_environment_packer(harness: &Harness, packer: String) {
    harness.set_env("CUMULUS_PACKER", &packer);
}

#[when("the CLI sets the root to \"{root}\"")]
fn when_cli_override(harness: &Harness, root: String) {
    harness.push_cli_arg("--root");
    harness.push_cli_arg(OsString::from(&root));
}

#[when("the configuration loads without overrides")]
fn when_load_without_overrides(harness: &Harness) {
    harness.load();
}

#[then("loading the configuration resolves the root to \"{root}\"")]
fn then_resolved_root(harness: &Harness, root: String) {
    let config = harness.loaded_config();
    assert_eq!(config.root(), Utf8Path::new(&root));
}

#[then("loading the configuration selects the \"{packer}\" packer")]
fn then_selected_packer(harness: &Harness, packer: String) {
    let config = harness.loaded_config();
    let expected = match packer.parse::<ArchiveFormat>() {
        Ok(format) => format,
        Err(error) => panic!("invalid expected packer '{packer}': {error}"),
    };
    assert_eq!(config.packer(), expected);
}

#[then("loading the configuration applies the built-in defaults")]
fn then_defaults_applied(harness: &Harness) {
    let config = harness.loaded_config();

    assert_eq!(config.root(), default_root().as_path());
    assert_eq!(config.packer(), default_packer());
    assert_eq!(config.listen(), &default_listen_endpoint());
    assert_eq!(config.log_filter(), default_log_filter());
    assert_eq!(config.log_format(), default_log_format());
}

#[scenario(path = "tests/features/configuration_precedence.feature")]
fn configuration_precedence(#[from(harness)] harness: Harness) {
    let _ = harness;
}
