//! Layered configuration loading.
//!
//! Priority (highest to lowest):
//! 1. Command-line tokens
//! 2. An explicit config file
//! 3. `~/.config/<app>/<name>` in the user's home
//! 4. Whatever the destination held before loading
//!
//! A failing layer never stops the later ones; every failure is collected
//! into [`LoadError::Layers`].

use std::path::{Path, PathBuf};

use crate::config::decoder::{Decoder, TomlDecoder};
use crate::config::error::{Layer, LayerError, LayerErrors, LoadError};
use crate::config::flags::FlagSet;
use crate::config::report::{ConsoleReporter, Reporter, Silent};
use crate::constants::CONFIG_DIR;
use crate::env::Env;
use crate::paths;
use crate::schema::Configurable;

/// Builder for one layered load.
#[derive(Debug, Clone)]
pub struct Loader<D = TomlDecoder> {
    app_name: String,
    home_config: Option<String>,
    config_path: Option<PathBuf>,
    cmd_line: Option<Vec<String>>,
    verbose: bool,
    env: Env,
    decoder: D,
}

impl Loader<TomlDecoder> {
    /// Start a load for `app_name`, which names the directory under
    /// `~/.config` holding the home config. No layer is enabled yet.
    pub fn new(app_name: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
            home_config: None,
            config_path: None,
            cmd_line: None,
            verbose: false,
            env: Env::real(),
            decoder: TomlDecoder,
        }
    }
}

impl<D: Decoder> Loader<D> {
    /// Read `~/.config/<app>/<name>` as the lowest layer.
    pub fn home_config(mut self, name: impl Into<String>) -> Self {
        self.home_config = Some(name.into()).filter(|n: &String| !n.is_empty());
        self
    }

    /// Read `path` over the home config. `~` is expanded.
    pub fn config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_path = Some(path.into()).filter(|p: &PathBuf| !p.as_os_str().is_empty());
        self
    }

    /// Apply `tokens` as flags over both files. An empty list still builds
    /// the flag set.
    pub fn cmd_line<I, S>(mut self, tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.cmd_line = Some(tokens.into_iter().map(Into::into).collect());
        self
    }

    /// Report progress on the console.
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn env(mut self, env: Env) -> Self {
        self.env = env;
        self
    }

    /// Swap the decoder used for every layer.
    pub fn decoder<E: Decoder>(self, decoder: E) -> Loader<E> {
        Loader {
            app_name: self.app_name,
            home_config: self.home_config,
            config_path: self.config_path,
            cmd_line: self.cmd_line,
            verbose: self.verbose,
            env: self.env,
            decoder,
        }
    }

    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    /// Where the home layer is looked for, before `~` expansion.
    pub fn home_config_path(&self) -> Option<PathBuf> {
        self.home_config
            .as_ref()
            .map(|name| Path::new("~").join(CONFIG_DIR).join(&self.app_name).join(name))
    }

    /// Fill `destination` from every configured layer.
    pub fn load<T: Configurable>(&self, destination: &mut T) -> Result<(), LoadError> {
        self.load_with_flags(destination).1
    }

    /// Like [`load`](Self::load), also returning the flag set when
    /// command-line tokens were given, even if they failed to parse.
    pub fn load_with_flags<T: Configurable>(
        &self,
        destination: &mut T,
    ) -> (Option<FlagSet>, Result<(), LoadError>) {
        if self.verbose {
            self.load_with_reporter(destination, &mut ConsoleReporter)
        } else {
            self.load_with_reporter(destination, &mut Silent)
        }
    }

    /// Like [`load_with_flags`](Self::load_with_flags) with progress sent to
    /// `reporter` regardless of [`verbose`](Self::verbose).
    pub fn load_with_reporter<T: Configurable>(
        &self,
        destination: &mut T,
        reporter: &mut dyn Reporter,
    ) -> (Option<FlagSet>, Result<(), LoadError>) {
        if let Err(err) = T::schema().require_struct() {
            return (None, Err(err.into()));
        }

        let mut errors = Vec::new();

        if let Some(path) = self.home_config_path() {
            self.load_file(Layer::Home, &path, destination, reporter, &mut errors);
        }
        if let Some(path) = &self.config_path {
            self.load_file(Layer::File, path, destination, reporter, &mut errors);
        }

        let flags = self.cmd_line.as_ref().map(|tokens| {
            let mut flags = FlagSet::new(&self.app_name, destination);
            tracing::debug!(app = %self.app_name, tokens = tokens.len(), "parsing command line");
            let result = flags.parse(tokens).and_then(|()| {
                let doc = flags.to_toml();
                if doc.is_empty() {
                    return Ok(());
                }
                self.decoder
                    .decode_text(&doc, destination)
                    .map_err(LayerError::CommandLine)
            });
            if let Err(err) = result {
                record(err, reporter, &mut errors);
            }
            flags
        });

        let result = if errors.is_empty() {
            Ok(())
        } else {
            Err(LoadError::Layers(LayerErrors(errors)))
        };
        (flags, result)
    }

    fn load_file<T: Configurable>(
        &self,
        layer: Layer,
        raw: &Path,
        destination: &mut T,
        reporter: &mut dyn Reporter,
        errors: &mut Vec<LayerError>,
    ) {
        let path = match paths::normalize_path_with(raw, &self.env) {
            Ok(path) if paths::exists_with(&path, &self.env) => path,
            Ok(path) => {
                tracing::debug!(%layer, path = %path.display(), "config file not found");
                reporter.error(&format!("Config file '{}' not found", path.display()));
                return;
            }
            Err(err) => {
                tracing::debug!(
                    %layer,
                    path = %raw.display(),
                    error = %err,
                    "config path not resolved"
                );
                reporter.error(&format!("Config file '{}' not found", raw.display()));
                return;
            }
        };

        tracing::debug!(%layer, path = %path.display(), "loading config");
        reporter.info(&format!("Loading config from '{}'", path.display()));
        if let Err(source) = self.decoder.decode_file(&path, destination) {
            record(LayerError::File { layer, path, source }, reporter, errors);
        }
    }
}

fn record(err: LayerError, reporter: &mut dyn Reporter, errors: &mut Vec<LayerError>) {
    tracing::warn!(layer = %err.layer(), error = %err, "config layer failed");
    reporter.error(&err.to_string());
    errors.push(err);
}

/// File name of the running executable, the conventional application name.
pub fn default_app_name() -> Option<String> {
    let arg0 = std::env::args_os().next()?;
    Path::new(&arg0)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
}

#[cfg(test)]
mod tests {
    use std::sync::LazyLock;

    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    use super::*;
    use crate::coerce::AsSlot;
    use crate::config::report::{Level, MemoryReporter};
    use crate::env::HOME_VAR;
    use crate::schema::Schema;

    #[derive(Debug, Default, PartialEq)]
    struct Settings {
        x: i64,
        name: String,
        debug: bool,
    }

    impl Configurable for Settings {
        fn schema() -> &'static Schema<Self> {
            static SCHEMA: LazyLock<Schema<Settings>> = LazyLock::new(|| {
                Schema::<Settings>::structure()
                    .field("x", |s| s.x.as_slot())
                    .field("name", |s| s.name.as_slot())
                    .tag("display name")
                    .field("debug", |s| s.debug.as_slot())
            });
            &SCHEMA
        }
    }

    /// A fake home holding `~/.config/app/config.toml` with `contents`.
    fn home_with(contents: &str) -> (TempDir, Env) {
        let home = tempfile::tempdir().unwrap();
        let dir = home.path().join(CONFIG_DIR).join("app");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("config.toml"), contents).unwrap();
        let env = Env::fixed([(HOME_VAR, home.path().to_string_lossy().into_owned())]);
        (home, env)
    }

    #[test]
    fn later_layers_override_earlier_ones() {
        let (home, env) = home_with("x = 1\nname = \"home\"\n");
        let explicit = home.path().join("explicit.toml");
        std::fs::write(&explicit, "x = 2\n").unwrap();

        let mut settings = Settings::default();
        let (flags, result) = Loader::new("app")
            .env(env)
            .home_config("config.toml")
            .config_path(&explicit)
            .cmd_line(["-x=3"])
            .load_with_flags(&mut settings);

        result.unwrap();
        assert_eq!(
            settings,
            Settings {
                x: 3,
                name: "home".to_string(),
                debug: false,
            }
        );
        let flags = flags.unwrap();
        assert_eq!(flags.lookup("x").unwrap().value(), Some("3"));
        assert_eq!(flags.lookup("x").unwrap().default_value(), "2");
    }

    #[test]
    fn missing_files_are_not_errors() {
        let home = tempfile::tempdir().unwrap();
        let env = Env::fixed([(HOME_VAR, home.path().to_string_lossy().into_owned())]);
        let mut settings = Settings { x: 9, ..Settings::default() };
        let mut reporter = MemoryReporter::new();

        let (flags, result) = Loader::new("app")
            .env(env)
            .home_config("config.toml")
            .config_path(home.path().join("nope.toml"))
            .load_with_reporter(&mut settings, &mut reporter);

        result.unwrap();
        assert!(flags.is_none());
        assert_eq!(settings.x, 9);
        let missing = reporter.at(Level::Error);
        assert_eq!(missing.len(), 2);
        assert!(missing.iter().all(|line| line.ends_with("' not found")));
        assert!(reporter.at(Level::Info).is_empty());
    }

    #[test]
    fn verbose_lines_name_each_loaded_file() {
        let (home, env) = home_with("x = 1\n");
        let mut reporter = MemoryReporter::new();
        let (_, result) = Loader::new("app")
            .env(env)
            .home_config("config.toml")
            .load_with_reporter(&mut Settings::default(), &mut reporter);
        result.unwrap();

        let expected = home.path().join(".config/app/config.toml");
        assert_eq!(
            reporter.at(Level::Info),
            vec![format!("Loading config from '{}'", expected.display())]
        );
    }

    #[test]
    fn failures_from_every_layer_are_collected() {
        let (home, env) = home_with("x = \"not a number\"\n");
        let explicit = home.path().join("broken.toml");
        std::fs::write(&explicit, "x = = 1").unwrap();

        let mut settings = Settings::default();
        let err = Loader::new("app")
            .env(env)
            .home_config("config.toml")
            .config_path(&explicit)
            .cmd_line(["-name=cli", "-nope=1"])
            .load(&mut settings)
            .unwrap_err();

        let layers: Vec<Layer> = err.layers().iter().map(LayerError::layer).collect();
        assert_eq!(layers, vec![Layer::Home, Layer::File, Layer::CommandLine]);
        assert!(err.to_string().starts_with("error parsing config file '"));
        assert!(err.to_string().contains("\nerror parsing command line:\n"));
        assert_eq!(settings.name, "", "a failed flag parse applies nothing");
    }

    #[test]
    fn flag_values_that_fail_coercion_are_reported() {
        let mut settings = Settings::default();
        let err = Loader::new("app")
            .env(Env::fixed(Vec::<(&str, &str)>::new()))
            .cmd_line(["-x=ten", "-name=cli"])
            .load(&mut settings)
            .unwrap_err();
        assert!(matches!(err.layers(), [LayerError::CommandLine(_)]));
        assert_eq!(settings.name, "cli");
    }

    #[test]
    fn empty_token_list_still_builds_flags() {
        let mut settings = Settings::default();
        let (flags, result) = Loader::new("app")
            .cmd_line(Vec::<String>::new())
            .load_with_flags(&mut settings);
        result.unwrap();
        let flags = flags.unwrap();
        assert_eq!(flags.flags().len(), 3);
        assert_eq!(flags.lookup("name").unwrap().usage(), Some("display name"));
        assert!(flags.args().is_empty());
    }

    #[test]
    fn positional_arguments_are_kept() {
        let mut settings = Settings::default();
        let (flags, result) = Loader::new("app")
            .cmd_line(["-debug", "input.txt", "-x=5"])
            .load_with_flags(&mut settings);
        result.unwrap();
        assert!(settings.debug);
        assert_eq!(settings.x, 0);
        assert_eq!(
            flags.unwrap().args().to_vec(),
            vec!["input.txt".to_string(), "-x=5".to_string()]
        );
    }

    #[test]
    fn scalar_destination_is_rejected_before_any_layer() {
        let (_home, env) = home_with("x = 1\n");
        let mut reporter = MemoryReporter::new();
        let mut n = 0i32;
        let (flags, result) = Loader::new("app")
            .env(env)
            .home_config("config.toml")
            .cmd_line(["-x=1"])
            .load_with_reporter(&mut n, &mut reporter);
        assert!(matches!(result, Err(LoadError::InvalidDestination(_))));
        assert!(flags.is_none());
        assert!(reporter.lines.is_empty());
    }

    #[test]
    fn empty_names_disable_file_layers() {
        let loader = Loader::new("app").home_config("").config_path("");
        assert_eq!(loader.home_config_path(), None);
        let mut reporter = MemoryReporter::new();
        let (_, result) = loader.load_with_reporter(&mut Settings::default(), &mut reporter);
        result.unwrap();
        assert!(reporter.lines.is_empty());
    }

    #[test]
    fn app_name_comes_from_the_executable() {
        let name = default_app_name().unwrap();
        assert!(!name.contains('/'));
    }
}
