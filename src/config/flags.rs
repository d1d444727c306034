//! Command-line flags derived from a destination's schema.
//!
//! Every writable field of a supported kind becomes a flag named exactly
//! like the field. Tokens follow the single-dash convention common to
//! small Unix tools (`-Name=value`, `-Name value`, bare `-Flag` for
//! booleans) and are normalized into long options before `clap` sees them.

use clap::parser::ValueSource;
use clap::{Arg, ArgAction, ColorChoice, Command};

use crate::coerce::Kind;
use crate::config::error::LayerError;
use crate::schema::Configurable;

const REST: &str = "__rest";

/// One flag of a [`FlagSet`].
#[derive(Debug, Clone, PartialEq)]
pub struct Flag {
    name: &'static str,
    usage: Option<&'static str>,
    kind: Kind,
    default: String,
    value: Option<String>,
}

impl Flag {
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Help text, taken from the field's tag.
    pub fn usage(&self) -> Option<&'static str> {
        self.usage
    }

    pub fn kind(&self) -> Kind {
        self.kind
    }

    /// The field's value when the set was built, rendered as text.
    pub fn default_value(&self) -> &str {
        &self.default
    }

    /// Value given on the command line, if the flag was set.
    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }
}

/// Flags built from a schema, plus what a parse left behind.
#[derive(Debug, Clone)]
pub struct FlagSet {
    name: String,
    flags: Vec<Flag>,
    args: Vec<String>,
    command: Command,
}

impl FlagSet {
    /// Build one flag per writable field of `destination`. Defaults are
    /// the destination's current values.
    pub fn new<T: Configurable>(name: &str, destination: &mut T) -> Self {
        let mut flags = Vec::new();
        for field in T::schema().fields() {
            let Some(slot) = field.slot(destination) else {
                continue;
            };
            let kind = slot.kind();
            if kind.is_unsupported() {
                continue;
            }
            flags.push(Flag {
                name: field.name(),
                usage: field.tag(),
                kind,
                default: slot.render(),
                value: None,
            });
        }

        let mut command = Command::new(name.to_string())
            .no_binary_name(true)
            .disable_help_flag(true)
            .disable_version_flag(true)
            .args_override_self(true)
            .color(ColorChoice::Never);
        for flag in &flags {
            let mut arg = Arg::new(flag.name)
                .long(flag.name)
                .value_name(flag.kind.to_string())
                .action(ArgAction::Set)
                .num_args(1)
                .require_equals(true)
                .allow_hyphen_values(true);
            if let Some(usage) = flag.usage {
                arg = arg.help(usage);
            }
            if !flag.default.is_empty() {
                arg = arg.default_value(flag.default.clone());
            }
            command = command.arg(arg);
        }
        command = command.arg(Arg::new(REST).num_args(0..).action(ArgAction::Append).hide(true));

        Self {
            name: name.to_string(),
            flags,
            args: Vec::new(),
            command,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Every flag, in declaration order.
    pub fn flags(&self) -> &[Flag] {
        &self.flags
    }

    pub fn lookup(&self, name: &str) -> Option<&Flag> {
        self.flags.iter().find(|f| f.name == name)
    }

    /// Call `visit` for each flag set on the command line, in declaration
    /// order.
    pub fn visit(&self, mut visit: impl FnMut(&Flag)) {
        self.flags.iter().filter(|f| f.value.is_some()).for_each(|f| visit(f));
    }

    /// Tokens left after the flags.
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Rendered help listing every flag with its default.
    pub fn usage(&self) -> String {
        self.command.clone().render_help().to_string()
    }

    /// Parse `tokens`, recording set flags and trailing arguments.
    ///
    /// On failure nothing is recorded.
    pub fn parse(&mut self, tokens: &[String]) -> Result<(), LayerError> {
        let matches = self
            .command
            .clone()
            .try_get_matches_from(self.normalize(tokens))
            .map_err(|err| LayerError::Flags {
                message: clap_message(&err),
            })?;

        for flag in &mut self.flags {
            if matches.value_source(flag.name) == Some(ValueSource::CommandLine) {
                flag.value = matches.try_get_one::<String>(flag.name).ok().flatten().cloned();
            }
        }
        self.args = matches
            .try_get_many::<String>(REST)
            .ok()
            .flatten()
            .map(|values| values.cloned().collect())
            .unwrap_or_default();
        Ok(())
    }

    /// Set flags as a TOML document, one `"Name" = "value"` line each.
    pub fn to_toml(&self) -> String {
        let mut doc = String::new();
        self.visit(|flag| {
            let key = toml::Value::String(flag.name.to_string());
            let value = toml::Value::String(flag.value.clone().unwrap_or_default());
            doc.push_str(&format!("{key} = {value}\n"));
        });
        doc
    }

    /// Rewrite single-dash tokens as `--Name=value` and move everything after
    /// the flags behind a `--` separator.
    fn normalize(&self, tokens: &[String]) -> Vec<String> {
        let mut out = Vec::with_capacity(tokens.len() + 1);
        let mut rest = tokens.iter();
        let mut positional = Vec::new();

        while let Some(token) = rest.next() {
            if token == "--" {
                break;
            }
            let Some(body) = flag_body(token) else {
                positional.push(token.clone());
                break;
            };
            if body.contains('=') {
                out.push(format!("--{body}"));
                continue;
            }
            match self.lookup(body) {
                Some(flag) if flag.kind.is_bool() => out.push(format!("--{body}=true")),
                Some(_) => match rest.next() {
                    Some(value) => out.push(format!("--{body}={value}")),
                    None => out.push(format!("--{body}")),
                },
                None => out.push(format!("--{body}")),
            }
        }

        positional.extend(rest.cloned());
        if !positional.is_empty() {
            out.push("--".to_string());
            out.extend(positional);
        }
        out
    }
}

/// The flag text after its dashes, or `None` for a positional token.
fn flag_body(token: &str) -> Option<&str> {
    if token.len() < 2 || !token.starts_with('-') {
        return None;
    }
    token.strip_prefix("--").or_else(|| token.strip_prefix('-'))
}

fn clap_message(err: &clap::Error) -> String {
    let rendered = err.to_string();
    let first = rendered.lines().next().unwrap_or_default();
    first.strip_prefix("error: ").unwrap_or(first).to_string()
}
