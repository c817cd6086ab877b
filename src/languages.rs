//! Toolchain configuration for building and running a solution

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::Context;
use serde::Deserialize;

use crate::engine::classifier::Runtime;
use crate::engine::diagnostics::DiagnosticStyle;
use crate::runner::CommandSpec;

/// Configuration for a supported language
#[derive(Debug, Clone)]
pub struct LanguageConfig {
    /// Canonical name (table key in languages.toml)
    pub name: String,
    /// Source file extensions, lowercase, without the dot
    pub extensions: Vec<String>,
    /// Compile command template (None for interpreted languages)
    pub compile_command: Option<Vec<String>>,
    /// Run command template
    pub run_command: Vec<String>,
    /// How the compiler lays out its errors
    pub diagnostics: DiagnosticStyle,
    /// Which crash markers apply to the running program
    pub runtime: Runtime,
}

/// Concrete paths substituted into command templates
#[derive(Debug, Clone)]
pub struct BuildContext {
    pub source: PathBuf,
    pub binary: PathBuf,
    pub output_dir: PathBuf,
    pub entry: String,
}

impl BuildContext {
    /// Artifact lives in `output_dir`; the entry point is the source file stem
    pub fn new(source: impl AsRef<Path>, output_dir: impl AsRef<Path>) -> Self {
        let source = source.as_ref().to_path_buf();
        let output_dir = output_dir.as_ref().to_path_buf();
        let entry = source
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        Self {
            binary: output_dir.join("solution"),
            source,
            output_dir,
            entry,
        }
    }

    fn expand(&self, word: &str) -> String {
        word.replace("{source}", &self.source.to_string_lossy())
            .replace("{binary}", &self.binary.to_string_lossy())
            .replace("{output_dir}", &self.output_dir.to_string_lossy())
            .replace("{entry}", &self.entry)
    }

    pub fn render(&self, template: &[String]) -> CommandSpec {
        let words: Vec<String> = template.iter().map(|w| self.expand(w)).collect();
        CommandSpec::from_vec(&words)
    }
}

impl LanguageConfig {
    pub fn compile_spec(&self, ctx: &BuildContext) -> Option<CommandSpec> {
        self.compile_command.as_ref().map(|cmd| ctx.render(cmd))
    }

    pub fn run_spec(&self, ctx: &BuildContext) -> CommandSpec {
        ctx.render(&self.run_command)
    }
}

/// Raw TOML configuration for a language
#[derive(Debug, Deserialize)]
struct RawLanguageConfig {
    #[serde(default)]
    extensions: Vec<String>,
    compile_command: Option<String>,
    run_command: String,
    #[serde(default)]
    diagnostics: DiagnosticStyle,
    #[serde(default)]
    runtime: Runtime,
    #[serde(default)]
    aliases: Vec<String>,
}

/// Global language configurations
static LANGUAGES: OnceLock<HashMap<String, LanguageConfig>> = OnceLock::new();

/// Initialize language configurations from the embedded TOML table
pub fn init_languages() -> anyhow::Result<()> {
    let content = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/files/languages.toml"));
    let languages = parse_languages(content)?;

    LANGUAGES
        .set(languages)
        .map_err(|_| anyhow::anyhow!("Languages already initialized"))?;

    Ok(())
}

fn parse_languages(content: &str) -> anyhow::Result<HashMap<String, LanguageConfig>> {
    let raw_configs: HashMap<String, RawLanguageConfig> =
        toml::from_str(content).context("Invalid language table")?;

    let mut languages = HashMap::new();

    for (name, raw) in raw_configs {
        let run_command = into_command(&raw.run_command);
        if run_command.is_empty() {
            anyhow::bail!("Empty run command for {}", name);
        }

        let config = LanguageConfig {
            name: name.to_lowercase(),
            extensions: raw.extensions.iter().map(|e| e.to_lowercase()).collect(),
            compile_command: raw
                .compile_command
                .map(|cmd| into_command(&cmd))
                .filter(|cmd| !cmd.is_empty()),
            run_command,
            diagnostics: raw.diagnostics,
            runtime: raw.runtime,
        };

        // Add main language name
        languages.insert(name.to_lowercase(), config.clone());

        // Add aliases
        for alias in raw.aliases {
            languages.insert(alias.to_lowercase(), config.clone());
        }
    }

    Ok(languages)
}

/// Get language configuration by language name
pub fn get_language_config(language: &str) -> Option<LanguageConfig> {
    LANGUAGES.get()?.get(&language.to_lowercase()).cloned()
}

/// Detect the language from a source file's extension
pub fn detect_language(source: &Path) -> Option<LanguageConfig> {
    let languages = LANGUAGES.get()?;
    lookup_extension(languages, source)
}

fn lookup_extension(
    languages: &HashMap<String, LanguageConfig>,
    source: &Path,
) -> Option<LanguageConfig> {
    let ext = source.extension()?.to_string_lossy().to_lowercase();
    languages
        .values()
        .find(|config| config.extensions.iter().any(|e| *e == ext))
        .cloned()
}

fn into_command(command: &str) -> Vec<String> {
    command.split_whitespace().map(|s| s.to_string()).collect()
}
