use serde::Deserialize;

/// A shell-free command template: whitespace-split argv elements with
/// `{path}` and `{params}` placeholders.
///
/// Rendering substitutes into each element separately, so a generated
/// source path containing shell metacharacters stays a single opaque
/// argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandTemplate {
    argv: Vec<String>,
}

impl CommandTemplate {
    pub fn parse(template: &str) -> Self {
        CommandTemplate {
            argv: template.split_whitespace().map(str::to_string).collect(),
        }
    }

    /// Substitute `{path}` and `{params}` into every element. Elements that
    /// render to the empty string (a `{params}` placeholder with no query)
    /// are dropped rather than passed as empty arguments.
    pub fn render(&self, path: &str, params: &str) -> Vec<String> {
        self.argv
            .iter()
            .map(|arg| arg.replace("{path}", path).replace("{params}", params))
            .filter(|arg| !arg.is_empty())
            .collect()
    }
}

/// Named sets of mode hooks. A hook looks up a mode name and emits entry
/// point boilerplate for the names it recognizes; anything else is a
/// silent no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ModeHooks {
    #[default]
    None,
    /// `main` wraps the body in `int main() { ... }`.
    CMain,
    /// `main` wraps the body in `fn main() { ... }`.
    RustMain,
}

impl ModeHooks {
    /// Preamble emitted for `mode`, if recognized.
    pub fn opening(&self, mode: &str) -> Option<&'static str> {
        match (self, mode) {
            (ModeHooks::CMain, "main") => Some("int main() {\n"),
            (ModeHooks::RustMain, "main") => Some("fn main() {\n"),
            _ => None,
        }
    }

    /// Postamble emitted for `mode`, if recognized.
    pub fn closing(&self, mode: &str) -> Option<&'static str> {
        match (self, mode) {
            (ModeHooks::CMain, "main") | (ModeHooks::RustMain, "main") => Some("\n}\n"),
            _ => None,
        }
    }
}

/// An immutable language descriptor. Constructed at startup, never mutated.
#[derive(Debug, Clone)]
pub struct Language {
    /// The tag written in block headers, usually the file extension.
    pub tag: String,
    /// Boilerplate written before the block body.
    pub opening: Option<String>,
    /// Boilerplate written after the body and mode postambles.
    pub closing: Option<String>,
    /// Toolchain invocation run before execution, if the language compiles.
    pub compile: Option<CommandTemplate>,
    /// Invocation that runs the artifact and produces the spliced output.
    pub execute: CommandTemplate,
    /// Extension of the produced artifact, appended to the source path.
    /// Empty for interpreted languages whose source is the artifact.
    pub output_extension: String,
    pub hooks: ModeHooks,
}

/// Deserialized form of one `[[language]]` table in a languages file.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct LanguageConfig {
    tag: String,
    #[serde(default)]
    opening: Option<String>,
    #[serde(default)]
    closing: Option<String>,
    #[serde(default)]
    compile: Option<String>,
    execute: String,
    #[serde(default)]
    output_extension: String,
    #[serde(default)]
    hooks: ModeHooks,
}

#[derive(Debug, Deserialize)]
struct LanguagesFile {
    #[serde(default)]
    language: Vec<LanguageConfig>,
}

impl From<LanguageConfig> for Language {
    fn from(config: LanguageConfig) -> Self {
        Language {
            tag: config.tag,
            opening: config.opening,
            closing: config.closing,
            compile: config.compile.as_deref().map(CommandTemplate::parse),
            execute: CommandTemplate::parse(&config.execute),
            output_extension: config.output_extension,
            hooks: config.hooks,
        }
    }
}

/// Registry of all known languages. Lookup is a linear scan; the set is
/// small and fixed after startup.
#[derive(Debug, Clone)]
pub struct LanguageRegistry {
    languages: Vec<Language>,
}

impl LanguageRegistry {
    pub fn empty() -> Self {
        LanguageRegistry {
            languages: Vec::new(),
        }
    }

    /// The builtin table: C, C++, Python and Rust.
    pub fn builtin() -> Self {
        let mut registry = LanguageRegistry::empty();

        registry.register(Language {
            tag: "c".to_string(),
            opening: None,
            closing: None,
            compile: Some(CommandTemplate::parse(
                "gcc -include stdio.h -o {path}.out {path}",
            )),
            execute: CommandTemplate::parse("{path}.out {params}"),
            output_extension: ".out".to_string(),
            hooks: ModeHooks::CMain,
        });
        registry.register(Language {
            tag: "cpp".to_string(),
            opening: None,
            closing: None,
            compile: Some(CommandTemplate::parse(
                "g++ -include stdio.h -include iostream -o {path}.out {path}",
            )),
            execute: CommandTemplate::parse("{path}.out {params}"),
            output_extension: ".out".to_string(),
            hooks: ModeHooks::CMain,
        });
        registry.register(Language {
            tag: "py".to_string(),
            opening: None,
            closing: None,
            compile: None,
            execute: CommandTemplate::parse("python {path} {params}"),
            output_extension: String::new(),
            hooks: ModeHooks::None,
        });
        registry.register(Language {
            tag: "rs".to_string(),
            opening: None,
            closing: None,
            compile: Some(CommandTemplate::parse(
                "rustc -o {path}.out --crate-name csp_rs {path}",
            )),
            execute: CommandTemplate::parse("{path}.out {params}"),
            output_extension: ".out".to_string(),
            hooks: ModeHooks::RustMain,
        });

        registry
    }

    /// Add a language, replacing any existing descriptor with the same tag
    /// so there is exactly one descriptor per tag.
    pub fn register(&mut self, language: Language) {
        if let Some(existing) = self.languages.iter_mut().find(|l| l.tag == language.tag) {
            *existing = language;
        } else {
            self.languages.push(language);
        }
    }

    /// Exact-match lookup.
    pub fn resolve(&self, tag: &str) -> Option<&Language> {
        self.languages.iter().find(|l| l.tag == tag)
    }

    /// All registered tags, in registration order.
    pub fn tags(&self) -> Vec<&str> {
        self.languages.iter().map(|l| l.tag.as_str()).collect()
    }

    /// Register every `[[language]]` table from a TOML languages file.
    /// Returns the number of languages added or replaced.
    pub fn extend_from_toml(&mut self, text: &str) -> Result<usize, toml::de::Error> {
        let file: LanguagesFile = toml::from_str(text)?;
        let count = file.language.len();
        for config in file.language {
            self.register(config.into());
        }
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_tags_resolve() {
        let registry = LanguageRegistry::builtin();
        for tag in ["c", "cpp", "py", "rs"] {
            assert!(registry.resolve(tag).is_some(), "missing builtin {}", tag);
        }
        assert!(registry.resolve("cobol").is_none());
    }

    #[test]
    fn register_replaces_same_tag() {
        let mut registry = LanguageRegistry::builtin();
        let before = registry.tags().len();
        registry.register(Language {
            tag: "py".to_string(),
            opening: None,
            closing: None,
            compile: None,
            execute: CommandTemplate::parse("python3 {path}"),
            output_extension: String::new(),
            hooks: ModeHooks::None,
        });
        assert_eq!(registry.tags().len(), before);
        let py = registry.resolve("py").unwrap();
        assert_eq!(py.execute, CommandTemplate::parse("python3 {path}"));
    }

    #[test]
    fn template_substitutes_path_and_params() {
        let template = CommandTemplate::parse("cc -o {path}.out {path} {params}");
        assert_eq!(
            template.render("out/doc0.c", "a=1"),
            vec!["cc", "-o", "out/doc0.c.out", "out/doc0.c", "a=1"]
        );
    }

    #[test]
    fn empty_params_placeholder_is_dropped() {
        let template = CommandTemplate::parse("sh {path} {params}");
        assert_eq!(template.render("s.sh", ""), vec!["sh", "s.sh"]);
    }

    #[test]
    fn path_with_metacharacters_stays_one_argument() {
        let template = CommandTemplate::parse("python {path}");
        let argv = template.render("out/a b;$(x).py", "");
        assert_eq!(argv, vec!["python", "out/a b;$(x).py"]);
    }

    #[test]
    fn c_main_hook_wraps_only_main() {
        assert_eq!(ModeHooks::CMain.opening("main"), Some("int main() {\n"));
        assert_eq!(ModeHooks::CMain.closing("main"), Some("\n}\n"));
        assert_eq!(ModeHooks::CMain.opening("other"), None);
        assert_eq!(ModeHooks::None.opening("main"), None);
    }

    #[test]
    fn languages_file_extends_registry() {
        let mut registry = LanguageRegistry::builtin();
        let added = registry
            .extend_from_toml(
                r#"
                [[language]]
                tag = "sh"
                execute = "sh {path} {params}"

                [[language]]
                tag = "zig"
                compile = "zig build-exe -femit-bin={path}.out {path}"
                execute = "{path}.out"
                output-extension = ".out"
                hooks = "c-main"
                "#,
            )
            .unwrap();
        assert_eq!(added, 2);

        let sh = registry.resolve("sh").unwrap();
        assert!(sh.compile.is_none());
        assert_eq!(sh.output_extension, "");

        let zig = registry.resolve("zig").unwrap();
        assert_eq!(zig.hooks, ModeHooks::CMain);
    }

    #[test]
    fn languages_file_rejects_unknown_keys() {
        let mut registry = LanguageRegistry::empty();
        let result = registry.extend_from_toml(
            r#"
            [[language]]
            tag = "sh"
            execute = "sh {path}"
            timeout = 5
            "#,
        );
        assert!(result.is_err());
    }
}
