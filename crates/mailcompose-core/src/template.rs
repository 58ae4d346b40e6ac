//! HTML layout template.
//!
//! Layouts are `minijinja` templates whose slots are plain variables:
//!
//! ```text
//! <div class="body">{{ body }}</div>
//! ```
//!
//! Values are inserted without escaping since they are already HTML. Every
//! variable the layout references must be supplied; a missing one is an
//! error rather than an empty slot.

use std::collections::HashMap;
use std::path::Path;

use minijinja::{AutoEscape, Environment, UndefinedBehavior};
use tracing::debug;

use crate::error::{Error, Result};

/// Layout shipped with the crate, with `header`, `body` and `footer` slots.
const DEFAULT_LAYOUT: &str = include_str!("../templates/layout.html");

/// Name the layout is registered under in the environment.
const LAYOUT_NAME: &str = "layout";

/// An HTML layout with placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    source: String,
}

impl Default for Template {
    fn default() -> Self {
        Self::default_layout()
    }
}

impl Template {
    /// Creates a template from source text.
    ///
    /// Syntax errors are reported by [`Template::substitute`] and
    /// [`Template::placeholders`].
    #[must_use]
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
        }
    }

    /// Returns the built-in message layout.
    #[must_use]
    pub fn default_layout() -> Self {
        Self::new(DEFAULT_LAYOUT)
    }

    /// Reads a template from a file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)?;
        debug!(?path, "loaded template");
        Ok(Self::new(source))
    }

    /// Returns the template source.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    fn environment(&self) -> Result<Environment<'_>> {
        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        env.set_auto_escape_callback(|_| AutoEscape::None);
        env.set_keep_trailing_newline(true);
        env.add_template(LAYOUT_NAME, &self.source)?;
        Ok(env)
    }

    /// Lists the variables the layout reads, sorted by name.
    ///
    /// # Errors
    ///
    /// Returns an error if the template does not parse.
    pub fn placeholders(&self) -> Result<Vec<String>> {
        let env = self.environment()?;
        let mut names: Vec<String> = env
            .get_template(LAYOUT_NAME)?
            .undeclared_variables(false)
            .into_iter()
            .collect();
        names.sort();
        Ok(names)
    }

    /// Renders the layout with the given slot values.
    ///
    /// Values not referenced by the template are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownPlaceholder`] if the layout reads a variable
    /// missing from `values`, or [`Error::Template`] if it fails to parse or
    /// render.
    pub fn substitute<V: AsRef<str>>(&self, values: &HashMap<&str, V>) -> Result<String> {
        let env = self.environment()?;
        let template = env.get_template(LAYOUT_NAME)?;

        let mut missing: Vec<String> = template
            .undeclared_variables(false)
            .into_iter()
            .filter(|name| !values.contains_key(name.as_str()))
            .collect();
        missing.sort();
        if let Some(name) = missing.into_iter().next() {
            return Err(Error::UnknownPlaceholder { name });
        }

        let context: HashMap<&str, &str> = values
            .iter()
            .map(|(name, value)| (*name, value.as_ref()))
            .collect();
        Ok(template.render(context)?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::needless_collect)]
mod tests {
    use super::*;

    fn values<'a>(pairs: &[(&'a str, &'a str)]) -> HashMap<&'a str, &'a str> {
        pairs.iter().copied().collect()
    }

    #[test]
    fn test_simple_substitution() {
        let template = Template::new("Hello, {{ name }}!");
        let out = template.substitute(&values(&[("name", "World")])).unwrap();
        assert_eq!(out, "Hello, World!");
    }

    #[test]
    fn test_html_values_not_escaped() {
        let template = Template::new("<main>{{ body }}</main>");
        let out = template
            .substitute(&values(&[("body", "<p>a & \"b\"</p>")]))
            .unwrap();
        assert_eq!(out, "<main><p>a & \"b\"</p></main>");
    }

    #[test]
    fn test_values_not_rescanned() {
        let template = Template::new("<p>{{ body }}</p>");
        let out = template
            .substitute(&values(&[("body", "costs {{ x }} and $y")]))
            .unwrap();
        assert_eq!(out, "<p>costs {{ x }} and $y</p>");
    }

    #[test]
    fn test_dollar_is_literal() {
        let template = Template::new("Price: $5 for {{ item }}");
        let out = template.substitute(&values(&[("item", "tea")])).unwrap();
        assert_eq!(out, "Price: $5 for tea");
    }

    #[test]
    fn test_unknown_placeholder() {
        let template = Template::new("<p>{{ body }}</p><p>{{ sidebar }}</p>");
        let err = template
            .substitute(&values(&[("body", "text")]))
            .unwrap_err();
        match err {
            Error::UnknownPlaceholder { name } => assert_eq!(name, "sidebar"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_strict_undefined_attribute() {
        let template = Template::new("{{ body.missing }}");
        let err = template
            .substitute(&values(&[("body", "text")]))
            .unwrap_err();
        assert!(matches!(err, Error::Template(_)));
    }

    #[test]
    fn test_syntax_errors() {
        for source in ["{{ body ", "{% if %}", "{{ }}"] {
            let err = Template::new(source)
                .substitute(&HashMap::<&str, &str>::new())
                .unwrap_err();
            match err {
                Error::Template(e) => {
                    assert_eq!(e.kind(), minijinja::ErrorKind::SyntaxError, "{source}");
                }
                other => panic!("unexpected error for {source:?}: {other}"),
            }
            assert!(Template::new(source).placeholders().is_err());
        }
    }

    #[test]
    fn test_unused_values_ignored() {
        let template = Template::new("static");
        let out = template.substitute(&values(&[("body", "x")])).unwrap();
        assert_eq!(out, "static");
    }

    #[test]
    fn test_trailing_newline_kept() {
        let template = Template::new("{{ body }}\n");
        let out = template.substitute(&values(&[("body", "x")])).unwrap();
        assert_eq!(out, "x\n");
    }

    #[test]
    fn test_placeholders() {
        let template = Template::new("{{ b }} {{ a }} {% if c %}{{ a }}{% endif %}");
        assert_eq!(template.placeholders().unwrap(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_default_layout_slots() {
        let layout = Template::default_layout();
        assert_eq!(
            layout.placeholders().unwrap(),
            vec!["body", "footer", "header"]
        );

        let out = layout
            .substitute(&values(&[
                ("header", "<h1>Hi</h1>"),
                ("body", "<p>Main</p>"),
                ("footer", "<small>Bye</small>"),
            ]))
            .unwrap();
        assert!(out.starts_with("<!DOCTYPE html>"));
        let header = out.find("<h1>Hi</h1>").unwrap();
        let body = out.find("<p>Main</p>").unwrap();
        let footer = out.find("<small>Bye</small>").unwrap();
        assert!(header < body && body < footer);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("layout.html");
        std::fs::write(&path, "<main>{{ body }}</main>").unwrap();

        let template = Template::load(&path).unwrap();
        assert_eq!(template.source(), "<main>{{ body }}</main>");
        assert!(Template::load(dir.path().join("missing.html")).is_err());
    }
}
