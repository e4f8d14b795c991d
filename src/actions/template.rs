// src/actions/template.rs

//! Command templates with `{placeholder}` substitution.
//!
//! Values are shell-quoted. Unknown placeholders and `${...}` shell
//! expansions are left untouched.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::config::model::ProjectSection;

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\$?)\{([A-Za-z_][A-Za-z0-9_.]*)\}").expect("placeholder pattern is valid")
});

#[derive(Debug, Clone)]
enum Value {
    One(String),
    /// Each element quoted separately, joined by spaces.
    Many(Vec<String>),
}

/// Values for one rendering.
#[derive(Debug, Clone, Default)]
pub struct Vars {
    values: BTreeMap<&'static str, Value>,
}

impl Vars {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, key: &'static str, value: impl Into<String>) -> Self {
        self.values.insert(key, Value::One(value.into()));
        self
    }

    pub fn set_path(self, key: &'static str, path: &Path) -> Self {
        self.set(key, path.to_string_lossy().into_owned())
    }

    pub fn set_list(mut self, key: &'static str, values: &[String]) -> Self {
        self.values.insert(key, Value::Many(values.to_vec()));
        self
    }
}

/// A command line with placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    source: String,
}

impl Template {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Substitute `vars`, then project keys (`{name}`, `{domain}`,
    /// `{local_url}`, `{project.<key>}`).
    pub fn render(&self, vars: &Vars, project: &ProjectSection) -> String {
        PLACEHOLDER
            .replace_all(&self.source, |caps: &Captures<'_>| {
                let whole = &caps[0];
                if !caps[1].is_empty() {
                    return whole.to_string();
                }
                let key = &caps[2];
                match lookup(key, vars, project) {
                    Some(rendered) => rendered,
                    None => whole.to_string(),
                }
            })
            .into_owned()
    }
}

fn lookup(key: &str, vars: &Vars, project: &ProjectSection) -> Option<String> {
    if let Some(value) = vars.values.get(key) {
        return Some(match value {
            Value::One(v) => quote(v),
            Value::Many(list) => list.iter().map(|v| quote(v)).collect::<Vec<_>>().join(" "),
        });
    }
    let project_key = match key {
        "name" | "domain" | "local_url" => key,
        other => other.strip_prefix("project.")?,
    };
    project.get(project_key).map(|v| quote(&v))
}

fn quote(value: &str) -> String {
    shell_escape::escape(Cow::Borrowed(value)).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project() -> ProjectSection {
        ProjectSection {
            name: "mysite".into(),
            domain: "www.mysite.com".into(),
            ..ProjectSection::default()
        }
    }

    #[test]
    fn substitutes_and_quotes() {
        let t = Template::new("sass {input} {output} --site {local_url}");
        let vars = Vars::new()
            .set("input", "src/main.scss")
            .set("output", "out dir/main.css");
        let rendered = t.render(&vars, &project());
        assert_eq!(
            rendered,
            "sass src/main.scss 'out dir/main.css' --site 'http://mysite.test'"
        );
    }

    #[test]
    fn lists_are_space_joined() {
        let t = Template::new("purgecss --content {urls}");
        let vars = Vars::new().set_list("urls", &["a.html".into(), "b c.html".into()]);
        assert_eq!(t.render(&vars, &project()), "purgecss --content a.html 'b c.html'");
    }

    #[test]
    fn unknown_and_shell_expansions_are_left_alone() {
        let t = Template::new("echo {nope} ${HOME} {domain}");
        assert_eq!(
            t.render(&Vars::new(), &project()),
            "echo {nope} ${HOME} www.mysite.com"
        );
    }
}
