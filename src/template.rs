//! Renders `{{ namespace.key }}` placeholders in parameter values.
//!
//! Two namespaces exist: `env` resolves from the process environment captured at startup, and
//! `input` resolves from the outputs of the previous workflow. Rendering is single-pass, so a
//! substituted value is never scanned for placeholders again.

use regex::Regex;
use thiserror::Error;

use crate::{context::Context, static_lazy_lock};

static_lazy_lock! {
    PLACEHOLDER: Regex = Regex::new(r"\{\{\s*([A-Za-z_][A-Za-z0-9_]*)\.([A-Za-z0-9_\-.]+)\s*\}\}")
        .expect("unreachable");
}

/// The namespace of a placeholder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    /// The process environment.
    Env,
    /// The outputs of the previous workflow.
    Input,
}

impl Namespace {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "env" => Some(Self::Env),
            "input" => Some(Self::Input),
            _ => None,
        }
    }

    /// The name used inside placeholders.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Env => "env",
            Self::Input => "input",
        }
    }
}

/// An error raised while rendering a template.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemplateError {
    /// The placeholder uses a namespace other than `env` or `input`.
    #[error("unknown namespace `{0}` in placeholder, expected `env` or `input`")]
    UnknownNamespace(String),
    /// The key does not exist in its namespace.
    #[error("`{}.{key}` is not defined", .namespace.as_str())]
    Undefined {
        /// The namespace looked up.
        namespace: Namespace,
        /// The missing key.
        key: String,
    },
}

/// Lists every placeholder of a template as `(namespace, key)` pairs, in order of appearance.
///
/// # Errors
///
/// Returns [`TemplateError::UnknownNamespace`] on the first placeholder with an unknown namespace.
pub fn placeholders(template: &str) -> Result<Vec<(Namespace, String)>, TemplateError> {
    PLACEHOLDER
        .captures_iter(template)
        .map(|caps| {
            let namespace = Namespace::parse(&caps[1])
                .ok_or_else(|| TemplateError::UnknownNamespace(caps[1].to_owned()))?;
            Ok((namespace, caps[2].to_owned()))
        })
        .collect()
}

/// Substitutes every placeholder of a template with its value from the context.
///
/// # Errors
///
/// Returns a [`TemplateError`] if a placeholder has an unknown namespace or an undefined key.
pub fn render(template: &str, context: &Context) -> Result<String, TemplateError> {
    let mut rendered = String::with_capacity(template.len());
    let mut last = 0;

    for caps in PLACEHOLDER.captures_iter(template) {
        let Some(whole) = caps.get(0) else { continue };
        let namespace = Namespace::parse(&caps[1])
            .ok_or_else(|| TemplateError::UnknownNamespace(caps[1].to_owned()))?;
        let key = &caps[2];

        let value = context
            .lookup(namespace, key)
            .ok_or_else(|| TemplateError::Undefined {
                namespace,
                key: key.to_owned(),
            })?;

        rendered.push_str(&template[last..whole.start()]);
        rendered.push_str(value);
        last = whole.end();
    }

    rendered.push_str(&template[last..]);
    Ok(rendered)
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::HashMap;

    fn context() -> Context {
        let mut cx = Context::with_env(HashMap::from([
            ("HOME".to_owned(), "/home/kita".to_owned()),
            ("EMPTY".to_owned(), String::new()),
        ]));
        cx.input = HashMap::from([
            ("status_code".to_owned(), "200".to_owned()),
            ("text".to_owned(), "{{ env.HOME }}".to_owned()),
        ]);
        cx
    }

    #[test]
    fn substitutes_both_namespaces() {
        let rendered = render("{{env.HOME}}/{{ input.status_code }}.log", &context()).unwrap();
        assert_eq!(rendered, "/home/kita/200.log");
    }

    #[test]
    fn leaves_plain_text_alone() {
        let template = "no placeholders, only { braces } and {{ }}";
        assert_eq!(render(template, &context()).unwrap(), template);
    }

    #[test]
    fn does_not_rescan_substituted_values() {
        assert_eq!(
            render("{{ input.text }}", &context()).unwrap(),
            "{{ env.HOME }}"
        );
    }

    #[test]
    fn empty_values_are_defined() {
        assert_eq!(render("[{{ env.EMPTY }}]", &context()).unwrap(), "[]");
    }

    #[test]
    fn reports_undefined_keys() {
        assert_eq!(
            render("{{ input.missing }}", &context()),
            Err(TemplateError::Undefined {
                namespace: Namespace::Input,
                key: "missing".to_owned()
            })
        );
        assert_eq!(
            render("{{ input.missing }}", &context())
                .unwrap_err()
                .to_string(),
            "`input.missing` is not defined"
        );
    }

    #[test]
    fn reports_unknown_namespaces() {
        assert_eq!(
            render("{{ secrets.TOKEN }}", &context()),
            Err(TemplateError::UnknownNamespace("secrets".to_owned()))
        );
    }

    #[test]
    fn lists_placeholders_in_order() {
        assert_eq!(
            placeholders("{{ input.a }} and {{env.B}} then {{ input.c-d }}").unwrap(),
            vec![
                (Namespace::Input, "a".to_owned()),
                (Namespace::Env, "B".to_owned()),
                (Namespace::Input, "c-d".to_owned()),
            ]
        );
    }
}
