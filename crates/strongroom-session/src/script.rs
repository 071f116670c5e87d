// SPDX-FileCopyrightText: 2026 Strongroom Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Named script templates with positional placeholders.
//!
//! A template such as `copy -u $1 && copy $1` is expanded by replacing every
//! whole-token placeholder `$N` with the N-th argument. Arguments are
//! unquoted first, so `"two words"` is inserted as one literal token. A
//! placeholder with no matching argument is left as written.

use std::collections::BTreeMap;

use strongroom_core::StrongroomError;

use crate::chain::{self, Word};

const PLACEHOLDER_SIGIL: char = '$';

/// 1-based argument position named by a `$N` token.
fn placeholder_position(token: &str) -> Option<usize> {
    let digits = token.strip_prefix(PLACEHOLDER_SIGIL)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok().filter(|&n| n >= 1)
}

fn expand_words<S: AsRef<str>>(template: &str, args: &[S]) -> Result<Vec<Word>, StrongroomError> {
    let args = chain::unquote(args)?;
    let template_tokens = chain::tokenize(template);
    let words = chain::lex(&template_tokens)?
        .into_iter()
        .map(|word| {
            if word.quoted {
                return word;
            }
            match placeholder_position(&word.text).and_then(|n| args.get(n - 1)) {
                Some(arg) => Word::literal(arg.clone()),
                None => word,
            }
        })
        .collect();
    Ok(words)
}

/// Expand `template` with `args` into display text.
pub fn expand_script<S: AsRef<str>>(template: &str, args: &[S]) -> Result<String, StrongroomError> {
    let words = expand_words(template, args)?;
    Ok(words
        .into_iter()
        .map(|w| w.text)
        .collect::<Vec<_>>()
        .join(" "))
}

/// Expand `template` with `args` and split the result into sub-commands.
/// Inserted arguments are literals, so an argument of `&&` never chains.
pub fn expand_script_chain<S: AsRef<str>>(
    template: &str,
    args: &[S],
) -> Result<Vec<Vec<String>>, StrongroomError> {
    Ok(chain::group(expand_words(template, args)?))
}

/// Script templates by name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Scripts {
    templates: BTreeMap<String, String>,
}

impl Scripts {
    pub fn new(templates: BTreeMap<String, String>) -> Self {
        Self { templates }
    }

    /// Combine stored scripts with configured ones; configured names win.
    pub fn merged(configured: &BTreeMap<String, String>, stored: BTreeMap<String, String>) -> Self {
        let mut templates = stored;
        templates.extend(configured.iter().map(|(k, v)| (k.clone(), v.clone())));
        Self { templates }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.templates.get(name).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.templates.contains_key(name)
    }

    pub fn insert(&mut self, name: impl Into<String>, template: impl Into<String>) {
        self.templates.insert(name.into(), template.into());
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.templates.remove(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.templates.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Expand the script `name` into sub-commands.
    pub fn expand<S: AsRef<str>>(
        &self,
        name: &str,
        args: &[S],
    ) -> Result<Vec<Vec<String>>, StrongroomError> {
        let template = self
            .get(name)
            .ok_or_else(|| StrongroomError::ScriptNotFound(name.to_string()))?;
        expand_script_chain(template, args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn template_without_placeholders_ignores_args() {
        assert_eq!(
            expand_script("edit test && rm test", &["no_args"]).unwrap(),
            "edit test && rm test"
        );
    }

    #[test]
    fn one_argument_used_twice() {
        assert_eq!(
            expand_script("2fa $1 && ls -q $1", &["test"]).unwrap(),
            "2fa test && ls -q test"
        );
    }

    #[test]
    fn two_arguments() {
        assert_eq!(
            expand_script("file cat $1 && copy $2", &["notes/test.txt", "testing"]).unwrap(),
            "file cat notes/test.txt && copy testing"
        );
    }

    #[test]
    fn quoted_argument_is_one_token() {
        let args = ["\"test", "double", "quotes\""];
        assert_eq!(
            expand_script("card ls $1", &args).unwrap(),
            "card ls test double quotes"
        );
        assert_eq!(
            expand_script_chain("card ls $1", &args).unwrap(),
            [v(&["card", "ls", "test double quotes"])]
        );
    }

    #[test]
    fn missing_positions_stay_literal() {
        assert_eq!(
            expand_script("copy $1 $2 $0 $x", &["only"]).unwrap(),
            "copy only $2 $0 $x"
        );
    }

    #[test]
    fn placeholders_are_whole_tokens_only() {
        assert_eq!(
            expand_script("show pre$1 $1post", &["arg"]).unwrap(),
            "show pre$1 $1post"
        );
    }

    #[test]
    fn multi_digit_placeholder() {
        let args: Vec<String> = (1..=10).map(|i| format!("a{i}")).collect();
        assert_eq!(expand_script("show $10", &args).unwrap(), "show a10");
    }

    #[test]
    fn argument_operator_does_not_chain() {
        assert_eq!(
            expand_script_chain("show $1 && ls", &["&&"]).unwrap(),
            [v(&["show", "&&"]), v(&["ls"])]
        );
    }

    #[test]
    fn unterminated_argument_quote_is_an_error() {
        assert!(matches!(
            expand_script("show $1", &["\"open"]),
            Err(StrongroomError::UnterminatedQuote)
        ));
    }

    #[test]
    fn scripts_book_expands_and_reports_unknown() {
        let mut scripts = Scripts::default();
        scripts.insert("login", "copy -u $1 && copy $1");
        assert_eq!(
            scripts.expand("login", &["github"]).unwrap(),
            [v(&["copy", "-u", "github"]), v(&["copy", "github"])]
        );
        assert!(matches!(
            scripts.expand::<&str>("logout-all", &[]),
            Err(StrongroomError::ScriptNotFound(name)) if name == "logout-all"
        ));
    }

    #[test]
    fn configured_scripts_win_over_stored() {
        let configured = BTreeMap::from([("a".to_string(), "from config".to_string())]);
        let stored = BTreeMap::from([
            ("a".to_string(), "from vault".to_string()),
            ("b".to_string(), "only stored".to_string()),
        ]);
        let scripts = Scripts::merged(&configured, stored);
        assert_eq!(scripts.get("a"), Some("from config"));
        assert_eq!(scripts.get("b"), Some("only stored"));
        assert_eq!(scripts.len(), 2);
    }
}
