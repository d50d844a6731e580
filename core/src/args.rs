//! Editable command lines.
//!
//! A [`CommandArgs`] is built once from a captured command line (typically a
//! `rosa create cluster ... --dry-run` invocation) and then edited in place
//! before being replayed. Token order is preserved for re-serialization.
//!
//! Classification happens when a token is added, not when it is looked up:
//! a token starting with `-` is a flag, and a non-flag token directly after a
//! valueless flag becomes that flag's value. Negative numbers (`-3`) are
//! values, not flags. Once classified, a value keeps its role even if an edit
//! later replaces it with something that looks like a flag (`-bad-name`).

use std::borrow::Cow;
use std::fmt;

use crate::error::{ArgsError, Result};

/// Splits a shell-style line into tokens.
///
/// Whitespace separates tokens; text inside matching single or double quotes
/// is kept together and the quotes are dropped. Adjacent quoted and bare
/// segments join into one token (`--name='a b'` is one token). An
/// unterminated quote runs to the end of the input.
///
/// # Examples
///
/// ```
/// use rosacli_core::tokenize;
///
/// assert_eq!(
///     tokenize(r#"rosa edit --labels "a=b, c=d" --name='x y'"#),
///     vec!["rosa", "edit", "--labels", "a=b, c=d", "--name=x y"],
/// );
/// ```
pub fn tokenize(line: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_token = false;
    let mut quote: Option<char> = None;

    for ch in line.chars() {
        match quote {
            Some(open) if ch == open => quote = None,
            Some(_) => current.push(ch),
            None if ch == '\'' || ch == '"' => {
                quote = Some(ch);
                in_token = true;
            }
            None if ch.is_whitespace() => {
                if in_token {
                    tokens.push(std::mem::take(&mut current));
                    in_token = false;
                }
            }
            None => {
                current.push(ch);
                in_token = true;
            }
        }
    }
    if in_token {
        tokens.push(current);
    }
    tokens
}

/// Returns `true` when `token` is a flag (`-c`, `--region`, `--name=x`).
///
/// A lone `-` and negative numbers are not flags.
pub fn is_flag_token(token: &str) -> bool {
    token.len() > 1 && token.starts_with('-') && token[1..].parse::<f64>().is_err()
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Arg {
    /// Program name, subcommand words and positionals.
    Word(String),
    Flag {
        name: String,
        value: Option<String>,
        /// Written as `--name=value` in a single token.
        inline: bool,
    },
}

impl Arg {
    fn token_count(&self) -> usize {
        match self {
            Self::Flag {
                value: Some(_),
                inline: false,
                ..
            } => 2,
            _ => 1,
        }
    }

    fn is_flag(&self, flag: &str) -> bool {
        matches!(self, Self::Flag { name, .. } if name == flag)
    }
}

/// Ordered command line with flag lookup and in-place editing.
///
/// # Examples
///
/// ```
/// use rosacli_core::CommandArgs;
///
/// let mut cmd = CommandArgs::parse("rosa create cluster --cluster-name demo --replicas 3");
/// cmd.add_flags(["--dry-run"]);
/// cmd.replace_flag_value([("--replicas", "5")]);
///
/// assert_eq!(
///     cmd.full_command(),
///     "rosa create cluster --cluster-name demo --replicas 5 --dry-run"
/// );
/// assert_eq!(cmd.get_flag_value("--missing"), (String::new(), false));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommandArgs {
    args: Vec<Arg>,
}

impl CommandArgs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tokenizes a full command line with [`tokenize`] and classifies it.
    pub fn parse(line: &str) -> Self {
        Self::from_tokens(tokenize(line))
    }

    pub fn from_tokens<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut cmd = Self::new();
        cmd.add_flags(tokens);
        cmd
    }

    /// Appends raw tokens, classifying each the same way [`parse`](Self::parse) would.
    pub fn add_flags<I, S>(&mut self, tokens: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for token in tokens {
            self.push_token(token.into());
        }
    }

    fn push_token(&mut self, token: String) {
        if is_flag_token(&token) {
            let arg = match token.split_once('=') {
                Some((name, value)) if name.len() > 1 => Arg::Flag {
                    name: name.to_string(),
                    value: Some(value.to_string()),
                    inline: true,
                },
                _ => Arg::Flag {
                    name: token,
                    value: None,
                    inline: false,
                },
            };
            self.args.push(arg);
            return;
        }

        if let Some(Arg::Flag {
            value: value @ None,
            ..
        }) = self.args.last_mut()
        {
            *value = Some(token);
            return;
        }
        self.args.push(Arg::Word(token));
    }

    /// First token, usually the program name.
    pub fn program(&self) -> Option<&str> {
        self.args.first().map(|arg| match arg {
            Arg::Word(word) => word.as_str(),
            Arg::Flag { name, .. } => name.as_str(),
        })
    }

    /// Number of tokens the command line serializes to.
    pub fn len(&self) -> usize {
        self.args.iter().map(Arg::token_count).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    /// Unquoted argument vector, suitable for process execution.
    pub fn argv(&self) -> Vec<String> {
        let mut argv = Vec::with_capacity(self.len());
        for arg in &self.args {
            match arg {
                Arg::Word(word) => argv.push(word.clone()),
                Arg::Flag {
                    name,
                    value: Some(value),
                    inline: true,
                } => argv.push(format!("{name}={value}")),
                Arg::Flag { name, value, .. } => {
                    argv.push(name.clone());
                    if let Some(value) = value {
                        argv.push(value.clone());
                    }
                }
            }
        }
        argv
    }

    /// Flags in order, with their value when they have one.
    pub fn flags(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.args.iter().filter_map(|arg| match arg {
            Arg::Flag { name, value, .. } => Some((name.as_str(), value.as_deref())),
            Arg::Word(_) => None,
        })
    }

    fn position(&self, flag: &str) -> Option<usize> {
        self.args.iter().position(|arg| arg.is_flag(flag))
    }

    /// Value of the first occurrence of `flag`.
    ///
    /// `Some("")` means the flag is present without a value; `None` means it
    /// is absent.
    pub fn flag_value(&self, flag: &str) -> Option<&str> {
        match self.args.get(self.position(flag)?)? {
            Arg::Flag { value, .. } => Some(value.as_deref().unwrap_or_default()),
            Arg::Word(_) => None,
        }
    }

    /// Value plus presence, so "absent" and "present but empty" differ.
    pub fn get_flag_value(&self, flag: &str) -> (String, bool) {
        match self.flag_value(flag) {
            Some(value) => (value.to_string(), true),
            None => (String::new(), false),
        }
    }

    pub fn check_flag_exist(&self, flag: &str) -> bool {
        self.position(flag).is_some()
    }

    /// Replaces the value of each listed flag in place.
    ///
    /// Flags that are not present are appended as `flag value`. A valueless
    /// flag gains the value inline (`--sts=x`), so existing flags never change
    /// the length of the command line.
    pub fn replace_flag_value<I, K, V>(&mut self, replacements: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        for (flag, new_value) in replacements {
            let flag = flag.as_ref();
            let new_value = new_value.as_ref().to_string();
            match self.position(flag) {
                Some(index) => {
                    if let Arg::Flag { value, inline, .. } = &mut self.args[index] {
                        // A bare flag takes the value inline so the token count holds.
                        if value.is_none() {
                            *inline = true;
                        }
                        *value = Some(new_value);
                    }
                }
                None => self.args.push(Arg::Flag {
                    name: flag.to_string(),
                    value: Some(new_value),
                    inline: false,
                }),
            }
        }
    }

    /// Removes the first occurrence of `flag` together with its value.
    ///
    /// # Errors
    ///
    /// Returns [`ArgsError::FlagNotFound`] when the flag is absent.
    pub fn delete_flag(&mut self, flag: &str) -> Result<()> {
        let index = self
            .position(flag)
            .ok_or_else(|| ArgsError::FlagNotFound(flag.to_string()))?;
        self.args.remove(index);
        Ok(())
    }

    /// Removes every valueless occurrence of `flag`, returning how many went.
    pub fn unset_bool_flag(&mut self, flag: &str) -> usize {
        let before = self.args.len();
        self.args.retain(|arg| {
            !matches!(arg, Arg::Flag { name, value: None, .. } if name == flag)
        });
        before - self.args.len()
    }

    /// Re-serializes into one line that [`parse`](Self::parse) reads back to
    /// the same arguments.
    pub fn full_command(&self) -> String {
        self.argv()
            .iter()
            .map(|token| quote_token(token))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl fmt::Display for CommandArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full_command())
    }
}

fn quote_token(token: &str) -> Cow<'_, str> {
    let needs_quoting =
        token.is_empty() || token.chars().any(|ch| ch.is_whitespace() || ch == '\'' || ch == '"');
    if !needs_quoting {
        return Cow::Borrowed(token);
    }
    if !token.contains('\'') {
        return Cow::Owned(format!("'{token}'"));
    }
    if !token.contains('"') {
        return Cow::Owned(format!("\"{token}\""));
    }

    // Both quote kinds: single-quote the runs between apostrophes and
    // double-quote each apostrophe; the tokenizer glues the segments back.
    let mut out = String::new();
    for (i, segment) in token.split('\'').enumerate() {
        if i > 0 {
            out.push_str("\"'\"");
        }
        if !segment.is_empty() {
            out.push('\'');
            out.push_str(segment);
            out.push('\'');
        }
    }
    Cow::Owned(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_groups_quotes() {
        assert_eq!(
            tokenize("a 'b c' \"d  e\" f"),
            vec!["a", "b c", "d  e", "f"]
        );
        assert_eq!(tokenize("--tags ''"), vec!["--tags", ""]);
        assert_eq!(tokenize("   "), Vec::<String>::new());
    }

    #[test]
    fn test_tokenize_unterminated_quote_runs_to_end() {
        assert_eq!(tokenize("a 'b c"), vec!["a", "b c"]);
    }

    #[test]
    fn test_is_flag_token() {
        assert!(is_flag_token("-c"));
        assert!(is_flag_token("--region"));
        assert!(is_flag_token("--name=x"));
        assert!(!is_flag_token("-"));
        assert!(!is_flag_token("-3"));
        assert!(!is_flag_token("-1.5"));
        assert!(!is_flag_token("us-east-1"));
    }

    #[test]
    fn test_flag_value_and_presence() {
        let cmd = CommandArgs::parse("rosa create cluster --region us-east-1 --sts -y");
        assert_eq!(cmd.flag_value("--region"), Some("us-east-1"));
        assert_eq!(cmd.flag_value("--sts"), Some(""));
        assert_eq!(cmd.get_flag_value("--sts"), (String::new(), true));
        assert_eq!(cmd.get_flag_value("--mode"), (String::new(), false));
        assert!(cmd.check_flag_exist("-y"));
        assert_eq!(cmd.program(), Some("rosa"));
    }

    #[test]
    fn test_delete_boolean_flag() {
        let mut cmd = CommandArgs::parse("rosa create cluster --region us-east-1 --sts -y");
        let before = cmd.len();
        cmd.delete_flag("--sts").unwrap();
        assert_eq!(cmd.len(), before - 1);
        assert_eq!(cmd.full_command(), "rosa create cluster --region us-east-1 -y");
        assert!(!cmd.check_flag_exist("--sts"));
    }

    #[test]
    fn test_delete_flag_with_value() {
        let mut cmd = CommandArgs::parse("rosa create cluster --region us-east-1 --sts -y");
        let before = cmd.len();
        cmd.delete_flag("--region").unwrap();
        assert_eq!(cmd.len(), before - 2);
        assert_eq!(cmd.get_flag_value("--region"), (String::new(), false));
    }

    #[test]
    fn test_delete_missing_flag_is_an_error() {
        let mut cmd = CommandArgs::parse("rosa list clusters");
        assert_eq!(
            cmd.delete_flag("--region"),
            Err(ArgsError::FlagNotFound("--region".to_string()))
        );
    }

    #[test]
    fn test_replace_keeps_position_and_length() {
        let mut cmd = CommandArgs::parse("rosa create cluster -c a --region r1 --replicas 3 -y");
        let before = cmd.len();
        cmd.replace_flag_value([("--region", "r2"), ("-c", "b")]);
        assert_eq!(cmd.len(), before);
        assert_eq!(
            cmd.full_command(),
            "rosa create cluster -c b --region r2 --replicas 3 -y"
        );
    }

    #[test]
    fn test_replace_on_bare_flag_keeps_length() {
        let mut cmd = CommandArgs::parse("rosa create cluster --sts -y");
        let before = cmd.len();
        cmd.replace_flag_value([("--sts", "x")]);
        assert_eq!(cmd.len(), before);
        assert_eq!(cmd.flag_value("--sts"), Some("x"));
        assert_eq!(cmd.full_command(), "rosa create cluster --sts=x -y");
        assert_eq!(CommandArgs::parse(&cmd.full_command()), cmd);
    }

    #[test]
    fn test_replace_repeated_flag_targets_first_occurrence() {
        let mut cmd = CommandArgs::parse("a -a -a a");
        cmd.replace_flag_value([("-a", "b")]);
        assert_eq!(cmd.len(), 4);
        assert_eq!(cmd.full_command(), "a -a=b -a a");
    }

    #[test]
    fn test_replace_appends_absent_flag() {
        let mut cmd = CommandArgs::parse("rosa create cluster -y");
        cmd.replace_flag_value([("--billing-account", "123456789")]);
        assert_eq!(
            cmd.full_command(),
            "rosa create cluster -y --billing-account 123456789"
        );
    }

    #[test]
    fn test_replaced_value_that_looks_like_a_flag_stays_a_value() {
        let mut cmd = CommandArgs::parse("rosa create cluster --cluster-name demo --dry-run");
        cmd.replace_flag_value([("--cluster-name", "-test-cluster")]);
        assert_eq!(cmd.flag_value("--cluster-name"), Some("-test-cluster"));
        cmd.replace_flag_value([("--cluster-name", "demo")]);
        assert_eq!(
            cmd.full_command(),
            "rosa create cluster --cluster-name demo --dry-run"
        );
    }

    #[test]
    fn test_negative_number_is_a_value() {
        let cmd = CommandArgs::parse("rosa edit machinepool --replicas -3 -y");
        assert_eq!(cmd.flag_value("--replicas"), Some("-3"));
        assert_eq!(cmd.flag_value("-y"), Some(""));
    }

    #[test]
    fn test_inline_flag_value() {
        let mut cmd = CommandArgs::parse("rosa list versions --channel-group=candidate");
        assert_eq!(cmd.flag_value("--channel-group"), Some("candidate"));
        cmd.replace_flag_value([("--channel-group", "stable")]);
        assert_eq!(cmd.full_command(), "rosa list versions --channel-group=stable");
        assert_eq!(cmd.len(), 4);
    }

    #[test]
    fn test_add_flags_attaches_value() {
        let mut cmd = CommandArgs::parse("rosa create cluster --dry-run");
        cmd.add_flags(["--replicas", "3"]);
        assert_eq!(cmd.flag_value("--replicas"), Some("3"));
        assert_eq!(cmd.flag_value("--dry-run"), Some(""));
    }

    #[test]
    fn test_unset_bool_flag_removes_all_bare_occurrences() {
        let mut cmd = CommandArgs::parse("rosa create cluster --sts -y --region r --sts");
        assert_eq!(cmd.unset_bool_flag("--sts"), 2);
        assert_eq!(cmd.unset_bool_flag("--region"), 0);
        assert_eq!(cmd.full_command(), "rosa create cluster -y --region r");
    }

    #[test]
    fn test_full_command_requotes_values() {
        let cmd = CommandArgs::parse(r#"rosa edit machinepool --labels "a=b, c=d" --name 'it''s'"#);
        let line = cmd.full_command();
        assert_eq!(line, "rosa edit machinepool --labels 'a=b, c=d' --name its");
        assert_eq!(CommandArgs::parse(&line), cmd);
    }

    #[test]
    fn test_quote_token_with_both_quote_kinds() {
        let token = r#"it's "quoted""#;
        let quoted = quote_token(token);
        assert_eq!(tokenize(&quoted), vec![token.to_string()]);
    }

    #[test]
    fn test_flags_iterator_in_order() {
        let cmd = CommandArgs::parse("rosa create cluster -c a --sts --mode auto");
        let flags: Vec<_> = cmd.flags().collect();
        assert_eq!(
            flags,
            vec![("-c", Some("a")), ("--sts", None), ("--mode", Some("auto"))]
        );
    }
}
