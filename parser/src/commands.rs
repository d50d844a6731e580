//! Follow-up `aws` commands printed by `--mode manual`.
//!
//! In manual mode the CLI prints the `aws` commands a user would run instead
//! of running them itself, usually split over several lines with trailing
//! backslashes and mixed with `INFO:`/`WARN:` lines.

use std::sync::LazyLock;

use regex::Regex;
use rosacli_core::CommandArgs;
use tracing::debug;

/// A trailing backslash, the line break after it and any blank lines or
/// indentation before the continued text.
static CONTINUATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\\[ \t]*(?:\r?\n[ \t]*)+").expect("valid continuation regex")
});

/// Extracts every `aws` command from manual-mode output, in order.
///
/// Continued lines are joined and quoting is resolved by
/// [`CommandArgs::parse`], so an inline policy document stays one argument.
/// Log lines and prose between the commands are skipped.
///
/// ```
/// use rosacli_parser::extract_aws_commands;
///
/// let output = "\
/// INFO: Run the following commands to create the operator roles:
///
/// aws iam create-role \\
/// \t--role-name demo-openshift-ingress \\
/// \t--assume-role-policy-document file://operator_ingress_policy.json
///
/// aws iam attach-role-policy --role-name demo-openshift-ingress --policy-arn arn:aws:iam::123:policy/x
/// ";
/// let commands = extract_aws_commands(output);
/// assert_eq!(commands.len(), 2);
/// assert_eq!(commands[0].flag_value("--role-name"), Some("demo-openshift-ingress"));
/// assert_eq!(commands[1].program(), Some("aws"));
/// ```
pub fn extract_aws_commands(output: &str) -> Vec<CommandArgs> {
    let joined = CONTINUATION.replace_all(output, " ");
    let commands: Vec<CommandArgs> = joined
        .lines()
        .map(str::trim)
        .filter(|line| line.starts_with("aws "))
        .map(CommandArgs::parse)
        .collect();
    debug!(commands = commands.len(), "Extracted aws commands");
    commands
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_warning_before_first_command_is_skipped() {
        let output = "WARN: The current version (1.2.30) is not up to date with latest released version (1.2.40).\n\
                      aws iam create-open-id-connect-provider \\\n\
                      \t--url https://oidc.example.com/2abc \\\n\
                      \t--client-id-list openshift sts.amazonaws.com \\\n\
                      \t--thumbprint-list 917e732d330f9a12404f73d8bea36948b929dffc\n";
        let commands = extract_aws_commands(output);
        assert_eq!(commands.len(), 1);
        assert_eq!(commands[0].flag_value("--url"), Some("https://oidc.example.com/2abc"));
        assert_eq!(
            commands[0].full_command(),
            "aws iam create-open-id-connect-provider --url https://oidc.example.com/2abc \
             --client-id-list openshift sts.amazonaws.com \
             --thumbprint-list 917e732d330f9a12404f73d8bea36948b929dffc"
        );
    }

    #[test]
    fn test_quoted_policy_document_stays_one_argument() {
        let output = "aws iam create-role \\\n\n  --role-name r \\\n  --assume-role-policy-document '{\"Version\": \"2012-10-17\", \"Statement\": []}'\n";
        let commands = extract_aws_commands(output);
        assert_eq!(commands.len(), 1);
        assert_eq!(
            commands[0].flag_value("--assume-role-policy-document"),
            Some("{\"Version\": \"2012-10-17\", \"Statement\": []}")
        );
        assert_eq!(commands[0].flag_value("--role-name"), Some("r"));
    }

    #[test]
    fn test_no_commands() {
        assert!(extract_aws_commands("INFO: Nothing to do\n").is_empty());
        assert!(extract_aws_commands("").is_empty());
        assert!(extract_aws_commands("awsome output\n").is_empty());
    }
}
