//! Account-scoped OCM resources: `whoami`, account roles and OIDC configs.

use rosacli_core::{CapturedOutput, CommandArgs};
use rosacli_parser::TableRow;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::client::Client;
use crate::error::{ExecError, Result};
use crate::service::{ResourceKind, ResourcesCleaner};

/// Reflected `rosa whoami` output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccountsInfo {
    #[serde(rename = "AWS ARN")]
    pub aws_arn: String,
    #[serde(rename = "AWS Account ID")]
    pub aws_account_id: String,
    #[serde(rename = "AWS Default Region")]
    pub aws_default_region: String,
    #[serde(rename = "OCM API")]
    pub ocm_api: String,
    #[serde(rename = "OCM Account Email")]
    pub ocm_account_email: String,
    #[serde(rename = "OCM Account ID")]
    pub ocm_account_id: String,
    #[serde(rename = "OCM Account Name")]
    pub ocm_account_name: String,
    #[serde(rename = "OCM Account Username")]
    pub ocm_account_username: String,
    #[serde(rename = "OCM Organization External ID")]
    pub ocm_organization_external_id: String,
    #[serde(rename = "OCM Organization ID")]
    pub ocm_organization_id: String,
    #[serde(rename = "OCM Organization Name")]
    pub ocm_organization_name: String,
}

/// One row of `rosa list account-roles`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccountRole {
    #[serde(rename = "ROLE NAME")]
    pub role_name: String,
    #[serde(rename = "ROLE TYPE")]
    pub role_type: String,
    #[serde(rename = "ROLE ARN")]
    pub role_arn: String,
    #[serde(rename = "OPENSHIFT VERSION")]
    pub openshift_version: String,
    #[serde(rename = "AWS Managed")]
    pub aws_managed: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountRoleList {
    pub account_roles: Vec<AccountRole>,
}

impl AccountRoleList {
    /// Roles whose name contains `prefix`.
    pub fn account_roles(&self, prefix: &str) -> Vec<&AccountRole> {
        self.account_roles
            .iter()
            .filter(|role| role.role_name.contains(prefix))
            .collect()
    }

    pub fn account_role(&self, arn: &str) -> Option<&AccountRole> {
        self.account_roles.iter().find(|role| role.role_arn == arn)
    }

    /// Installer role for `prefix`. Hosted control plane roles carry an
    /// `HCP-ROSA-` marker in their name; classic ones must not.
    pub fn installer_role(&self, prefix: &str, hosted_cp: bool) -> Option<&AccountRole> {
        self.account_roles.iter().find(|role| {
            let name = role.role_name.as_str();
            name.contains(prefix)
                && name.contains("Installer-Role")
                && name.contains("HCP-ROSA-") == hosted_cp
        })
    }
}

/// One row of `rosa list oidc-config`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OidcConfig {
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(rename = "MANAGED")]
    pub managed: String,
    #[serde(rename = "ISSUER URL")]
    pub issuer_url: String,
    #[serde(rename = "SECRET ARN")]
    pub secret_arn: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OidcConfigList {
    pub oidc_configs: Vec<OidcConfig>,
}

impl OidcConfigList {
    pub fn oidc_config(&self, id: &str) -> Option<&OidcConfig> {
        self.oidc_configs.iter().find(|config| config.id == id)
    }

    /// First config whose issuer URL contains `issuer_url`.
    pub fn find_by_issuer(&self, issuer_url: &str) -> Option<&OidcConfig> {
        self.oidc_configs
            .iter()
            .find(|config| config.issuer_url.contains(issuer_url))
    }
}

fn reflect_rows<T: serde::de::DeserializeOwned>(rows: Vec<TableRow>) -> Result<Vec<T>> {
    Ok(rows
        .iter()
        .map(TableRow::deserialize)
        .collect::<rosacli_parser::Result<Vec<T>>>()?)
}

/// OCM resource commands for one client.
pub struct OcmResourceService<'c> {
    client: &'c mut Client,
}

impl<'c> OcmResourceService<'c> {
    pub(crate) fn new(client: &'c mut Client) -> Self {
        Self { client }
    }

    pub fn whoami(&self) -> Result<CapturedOutput> {
        self.client.runner.run(["whoami"])
    }

    pub fn reflect_accounts_info(&self, output: &CapturedOutput) -> Result<AccountsInfo> {
        Ok(self.client.parser.description(output).deserialize()?)
    }

    pub fn user_info(&self) -> Result<AccountsInfo> {
        let output = self.whoami()?;
        self.reflect_accounts_info(&output)
    }

    /// `rosa create account-roles <flags>`.
    ///
    /// A `--prefix` among the flags is recorded for cleanup on success.
    pub fn create_account_role(&mut self, flags: &[&str]) -> Result<CapturedOutput> {
        let mut args = vec!["create", "account-roles"];
        args.extend_from_slice(flags);
        let output = self.client.runner.run(args)?;
        match prefix_of(flags) {
            Some(prefix) => self.client.ledger.record(ResourceKind::AccountRoles, "", &prefix),
            None => warn!("Account roles created without --prefix are not tracked for cleanup"),
        }
        Ok(output)
    }

    pub fn delete_account_role(&mut self, flags: &[&str]) -> Result<CapturedOutput> {
        let mut args = vec!["delete", "account-roles"];
        args.extend_from_slice(flags);
        let output = self.client.runner.run(args)?;
        if let Some(prefix) = prefix_of(flags) {
            self.client.ledger.forget(ResourceKind::AccountRoles, "", &prefix);
        }
        Ok(output)
    }

    pub fn reflect_account_roles(&self, output: &CapturedOutput) -> Result<AccountRoleList> {
        let account_roles = reflect_rows(self.client.parser.table(output))?;
        Ok(AccountRoleList { account_roles })
    }

    /// `rosa list account-roles`, reflected. The raw output is returned too.
    pub fn list_account_roles(&self) -> Result<(AccountRoleList, CapturedOutput)> {
        let output = self.client.runner.run(["list", "account-roles"])?;
        Ok((self.reflect_account_roles(&output)?, output))
    }

    pub fn create_oidc_config(&self, flags: &[&str]) -> Result<CapturedOutput> {
        let mut args = vec!["create", "oidc-config"];
        args.extend_from_slice(flags);
        self.client.runner.run(args)
    }

    pub fn delete_oidc_config(&self, flags: &[&str]) -> Result<CapturedOutput> {
        let mut args = vec!["delete", "oidc-config"];
        args.extend_from_slice(flags);
        self.client.runner.run(args)
    }

    pub fn reflect_oidc_configs(&self, output: &CapturedOutput) -> Result<OidcConfigList> {
        let oidc_configs = reflect_rows(self.client.parser.table(output))?;
        Ok(OidcConfigList { oidc_configs })
    }

    pub fn list_oidc_configs(&self) -> Result<(OidcConfigList, CapturedOutput)> {
        let output = self.client.runner.run(["list", "oidc-config"])?;
        Ok((self.reflect_oidc_configs(&output)?, output))
    }

    /// ID of the config whose issuer URL contains `issuer_url`.
    pub fn oidc_config_id(&self, issuer_url: &str) -> Result<String> {
        let (configs, _) = self.list_oidc_configs()?;
        configs
            .find_by_issuer(issuer_url)
            .map(|config| config.id.clone())
            .ok_or_else(|| ExecError::NotFound(format!("oidc config with issuer {issuer_url}")))
    }
}

fn prefix_of(flags: &[&str]) -> Option<String> {
    let args = CommandArgs::from_tokens(flags.iter().copied());
    args.flag_value("--prefix")
        .filter(|prefix| !prefix.is_empty())
        .map(str::to_string)
}

impl ResourcesCleaner for OcmResourceService<'_> {
    /// Account roles are not bound to a cluster, so every recorded prefix is
    /// removed whichever `cluster_id` is passed.
    fn clean_resources(&mut self, cluster_id: &str) -> Vec<ExecError> {
        let prefixes = self.client.ledger.pending(ResourceKind::AccountRoles, "");
        if prefixes.is_empty() {
            debug!(cluster_id, "No account roles to clean");
        }
        let mut errors = Vec::new();
        for prefix in prefixes {
            info!(prefix = %prefix, "Removing remaining account roles");
            if let Err(err) =
                self.delete_account_role(&["--prefix", prefix.as_str(), "--mode", "auto", "-y"])
            {
                errors.push(err);
            }
        }
        errors
    }
}
