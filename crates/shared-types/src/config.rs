//! # Channel Configuration
//!
//! The configuration a peer proposes (`ApplicationConfig`), the orderer's
//! own section (`OrdererSection`) and the merged `ChannelConfig` stored in a
//! channel's config blocks.
//!
//! Policies are an explicit sum type evaluated against signers whose
//! certificates have already been verified. Nothing here touches
//! cryptography.

use crate::errors::CodecError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const READERS_POLICY: &str = "Readers";
pub const WRITERS_POLICY: &str = "Writers";
pub const ADMINS_POLICY: &str = "Admins";

/// Maximum channel name length.
pub const MAX_CHANNEL_ID_LEN: usize = 249;

/// Channel names become directory names: `[a-z][a-z0-9.-]{0,248}`.
pub fn validate_channel_id(channel_id: &str) -> Result<(), CodecError> {
    let mut chars = channel_id.chars();
    match chars.next() {
        None => return Err(CodecError::structural("channel id is empty")),
        Some(c) if !c.is_ascii_lowercase() => {
            return Err(CodecError::Structural(format!(
                "channel id '{}' must start with a lowercase letter",
                channel_id
            )))
        }
        Some(_) => {}
    }
    if channel_id.len() > MAX_CHANNEL_ID_LEN {
        return Err(CodecError::Structural(format!(
            "channel id longer than {} characters",
            MAX_CHANNEL_ID_LEN
        )));
    }
    if let Some(bad) =
        chars.find(|c| !(c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '.' || *c == '-'))
    {
        return Err(CodecError::Structural(format!(
            "channel id '{}' contains invalid character '{}'",
            channel_id, bad
        )));
    }
    Ok(())
}

/// Block cutting limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchParameters {
    pub max_message_count: u32,
    pub batch_timeout_ms: u64,
    pub absolute_max_bytes: u64,
}

impl Default for BatchParameters {
    fn default() -> Self {
        Self {
            max_message_count: 10,
            batch_timeout_ms: 2_000,
            absolute_max_bytes: 10 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PrincipalRole {
    Member,
    Admin,
}

/// One required signer class: a role within an organization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub msp_id: String,
    pub role: PrincipalRole,
}

impl Principal {
    pub fn member(msp_id: impl Into<String>) -> Self {
        Self {
            msp_id: msp_id.into(),
            role: PrincipalRole::Member,
        }
    }

    pub fn admin(msp_id: impl Into<String>) -> Self {
        Self {
            msp_id: msp_id.into(),
            role: PrincipalRole::Admin,
        }
    }

    fn matches(&self, signer: &VerifiedSigner) -> bool {
        signer.msp_id == self.msp_id
            && match self.role {
                PrincipalRole::Member => true,
                PrincipalRole::Admin => signer.is_admin,
            }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImplicitMetaRule {
    Any,
    All,
    Majority,
}

/// A signer whose certificate already chained to its organization's root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedSigner {
    pub msp_id: String,
    pub is_admin: bool,
}

/// Access policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PolicyRule {
    /// Combine the named sub-policy of every member organization.
    ImplicitMeta {
        rule: ImplicitMetaRule,
        sub_policy: String,
    },
    /// At least `n_out_of` principals satisfied by distinct signers.
    Signature {
        identities: Vec<Principal>,
        n_out_of: u32,
    },
}

impl PolicyRule {
    pub fn implicit(rule: ImplicitMetaRule, sub_policy: impl Into<String>) -> Self {
        PolicyRule::ImplicitMeta {
            rule,
            sub_policy: sub_policy.into(),
        }
    }

    /// Evaluate against `signers` in the context of the channel's member
    /// organizations.
    pub fn evaluate(&self, signers: &[VerifiedSigner], organizations: &[OrganizationConfig]) -> bool {
        match self {
            PolicyRule::Signature {
                identities,
                n_out_of,
            } => signature_satisfied(identities, *n_out_of, signers),
            PolicyRule::ImplicitMeta { rule, sub_policy } => {
                let total = organizations.len();
                let satisfied = organizations
                    .iter()
                    .filter(|org| org.policy(sub_policy).evaluate(signers, &[]))
                    .count();
                match rule {
                    ImplicitMetaRule::Any => satisfied >= 1,
                    ImplicitMetaRule::All => total > 0 && satisfied == total,
                    ImplicitMetaRule::Majority => satisfied * 2 > total,
                }
            }
        }
    }
}

/// Greedy matching of principals to distinct signers. Admin principals are
/// matched first so a lone admin is not consumed by a member slot.
fn signature_satisfied(identities: &[Principal], n_out_of: u32, signers: &[VerifiedSigner]) -> bool {
    if n_out_of == 0 {
        return true;
    }
    let mut ordered: Vec<&Principal> = identities.iter().collect();
    ordered.sort_by_key(|p| match p.role {
        PrincipalRole::Admin => 0,
        PrincipalRole::Member => 1,
    });

    let mut used = vec![false; signers.len()];
    let mut matched = 0u32;
    for principal in ordered {
        if let Some(i) = (0..signers.len()).find(|&i| !used[i] && principal.matches(&signers[i])) {
            used[i] = true;
            matched += 1;
            if matched >= n_out_of {
                return true;
            }
        }
    }
    false
}

/// One member organization of a channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizationConfig {
    pub msp_id: String,
    /// PEM root CA certificates.
    pub root_certs: Vec<Vec<u8>>,
    /// PEM certificates of the organization's administrators.
    pub admin_certs: Vec<Vec<u8>>,
    /// `host:port` of anchor peers.
    pub anchor_endpoints: Vec<String>,
    pub policies: BTreeMap<String, PolicyRule>,
}

impl OrganizationConfig {
    pub fn new(msp_id: impl Into<String>, root_certs: Vec<Vec<u8>>) -> Self {
        let msp_id = msp_id.into();
        Self {
            policies: Self::default_policies(&msp_id),
            msp_id,
            root_certs,
            admin_certs: Vec::new(),
            anchor_endpoints: Vec::new(),
        }
    }

    /// Readers/Writers: one member. Admins: one admin.
    pub fn default_policies(msp_id: &str) -> BTreeMap<String, PolicyRule> {
        let member = PolicyRule::Signature {
            identities: vec![Principal::member(msp_id)],
            n_out_of: 1,
        };
        let admin = PolicyRule::Signature {
            identities: vec![Principal::admin(msp_id)],
            n_out_of: 1,
        };
        BTreeMap::from([
            (READERS_POLICY.to_string(), member.clone()),
            (WRITERS_POLICY.to_string(), member),
            (ADMINS_POLICY.to_string(), admin),
        ])
    }

    /// Named policy, falling back to the organization defaults.
    pub fn policy(&self, name: &str) -> PolicyRule {
        self.policies
            .get(name)
            .cloned()
            .or_else(|| Self::default_policies(&self.msp_id).remove(name))
            .unwrap_or(PolicyRule::Signature {
                identities: Vec::new(),
                n_out_of: 1,
            })
    }
}

/// The application part of a channel: what a peer proposes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationConfig {
    pub channel_id: String,
    /// Consortium the founding organizations belong to.
    pub consortium: String,
    pub organizations: Vec<OrganizationConfig>,
    pub policies: BTreeMap<String, PolicyRule>,
    /// Overrides the orderer's batch parameters for this channel.
    pub batch: Option<BatchParameters>,
}

impl ApplicationConfig {
    pub fn new(
        channel_id: impl Into<String>,
        consortium: impl Into<String>,
        organizations: Vec<OrganizationConfig>,
    ) -> Self {
        Self {
            channel_id: channel_id.into(),
            consortium: consortium.into(),
            organizations,
            policies: Self::default_policies(),
            batch: None,
        }
    }

    /// Readers/Writers: any org. Admins: majority of org admins.
    pub fn default_policies() -> BTreeMap<String, PolicyRule> {
        BTreeMap::from([
            (
                READERS_POLICY.to_string(),
                PolicyRule::implicit(ImplicitMetaRule::Any, READERS_POLICY),
            ),
            (
                WRITERS_POLICY.to_string(),
                PolicyRule::implicit(ImplicitMetaRule::Any, WRITERS_POLICY),
            ),
            (
                ADMINS_POLICY.to_string(),
                PolicyRule::implicit(ImplicitMetaRule::Majority, ADMINS_POLICY),
            ),
        ])
    }

    pub fn organization(&self, msp_id: &str) -> Option<&OrganizationConfig> {
        self.organizations.iter().find(|o| o.msp_id == msp_id)
    }

    /// Name, non-empty membership, unique MSP ids, roots present.
    pub fn validate(&self) -> Result<(), CodecError> {
        validate_channel_id(&self.channel_id)?;
        if self.organizations.is_empty() {
            return Err(CodecError::structural("channel has no member organizations"));
        }
        for (i, org) in self.organizations.iter().enumerate() {
            if org.msp_id.is_empty() {
                return Err(CodecError::structural("organization msp id is empty"));
            }
            if org.root_certs.is_empty() {
                return Err(CodecError::Structural(format!(
                    "organization {} has no root certificates",
                    org.msp_id
                )));
            }
            if self.organizations[..i].iter().any(|o| o.msp_id == org.msp_id) {
                return Err(CodecError::Structural(format!(
                    "organization {} listed twice",
                    org.msp_id
                )));
            }
        }
        Ok(())
    }
}

/// The orderer's part of a channel configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrdererSection {
    pub msp_id: String,
    pub root_certs: Vec<Vec<u8>>,
    pub endpoints: Vec<String>,
    pub batch: BatchParameters,
}

/// Merged (orderer + application) configuration carried by config blocks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelConfig {
    pub channel_id: String,
    /// Incremented by every config block; 0 at genesis.
    pub sequence: u64,
    pub consortium: String,
    pub orderer: OrdererSection,
    pub application: ApplicationConfig,
}

impl ChannelConfig {
    /// Effective batch parameters: application override, else orderer.
    pub fn batch(&self) -> BatchParameters {
        self.application.batch.unwrap_or(self.orderer.batch)
    }

    /// Evaluate a channel-level policy by name.
    pub fn evaluate_policy(&self, name: &str, signers: &[VerifiedSigner]) -> bool {
        let rule = self
            .application
            .policies
            .get(name)
            .cloned()
            .or_else(|| ApplicationConfig::default_policies().remove(name));
        match rule {
            Some(rule) => rule.evaluate(signers, &self.application.organizations),
            None => false,
        }
    }

    pub fn member(&self, msp_id: &str) -> Option<&OrganizationConfig> {
        self.application.organization(msp_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signer(msp: &str, admin: bool) -> VerifiedSigner {
        VerifiedSigner {
            msp_id: msp.to_string(),
            is_admin: admin,
        }
    }

    fn orgs(ids: &[&str]) -> Vec<OrganizationConfig> {
        ids.iter()
            .map(|id| OrganizationConfig::new(*id, vec![b"root".to_vec()]))
            .collect()
    }

    #[test]
    fn test_channel_id_rules() {
        assert!(validate_channel_id("mychannel").is_ok());
        assert!(validate_channel_id("a.b-c9").is_ok());
        assert!(validate_channel_id("").is_err());
        assert!(validate_channel_id("MyChannel").is_err());
        assert!(validate_channel_id("9chan").is_err());
        assert!(validate_channel_id("chan/../x").is_err());
        assert!(validate_channel_id(&"a".repeat(250)).is_err());
        assert!(validate_channel_id(&"a".repeat(249)).is_ok());
    }

    #[test]
    fn test_signature_policy_needs_distinct_signers() {
        let rule = PolicyRule::Signature {
            identities: vec![Principal::member("Org1MSP"), Principal::admin("Org1MSP")],
            n_out_of: 2,
        };
        assert!(!rule.evaluate(&[signer("Org1MSP", true)], &[]));
        assert!(rule.evaluate(&[signer("Org1MSP", false), signer("Org1MSP", true)], &[]));
        assert!(!rule.evaluate(&[signer("Org1MSP", false), signer("Org1MSP", false)], &[]));
    }

    #[test]
    fn test_implicit_meta_rules() {
        let members = orgs(&["Org1MSP", "Org2MSP", "Org3MSP"]);
        let any = PolicyRule::implicit(ImplicitMetaRule::Any, WRITERS_POLICY);
        let all = PolicyRule::implicit(ImplicitMetaRule::All, WRITERS_POLICY);
        let majority = PolicyRule::implicit(ImplicitMetaRule::Majority, ADMINS_POLICY);

        let one = [signer("Org1MSP", false)];
        assert!(any.evaluate(&one, &members));
        assert!(!all.evaluate(&one, &members));

        let two_admins = [signer("Org1MSP", true), signer("Org2MSP", true)];
        assert!(majority.evaluate(&two_admins, &members));
        assert!(!majority.evaluate(&[signer("Org1MSP", true)], &members));
        assert!(!all.evaluate(&one, &[]));
    }

    #[test]
    fn test_channel_policy_defaults() {
        let app = ApplicationConfig::new("mychannel", "SampleConsortium", orgs(&["Org1MSP"]));
        let config = ChannelConfig {
            channel_id: "mychannel".into(),
            sequence: 0,
            consortium: "SampleConsortium".into(),
            orderer: OrdererSection {
                msp_id: "OrdererMSP".into(),
                root_certs: vec![],
                endpoints: vec![],
                batch: BatchParameters::default(),
            },
            application: app,
        };
        assert!(config.evaluate_policy(WRITERS_POLICY, &[signer("Org1MSP", false)]));
        assert!(!config.evaluate_policy(WRITERS_POLICY, &[signer("Org9MSP", false)]));
        assert!(!config.evaluate_policy(ADMINS_POLICY, &[signer("Org1MSP", false)]));
        assert!(config.evaluate_policy(ADMINS_POLICY, &[signer("Org1MSP", true)]));
        assert!(!config.evaluate_policy("Nonexistent", &[signer("Org1MSP", true)]));
        assert_eq!(config.batch(), BatchParameters::default());
    }

    #[test]
    fn test_application_validate() {
        let mut app = ApplicationConfig::new("mychannel", "C", orgs(&["Org1MSP"]));
        assert!(app.validate().is_ok());
        app.organizations.push(app.organizations[0].clone());
        assert!(app.validate().is_err());
        app.organizations.clear();
        assert!(app.validate().is_err());
    }
}
