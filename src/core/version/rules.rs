// ─── Platform Rules ───
// Allow/disallow rules attached to libraries and launch arguments.

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::core::platform::Platform;

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Rule {
    pub action: RuleAction,
    #[serde(default)]
    pub os: Option<OsRule>,
    #[serde(default)]
    pub features: Option<BTreeMap<String, bool>>,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RuleAction {
    Allow,
    Disallow,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct OsRule {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub arch: Option<String>,
}

impl Rule {
    pub fn allow_os(name: &str) -> Self {
        Self {
            action: RuleAction::Allow,
            os: Some(OsRule {
                name: Some(name.to_string()),
                arch: None,
            }),
            features: None,
        }
    }

    pub fn disallow_os(name: &str) -> Self {
        Self {
            action: RuleAction::Disallow,
            ..Self::allow_os(name)
        }
    }
}

/// Launch features that argument rules may test for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LaunchFeatures {
    pub is_demo_user: bool,
    pub has_custom_resolution: bool,
}

impl LaunchFeatures {
    fn get(&self, name: &str) -> bool {
        match name {
            "is_demo_user" => self.is_demo_user,
            "has_custom_resolution" => self.has_custom_resolution,
            _ => false,
        }
    }
}

/// Decide whether a library takes part in this launch.
///
/// - no rules, no natives: always included
/// - no rules, natives present: included only if a classifier exists for this OS
/// - rules present: the first rule carrying both an action and an OS decides;
///   `allow` includes only that OS, `disallow` excludes only that OS.
///   If no rule decides, the library is included.
pub fn library_allowed(
    rules: Option<&[Rule]>,
    natives: Option<&BTreeMap<String, String>>,
    platform: Platform,
) -> bool {
    let os = platform.mojang_name();
    let Some(rules) = rules else {
        return match natives {
            None => true,
            Some(natives) => natives.contains_key(os),
        };
    };

    for rule in rules {
        let Some(name) = rule.os.as_ref().and_then(|o| o.name.as_deref()) else {
            continue;
        };
        return match rule.action {
            RuleAction::Allow => name == os,
            RuleAction::Disallow => name != os,
        };
    }

    true
}

/// Evaluate rules guarding a modern-format argument.
///
/// Starts disallowed; every matching rule overwrites the decision.
pub fn argument_allowed(rules: &[Rule], platform: Platform, features: LaunchFeatures) -> bool {
    let mut allowed = false;

    for rule in rules {
        let os_matches = match rule.os.as_ref().and_then(|o| o.name.as_deref()) {
            None => true,
            Some(name) => name == platform.mojang_name(),
        };
        let arch_matches = match rule.os.as_ref().and_then(|o| o.arch.as_deref()) {
            None => true,
            Some("x86") => cfg!(target_arch = "x86"),
            Some(_) => true,
        };
        let features_match = rule
            .features
            .as_ref()
            .map(|wanted| wanted.iter().all(|(k, v)| features.get(k) == *v))
            .unwrap_or(true);

        if os_matches && arch_matches && features_match {
            allowed = rule.action == RuleAction::Allow;
        }
    }

    allowed
}
