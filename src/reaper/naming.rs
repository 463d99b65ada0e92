//! Names of the resources created on behalf of a node group.
//!
//! Shared resources are named `<prefix><d><group>`. Per-launch key pairs get
//! a unique suffix, `<prefix><d><group><d><suffix>`. Older clients also put
//! the region in key pair names: `<prefix><d><group><d><region><d><hex>`.

use regex::Regex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupNamingConvention {
    prefix: String,
    delimiter: char,
}

impl Default for GroupNamingConvention {
    fn default() -> Self {
        Self::new("stratus", '#')
    }
}

impl GroupNamingConvention {
    pub fn new(prefix: impl Into<String>, delimiter: char) -> Self {
        Self {
            prefix: prefix.into(),
            delimiter,
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn delimiter(&self) -> char {
        self.delimiter
    }

    /// Name of the security group shared by every node in `group`.
    pub fn shared_name_for_group(&self, group: &str) -> String {
        format!("{}{}{}", self.prefix, self.delimiter, group)
    }

    /// A unique per-launch name within `group`.
    pub fn unique_name_for_group(&self, group: &str, suffix: &str) -> String {
        format!("{}{d}{}{d}{}", self.prefix, group, suffix, d = self.delimiter)
    }

    /// The group a unique name belongs to, if it follows this convention.
    ///
    /// ```
    /// use stratus::reaper::GroupNamingConvention;
    ///
    /// let naming = GroupNamingConvention::default();
    /// assert_eq!(naming.group_in_unique_name("stratus#web#1f3a"), Some("web"));
    /// assert_eq!(naming.group_in_unique_name("stratus#web"), None);
    /// ```
    pub fn group_in_unique_name<'a>(&self, name: &'a str) -> Option<&'a str> {
        let rest = name
            .strip_prefix(self.prefix.as_str())?
            .strip_prefix(self.delimiter)?;
        let (group, suffix) = rest.split_once(self.delimiter)?;
        if group.is_empty() || suffix.is_empty() || suffix.contains(self.delimiter) {
            return None;
        }
        Some(group)
    }

    /// Matcher for the key pairs generated for `group` in `region`, under
    /// both the current and the legacy naming scheme.
    pub fn key_pair_matcher(&self, group: &str, region: &str) -> KeyPairMatcher {
        let d = regex::escape(&self.delimiter.to_string());
        let pattern = format!(
            "^{prefix}{d}{group}{d}{region}{d}[0-9a-f]+$",
            prefix = regex::escape(&self.prefix),
            group = regex::escape(group),
            region = regex::escape(region),
        );
        let legacy = match Regex::new(&pattern) {
            Ok(legacy) => Some(legacy),
            Err(e) => {
                tracing::warn!(group = %group, region = %region, error = %e, "Legacy key pair pattern rejected");
                None
            }
        };
        KeyPairMatcher {
            naming: self.clone(),
            group: group.to_string(),
            legacy,
        }
    }
}

/// Decides whether a key pair name was generated for one group.
#[derive(Debug, Clone)]
pub struct KeyPairMatcher {
    naming: GroupNamingConvention,
    group: String,
    legacy: Option<Regex>,
}

impl KeyPairMatcher {
    pub fn matches(&self, key_name: &str) -> bool {
        self.naming.group_in_unique_name(key_name) == Some(self.group.as_str())
            || self.is_legacy(key_name)
    }

    pub fn is_legacy(&self, key_name: &str) -> bool {
        self.legacy
            .as_ref()
            .is_some_and(|legacy| legacy.is_match(key_name))
    }
}
