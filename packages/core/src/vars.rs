//! Variable scopes and per-host merging
//!
//! Every variable holds an ordered list of values. Global defines are
//! scalars and merge in as one-element lists.

use std::collections::BTreeMap;

/// Variable name to ordered values
pub type Variables = BTreeMap<String, Vec<String>>;

/// Name of the computed hostname variable
pub const HOSTNAME_VAR: &str = "hostname";
/// Path of the script source, empty when loaded from a string
pub const FILENAME_VAR: &str = "__filename__";
/// Name of the run context executing the script
pub const RUNNER_VAR: &str = "__runner__";
/// Name of the enclosing script, empty at top level
pub const PARENT_VAR: &str = "__exscript__";

/// Global defines plus per-host overlays
#[derive(Debug, Clone, Default)]
pub struct VariableStore {
    globals: BTreeMap<String, String>,
    host_overlays: BTreeMap<String, Variables>,
}

impl VariableStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Define variables visible to every host
    pub fn define<I, K, V>(&mut self, vars: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.globals
            .extend(vars.into_iter().map(|(k, v)| (k.into(), v.into())));
    }

    /// Define variables for one host, replacing earlier values of the same keys
    pub fn define_host<I, K, V>(&mut self, hostname: &str, vars: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let overlay = self.host_overlays.entry(hostname.to_string()).or_default();
        for (key, value) in vars {
            overlay.insert(key.into(), vec![value.into()]);
        }
    }

    /// Append one value to a host variable, creating the list if needed
    pub fn append_host_value(&mut self, hostname: &str, key: &str, value: impl Into<String>) {
        self.host_overlays
            .entry(hostname.to_string())
            .or_default()
            .entry(key.to_string())
            .or_default()
            .push(value.into());
    }

    pub fn globals(&self) -> &BTreeMap<String, String> {
        &self.globals
    }

    pub fn overlay(&self, hostname: &str) -> Option<&Variables> {
        self.host_overlays.get(hostname)
    }

    /// Merge all scopes for one host
    ///
    /// Precedence, low to high: globals, host overlay, URL variables, then
    /// the computed `hostname`. The returned map is independent of the store.
    pub fn merge(&self, hostname: &str, url_vars: &Variables, domain: &str) -> Variables {
        let mut merged: Variables = self
            .globals
            .iter()
            .map(|(k, v)| (k.clone(), vec![v.clone()]))
            .collect();

        if let Some(overlay) = self.host_overlays.get(hostname) {
            merged.extend(overlay.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
        merged.extend(url_vars.iter().map(|(k, v)| (k.clone(), v.clone())));
        merged.insert(
            HOSTNAME_VAR.to_string(),
            vec![qualify_hostname(hostname, domain)],
        );
        merged
    }
}

/// Append `domain` to a bare hostname
///
/// Hostnames that already contain a dot, and empty domains, leave the name unchanged.
pub fn qualify_hostname(hostname: &str, domain: &str) -> String {
    let domain = domain.trim_start_matches('.');
    if hostname.contains('.') || domain.is_empty() {
        hostname.to_string()
    } else {
        format!("{hostname}.{domain}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &[&str])]) -> Variables {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.iter().map(|s| s.to_string()).collect()))
            .collect()
    }

    #[test]
    fn test_qualify_hostname() {
        assert_eq!(qualify_hostname("r1", "example.com"), "r1.example.com");
        assert_eq!(qualify_hostname("r1.lab", "example.com"), "r1.lab");
        assert_eq!(qualify_hostname("r1", ""), "r1");
    }

    #[test]
    fn test_merge_precedence() {
        let mut store = VariableStore::new();
        store.define([("site", "global"), ("user", "global"), ("vlan", "1")]);
        store.define_host("r1", [("site", "overlay"), ("user", "overlay")]);

        let url_vars = vars(&[("user", &["url"])]);
        let merged = store.merge("r1", &url_vars, "");

        assert_eq!(merged["vlan"], vec!["1"]);
        assert_eq!(merged["site"], vec!["overlay"]);
        assert_eq!(merged["user"], vec!["url"]);
    }

    #[test]
    fn test_computed_hostname_overrides_user_value() {
        let mut store = VariableStore::new();
        store.define([("hostname", "bogus")]);
        let url_vars = vars(&[("hostname", &["also-bogus"])]);

        let merged = store.merge("r1", &url_vars, "example.com");
        assert_eq!(merged[HOSTNAME_VAR], vec!["r1.example.com"]);

        let merged = store.merge("r1.lab", &Variables::new(), "example.com");
        assert_eq!(merged[HOSTNAME_VAR], vec!["r1.lab"]);
    }

    #[test]
    fn test_define_host_overwrites_and_append_accumulates() {
        let mut store = VariableStore::new();
        store.append_host_value("r1", "vlan", "10");
        store.append_host_value("r1", "vlan", "20");
        assert_eq!(store.overlay("r1").unwrap()["vlan"], vec!["10", "20"]);

        store.define_host("r1", [("vlan", "99")]);
        assert_eq!(store.overlay("r1").unwrap()["vlan"], vec!["99"]);
    }

    #[test]
    fn test_merge_returns_independent_maps() {
        let mut store = VariableStore::new();
        store.define_host("r1", [("x", "1")]);

        let mut first = store.merge("r1", &Variables::new(), "");
        first.get_mut("x").unwrap().push("mutated".to_string());

        let second = store.merge("r1", &Variables::new(), "");
        assert_eq!(second["x"], vec!["1"]);
        assert!(store.merge("r2", &Variables::new(), "").get("x").is_none());
    }
}
