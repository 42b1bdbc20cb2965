//! Which classes get patched, and with what.

use std::fmt;

/// Package holding the string lookup implementations.
pub const LOOKUP_PACKAGE: &str = "org/apache/commons/text/lookup/";
pub const LOOKUP_METHOD: &str = "lookup";
pub const LOOKUP_DESCRIPTOR: &str = "(Ljava/lang/String;)Ljava/lang/String;";

#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    #[error("Level of patching outside the available range.")]
    InvalidMode(i64),
}

/// How much of the lookup surface to disable.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum PatchMode {
    /// `0`: the script lookup only.
    #[default]
    ScriptOnly,
    /// `1`: script, DNS and URL lookups.
    ScriptDnsUrl,
}

impl TryFrom<i64> for PatchMode {
    type Error = ResolveError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(PatchMode::ScriptOnly),
            1 => Ok(PatchMode::ScriptDnsUrl),
            other => Err(ResolveError::InvalidMode(other)),
        }
    }
}

impl PatchMode {
    /// Lookups disabled by this mode, in patch order.
    pub fn kinds(self) -> &'static [LookupKind] {
        match self {
            PatchMode::ScriptOnly => &[LookupKind::Script],
            PatchMode::ScriptDnsUrl => &[LookupKind::Script, LookupKind::Dns, LookupKind::Url],
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LookupKind {
    Script,
    Dns,
    Url,
}

impl LookupKind {
    pub fn name(self) -> &'static str {
        match self {
            LookupKind::Script => "Script",
            LookupKind::Dns => "Dns",
            LookupKind::Url => "Url",
        }
    }
}

impl fmt::Display for LookupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One method to replace inside the archive.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PatchTarget {
    /// Internal class name, e.g. `org/apache/commons/text/lookup/ScriptStringLookup`.
    pub container_path: String,
    pub method_name: String,
    pub method_signature: String,
    pub replacement_source: String,
}

impl PatchTarget {
    pub fn for_lookup(kind: LookupKind) -> Self {
        let container_path = format!("{}{}StringLookup", LOOKUP_PACKAGE, kind.name());
        let replacement_source = format!(
            "return \"{}.{} method called; this overrides the output <patch Text4Shell>\";",
            container_path, LOOKUP_METHOD
        );
        PatchTarget {
            container_path,
            method_name: LOOKUP_METHOD.to_string(),
            method_signature: LOOKUP_DESCRIPTOR.to_string(),
            replacement_source,
        }
    }

    /// Path of the class file inside the archive.
    pub fn entry_path(&self) -> String {
        format!("{}.class", self.container_path)
    }
}

impl fmt::Display for PatchTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}{}", self.container_path, self.method_name, self.method_signature)
    }
}

/// Expand a mode into its targets, in patch order.
pub fn resolve(mode: PatchMode) -> Vec<PatchTarget> {
    mode.kinds().iter().copied().map(PatchTarget::for_lookup).collect()
}

/// [`resolve`] for a raw numeric mode.
pub fn resolve_mode(mode: i64) -> Result<Vec<PatchTarget>, ResolveError> {
    Ok(resolve(PatchMode::try_from(mode)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_zero_is_script_only() {
        let targets = resolve_mode(0).unwrap();
        assert_eq!(targets.len(), 1);
        assert_eq!(
            targets[0].container_path,
            "org/apache/commons/text/lookup/ScriptStringLookup"
        );
        assert_eq!(
            targets[0].entry_path(),
            "org/apache/commons/text/lookup/ScriptStringLookup.class"
        );
        assert_eq!(targets[0].method_name, "lookup");
        assert_eq!(
            targets[0].method_signature,
            "(Ljava/lang/String;)Ljava/lang/String;"
        );
        assert_eq!(
            targets[0].replacement_source,
            "return \"org/apache/commons/text/lookup/ScriptStringLookup.lookup method called; \
             this overrides the output <patch Text4Shell>\";"
        );
    }

    #[test]
    fn mode_one_keeps_order() {
        let paths: Vec<_> = resolve_mode(1)
            .unwrap()
            .into_iter()
            .map(|t| t.container_path)
            .collect();
        assert_eq!(
            paths,
            vec![
                "org/apache/commons/text/lookup/ScriptStringLookup",
                "org/apache/commons/text/lookup/DnsStringLookup",
                "org/apache/commons/text/lookup/UrlStringLookup",
            ]
        );
    }

    #[test]
    fn out_of_range_modes() {
        for mode in [-1, 2, 3, i64::MAX] {
            assert_eq!(resolve_mode(mode), Err(ResolveError::InvalidMode(mode)));
        }
    }

    #[test]
    fn default_mode() {
        assert_eq!(PatchMode::default(), PatchMode::ScriptOnly);
    }
}
