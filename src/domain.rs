use crate::model::Principal;
use std::collections::HashMap;
use tracing::warn;

/// Translates principal identifiers from the source organization's domain to
/// the destination's.
///
/// Explicit overrides win over the default rule; the default rule swaps the
/// email domain suffix while preserving the local part. Identifiers that do
/// not look like emails are passed through unchanged with a warning — if the
/// resulting principal does not exist on the destination, the write for that
/// pair fails and is reported, never silently dropped.
#[derive(Debug, Clone)]
pub struct DomainMapper {
    domain: String,
    overrides: HashMap<String, String>,
}

impl DomainMapper {
    pub fn new(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            overrides: HashMap::new(),
        }
    }

    pub fn with_overrides(mut self, overrides: HashMap<String, String>) -> Self {
        self.overrides = overrides;
        self
    }

    pub fn translate(&self, email: &str) -> String {
        if let Some(mapped) = self.overrides.get(email) {
            return mapped.clone();
        }
        match email.split_once('@') {
            Some((local, _)) => format!("{}@{}", local, self.domain),
            None => {
                warn!("principal {:?} has no domain suffix, passing through unchanged", email);
                email.to_string()
            }
        }
    }

    /// Translate a principal, dropping the display name: it belongs to the
    /// source account and the destination directory is authoritative.
    pub fn translate_principal(&self, principal: &Principal) -> Principal {
        Principal::new(self.translate(&principal.email))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn swaps_domain_suffix() {
        let mapper = DomainMapper::new("new.example");
        assert_eq!(mapper.translate("alice@old.example"), "alice@new.example");
    }

    #[test]
    fn preserves_local_part_round_trip() {
        let forward = DomainMapper::new("new.example");
        let back = DomainMapper::new("old.example");
        let original = "a.user+tag@old.example";
        assert_eq!(back.translate(&forward.translate(original)), original);
    }

    #[test]
    fn override_beats_default_rule() {
        let overrides =
            HashMap::from([("shared@old.example".to_string(), "team@new.example".to_string())]);
        let mapper = DomainMapper::new("new.example").with_overrides(overrides);
        assert_eq!(mapper.translate("shared@old.example"), "team@new.example");
        assert_eq!(mapper.translate("other@old.example"), "other@new.example");
    }

    #[test]
    fn non_email_passes_through() {
        let mapper = DomainMapper::new("new.example");
        assert_eq!(mapper.translate("anyoneWithLink"), "anyoneWithLink");
    }

    #[test]
    fn translated_principal_drops_source_display_name() {
        let mapper = DomainMapper::new("new.example");
        let principal = Principal::named("alice@old.example", "Alice");
        let translated = mapper.translate_principal(&principal);
        assert_eq!(translated.email, "alice@new.example");
        assert_eq!(translated.name, None);
    }
}
