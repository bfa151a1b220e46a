//! Matchers and attribute sets sent to the credential backend.
//!
//! Every backend call is described by plain data built here. Building is
//! pure: the same scope and inputs always produce the same matcher.

use crate::accessibility::Accessibility;

/// How many records a lookup may return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, uniffi::Enum)]
pub enum MatchLimit {
    /// The first matching record only.
    One,
    /// Every matching record.
    All,
}

/// Attribute matcher: a conjunction of equality constraints plus result
/// shaping flags. `None` leaves an attribute unconstrained, except for
/// `synchronizable`, where `None` follows the backend default (on Apple
/// keychains only non-synchronizable records match).
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Record)]
pub struct ItemQuery {
    /// Logical key. `None` matches every key in scope.
    pub account: Option<String>,
    /// Namespace the key lives in.
    pub service: Option<String>,
    /// Cross-app sharing scope.
    pub access_group: Option<String>,
    /// Synchronization state to match.
    pub synchronizable: Option<bool>,
    /// Accessibility policy to match.
    pub accessibility: Option<Accessibility>,
    /// Whether matched value bytes are returned.
    pub return_data: bool,
    /// Whether matched record attributes are returned.
    pub return_attributes: bool,
    /// Result count limit.
    pub match_limit: MatchLimit,
    /// Targets the data-protection keychain on macOS.
    pub use_data_protection_keychain: bool,
}

/// Attributes of a record to insert.
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Record)]
pub struct ItemAttributes {
    /// Logical key.
    pub account: String,
    /// Namespace the key lives in.
    pub service: Option<String>,
    /// Cross-app sharing scope.
    pub access_group: Option<String>,
    /// Synchronization state. `None` leaves the backend default (not synced).
    pub synchronizable: Option<bool>,
    /// Accessibility policy. `None` leaves the backend default
    /// ([`Accessibility::WhenUnlocked`]).
    pub accessibility: Option<Accessibility>,
    /// Encoded value.
    pub value: Vec<u8>,
    /// Targets the data-protection keychain on macOS.
    pub use_data_protection_keychain: bool,
}

/// Attributes rewritten by an in-place update.
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Record)]
pub struct ItemChanges {
    /// New encoded value.
    pub value: Vec<u8>,
    /// New synchronization state, if any.
    pub synchronizable: Option<bool>,
    /// Requested accessibility policy. Backends refuse to change the policy of
    /// an existing record, which is what triggers a migration.
    pub accessibility: Option<Accessibility>,
    /// Targets the data-protection keychain on macOS.
    pub use_data_protection_keychain: bool,
}

/// Namespace and options shared by every operation of one call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryScope {
    /// Namespace (keychain service) keys live in.
    pub service: Option<String>,
    /// Cross-app sharing scope.
    pub access_group: Option<String>,
    /// Requested synchronization state for writes, deletes and bulk filters.
    pub synchronizable: Option<bool>,
    /// Requested accessibility policy for writes, deletes and bulk filters.
    pub accessibility: Option<Accessibility>,
    /// Targets the data-protection keychain on macOS.
    pub use_data_protection_keychain: bool,
}

impl QueryScope {
    /// Creates a scope for the given service with every option unset.
    #[must_use]
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: Some(service.into()),
            ..Self::default()
        }
    }

    /// Restricts the scope to an access group.
    #[must_use]
    pub fn with_access_group(mut self, access_group: impl Into<String>) -> Self {
        self.access_group = Some(access_group.into());
        self
    }

    /// Sets the requested synchronization state.
    #[must_use]
    pub const fn with_synchronizable(mut self, synchronizable: bool) -> Self {
        self.synchronizable = Some(synchronizable);
        self
    }

    /// Sets the requested accessibility policy.
    #[must_use]
    pub const fn with_accessibility(mut self, accessibility: Accessibility) -> Self {
        self.accessibility = Some(accessibility);
        self
    }

    /// Selects the data-protection keychain.
    #[must_use]
    pub const fn with_data_protection_keychain(mut self, enabled: bool) -> Self {
        self.use_data_protection_keychain = enabled;
        self
    }

    /// Starts a matcher in this scope. Only service, access group and the
    /// keychain selector are inherited; everything else is opt-in.
    #[must_use]
    pub const fn query(&self) -> QueryBuilder<'_> {
        QueryBuilder {
            scope: self,
            key: None,
            synchronizable: None,
            accessibility: None,
            return_data: false,
            return_attributes: false,
            match_limit: MatchLimit::One,
        }
    }

    /// Attributes for inserting `key` with the scope's requested
    /// synchronization state and accessibility.
    #[must_use]
    pub fn attributes(&self, key: &str, value: &str) -> ItemAttributes {
        ItemAttributes {
            account: key.to_string(),
            service: self.service.clone(),
            access_group: self.access_group.clone(),
            synchronizable: self.synchronizable,
            accessibility: self.accessibility,
            value: value.as_bytes().to_vec(),
            use_data_protection_keychain: self.use_data_protection_keychain,
        }
    }

    /// Changes for updating an existing record in place.
    #[must_use]
    pub fn changes(&self, value: &str) -> ItemChanges {
        ItemChanges {
            value: value.as_bytes().to_vec(),
            synchronizable: self.synchronizable,
            accessibility: self.accessibility,
            use_data_protection_keychain: self.use_data_protection_keychain,
        }
    }
}

/// Builder for an [`ItemQuery`] rooted in a [`QueryScope`].
#[derive(Debug, Clone, Copy)]
#[must_use]
pub struct QueryBuilder<'a> {
    scope: &'a QueryScope,
    key: Option<&'a str>,
    synchronizable: Option<bool>,
    accessibility: Option<Accessibility>,
    return_data: bool,
    return_attributes: bool,
    match_limit: MatchLimit,
}

impl<'a> QueryBuilder<'a> {
    /// Constrains the matcher to one logical key.
    pub const fn key(mut self, key: &'a str) -> Self {
        self.key = Some(key);
        self
    }

    /// Constrains the synchronization state. `None` keeps the backend default.
    pub const fn synchronizable(mut self, synchronizable: Option<bool>) -> Self {
        self.synchronizable = synchronizable;
        self
    }

    /// Constrains the accessibility policy.
    pub const fn accessibility(mut self, accessibility: Option<Accessibility>) -> Self {
        self.accessibility = accessibility;
        self
    }

    /// Requests the value bytes of the match.
    pub const fn return_data(mut self) -> Self {
        self.return_data = true;
        self
    }

    /// Requests every match, with attributes and value bytes.
    pub const fn all(mut self) -> Self {
        self.return_data = true;
        self.return_attributes = true;
        self.match_limit = MatchLimit::All;
        self
    }

    /// Finishes the matcher.
    #[must_use]
    pub fn build(self) -> ItemQuery {
        ItemQuery {
            account: self.key.map(str::to_string),
            service: self.scope.service.clone(),
            access_group: self.scope.access_group.clone(),
            synchronizable: self.synchronizable,
            accessibility: self.accessibility,
            return_data: self.return_data,
            return_attributes: self.return_attributes,
            match_limit: self.match_limit,
            use_data_protection_keychain: self.scope.use_data_protection_keychain,
        }
    }
}
