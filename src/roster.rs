use crate::matcher::IdentityMatcher;
use log::warn;
use serde::{Deserialize, Serialize};

/// Canonical person record from the roster sheet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    /// Name exactly as stored in the roster
    pub canonical_name: String,

    /// Lower-cased email address, if the roster has one
    pub email: Option<String>,

    /// Shared token ("intern ID") presented on writes and history reads
    pub credential_id: String,

    /// Free-text status column, e.g. "Active"
    #[serde(default)]
    pub status: String,

    /// Whether the monitor checkbox is ticked
    #[serde(default)]
    pub is_monitor: bool,
}

impl Identity {
    pub fn new(canonical_name: &str, email: Option<&str>, credential_id: &str) -> Self {
        Identity {
            canonical_name: canonical_name.trim().to_string(),
            email: email.and_then(normalize_email),
            credential_id: credential_id.trim().to_string(),
            status: String::new(),
            is_monitor: false,
        }
    }

    /// Exact comparison of the stored and presented credentials, both trimmed
    pub fn credential_matches(&self, presented: &str) -> bool {
        let presented = presented.trim();
        !presented.is_empty() && self.credential_id == presented
    }
}

/// Lower-case and trim an email, `None` when it is not email-like.
pub fn normalize_email(raw: &str) -> Option<String> {
    let email = raw.trim().to_lowercase();
    if is_email_like(&email) {
        Some(email)
    } else {
        None
    }
}

/// Loose syntactic check: one `@` with something on both sides and no spaces.
pub fn is_email_like(raw: &str) -> bool {
    let raw = raw.trim();
    match raw.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && !domain.contains('@')
                && !raw.chars().any(char::is_whitespace)
        }
        None => false,
    }
}

/// Read-only list of identities, in roster order
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Roster {
    identities: Vec<Identity>,
}

impl Roster {
    pub fn new(identities: Vec<Identity>) -> Self {
        Roster { identities }
    }

    pub fn identities(&self) -> &[Identity] {
        &self.identities
    }

    pub fn len(&self) -> usize {
        self.identities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.identities.is_empty()
    }

    pub fn contains_name(&self, canonical_name: &str) -> bool {
        self.identities.iter().any(|i| i.canonical_name == canonical_name)
    }

    /// Case-folded email lookup
    pub fn find_by_email(&self, raw_email: &str) -> Option<&Identity> {
        let email = normalize_email(raw_email)?;
        self.identities
            .iter()
            .find(|i| i.email.as_deref() == Some(email.as_str()))
    }

    /// Resolve a free-text name to a roster identity
    ///
    /// A roster name equal to `raw_name` (trimmed, case-folded) wins over fuzzy
    /// matches, so a person listed both as "Shivam Kumar" and inside
    /// "Shivam Kumar Jha" keeps their own row. Otherwise the first roster
    /// entry the matcher accepts is returned.
    pub fn find_by_name(&self, matcher: &IdentityMatcher, raw_name: &str) -> Option<&Identity> {
        let wanted = raw_name.trim().to_lowercase();
        if wanted.is_empty() {
            return None;
        }

        self.identities
            .iter()
            .find(|i| i.canonical_name.trim().to_lowercase() == wanted)
            .or_else(|| {
                self.identities
                    .iter()
                    .find(|i| matcher.are_equivalent(&i.canonical_name, raw_name))
            })
    }

    /// Check a presented credential for a named person
    ///
    /// The name is resolved like a log row's author; the credential must then
    /// equal the identity's own token, or the configured admin credential.
    ///
    /// # Returns
    /// * `Option<&Identity>` - The authorized identity, `None` on any mismatch
    pub fn authorize(
        &self,
        matcher: &IdentityMatcher,
        name: &str,
        credential: &str,
        admin_credential: Option<&str>,
    ) -> Option<&Identity> {
        let identity = self.find_by_name(matcher, name)?;

        if identity.credential_matches(credential) {
            return Some(identity);
        }

        if let Some(admin) = admin_credential {
            let admin = admin.trim();
            if !admin.is_empty() && admin == credential.trim() {
                return Some(identity);
            }
        }

        warn!("credential mismatch for '{}'", name);
        None
    }
}
