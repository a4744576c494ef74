//! Allow/deny decisions for the route gates.
//!
//! Each [`Policy`] is an ordered rule table evaluated top to bottom, first match
//! wins. A missing principal is settled before any rule runs.

use super::Claims;

/// Identity asserted by a verified token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub identifier: String,
    pub is_privileged: bool,
}

impl Principal {
    pub fn new(identifier: impl Into<String>, is_privileged: bool) -> Self {
        Self {
            identifier: identifier.into(),
            is_privileged,
        }
    }
}

impl From<Claims> for Principal {
    fn from(claims: Claims) -> Self {
        Self {
            identifier: claims.username,
            is_privileged: claims.is_admin,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    Unauthenticated,
    Unauthorized,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(DenyReason),
}

impl Decision {
    pub fn is_allowed(self) -> bool {
        matches!(self, Decision::Allow)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Policy {
    /// Any principal with a non-empty identifier.
    LoggedIn,
    /// Privileged principals only.
    Admin,
    /// Privileged principals, or the principal that owns the resource.
    AdminOrOwner,
}

struct Rule {
    name: &'static str,
    applies: fn(&Principal, Option<&str>) -> bool,
    outcome: Decision,
}

fn has_identifier(principal: &Principal, _owner: Option<&str>) -> bool {
    !principal.identifier.is_empty()
}

fn is_privileged(principal: &Principal, _owner: Option<&str>) -> bool {
    principal.is_privileged
}

fn owns_resource(principal: &Principal, owner: Option<&str>) -> bool {
    owner == Some(principal.identifier.as_str())
}

const LOGGED_IN_RULES: &[Rule] = &[Rule {
    name: "identified",
    applies: has_identifier,
    outcome: Decision::Allow,
}];

const ADMIN_RULES: &[Rule] = &[Rule {
    name: "privileged",
    applies: is_privileged,
    outcome: Decision::Allow,
}];

const ADMIN_OR_OWNER_RULES: &[Rule] = &[
    Rule {
        name: "privileged",
        applies: is_privileged,
        outcome: Decision::Allow,
    },
    Rule {
        name: "owner",
        applies: owns_resource,
        outcome: Decision::Allow,
    },
];

impl Policy {
    fn rules(self) -> &'static [Rule] {
        match self {
            Policy::LoggedIn => LOGGED_IN_RULES,
            Policy::Admin => ADMIN_RULES,
            Policy::AdminOrOwner => ADMIN_OR_OWNER_RULES,
        }
    }

    /// Outcome when a principal is present but no rule matched.
    fn fallback(self) -> Decision {
        match self {
            // A principal without an identifier never logged in.
            Policy::LoggedIn => Decision::Deny(DenyReason::Unauthenticated),
            Policy::Admin | Policy::AdminOrOwner => Decision::Deny(DenyReason::Unauthorized),
        }
    }

    pub fn decide(self, principal: Option<&Principal>, resource_owner: Option<&str>) -> Decision {
        let Some(principal) = principal else {
            return Decision::Deny(DenyReason::Unauthenticated);
        };

        match self.rules().iter().find(|rule| (rule.applies)(principal, resource_owner)) {
            Some(rule) => {
                tracing::trace!(
                    "{:?}: rule '{}' matched for {}",
                    self,
                    rule.name,
                    principal.identifier
                );
                rule.outcome
            }
            None => self.fallback(),
        }
    }
}

/// Privileged-or-owner decision.
pub fn decide(principal: Option<&Principal>, resource_owner: Option<&str>) -> Decision {
    Policy::AdminOrOwner.decide(principal, resource_owner)
}
