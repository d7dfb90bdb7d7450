// crates/compliance-core/src/core/identifiers.rs
// ============================================================================
// Module: Compliance Core Identifiers
// Description: Canonical opaque identifiers for clients, submissions, users,
//              and tokens shared across the workspace.
// Purpose: Provide strongly typed, serializable identifiers with stable wire
//          forms, preventing accidental mixing of identifier kinds.
// Dependencies: serde, uuid
// ============================================================================

//! ## Overview
//! Every identifier handed between the agent, server, and store is a v4 UUID
//! wrapped in a distinct newtype. Wrapping gives the compiler the ability to
//! reject `ClientId` where a `SubmissionId` is expected, the same guarantee
//! the numeric identifiers in comparable systems provide for sequence counters.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde::Serialize;
use uuid::Uuid;

// ============================================================================
// SECTION: Macro
// ============================================================================

macro_rules! uuid_identifier {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Generates a new random identifier.
            #[must_use]
            pub fn new_random() -> Self {
                Self(Uuid::new_v4())
            }

            /// Wraps an existing UUID.
            #[must_use]
            pub const fn from_uuid(id: Uuid) -> Self {
                Self(id)
            }

            /// Returns the underlying UUID.
            #[must_use]
            pub const fn get(self) -> Uuid {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s).map(Self)
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }
    };
}

// ============================================================================
// SECTION: Identifier Types
// ============================================================================

uuid_identifier!(
    /// Identifies an enrolled endpoint (agent installation).
    ///
    /// # Invariants
    /// - Stable for the lifetime of the client's enrollment record.
    ClientId
);

uuid_identifier!(
    /// Identifies one accepted submission.
    ///
    /// # Invariants
    /// - Globally unique; server-assigned unless the agent supplies one that
    ///   has not been seen before.
    SubmissionId
);

uuid_identifier!(
    /// Identifies a user account.
    UserId
);

uuid_identifier!(
    /// Identifies a refresh token rotation chain.
    ///
    /// # Invariants
    /// - Shared by every refresh token descended from one login; a replay
    ///   anywhere in the chain burns the whole family.
    TokenFamilyId
);

uuid_identifier!(
    /// Identifies a single refresh token record.
    RefreshTokenId
);

uuid_identifier!(
    /// Identifies an API key record.
    ApiKeyId
);

uuid_identifier!(
    /// Identifies an auth audit log entry.
    AuditEntryId
);
