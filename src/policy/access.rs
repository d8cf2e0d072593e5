//! Content protection policy.
//!
//! Decides whether a content item is gated at all, independent of any token:
//! - Unknown content is not gated
//! - A per-item override switches protection off
//! - Only configured content types are gated
//! - Category and tag rules can only confirm protection, never lift it.
//!   An item of a protected type that matches no rule is still protected.

use crate::config::GateConfig;
use crate::content::ContentMeta;

/// Why an item is or is not protected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtectionReason {
    /// The id did not resolve to a content item.
    UnknownContent,
    /// Protection was switched off on the item itself.
    ManuallyDisabled,
    /// The item's type is not in the protected set.
    TypeNotProtected,
    /// The item is in a protected category.
    CategoryRule,
    /// The item carries a protected tag.
    TagRule,
    /// Protected type with no more specific rule.
    Default,
}

impl ProtectionReason {
    /// Human-readable description for admin listings.
    pub fn describe(&self) -> &'static str {
        match self {
            ProtectionReason::UnknownContent => "Content not found",
            ProtectionReason::ManuallyDisabled => "Protection manually disabled",
            ProtectionReason::TypeNotProtected => "Content type not protected",
            ProtectionReason::CategoryRule => "Category protection rule",
            ProtectionReason::TagRule => "Tag protection rule",
            ProtectionReason::Default => "Default protection",
        }
    }
}

/// Protection verdict for one content item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProtectionStatus {
    /// Whether requests for this item must carry a valid token.
    pub protected: bool,
    /// Which rule decided it.
    pub reason: ProtectionReason,
}

impl ProtectionStatus {
    fn protected(reason: ProtectionReason) -> Self {
        Self {
            protected: true,
            reason,
        }
    }

    fn open(reason: ProtectionReason) -> Self {
        Self {
            protected: false,
            reason,
        }
    }
}

/// Evaluate the protection policy for an item.
pub fn protection_status(meta: Option<&ContentMeta>, config: &GateConfig) -> ProtectionStatus {
    let Some(meta) = meta else {
        return ProtectionStatus::open(ProtectionReason::UnknownContent);
    };

    if meta.protection_disabled {
        return ProtectionStatus::open(ProtectionReason::ManuallyDisabled);
    }

    if !config.protected_types.iter().any(|t| *t == meta.content_type) {
        return ProtectionStatus::open(ProtectionReason::TypeNotProtected);
    }

    if meta
        .categories
        .iter()
        .any(|c| config.protected_categories.contains(c))
    {
        return ProtectionStatus::protected(ProtectionReason::CategoryRule);
    }

    if meta.tags.iter().any(|t| config.protected_tags.contains(t)) {
        return ProtectionStatus::protected(ProtectionReason::TagRule);
    }

    ProtectionStatus::protected(ProtectionReason::Default)
}
