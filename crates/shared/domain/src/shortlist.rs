//! Listings a user has shortlisted.

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationErrors};

use crate::entity::{Entity, EntityDescriptor};

/// Persisted shape of [`ShortlistedListing`].
pub static SHORTLISTED_LISTINGS: EntityDescriptor = EntityDescriptor {
    name: "ShortlistedListing",
    collection: "shortlisted_listings",
    fields: &["id", "user_id", "listing_id"],
    indexed_fields: &["user_id"],
    default_order: &[],
};

/// Link between a user and a job listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ShortlistedListing {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    pub user_id: Uuid,
    pub listing_id: Uuid,
}

// Both references are typed identifiers; nothing further to check.
impl Validate for ShortlistedListing {
    fn validate(&self) -> Result<(), ValidationErrors> {
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShortlistedListingData {
    pub user_id: Uuid,
    pub listing_id: Uuid,
}

impl From<ShortlistedListingData> for ShortlistedListing {
    fn from(data: ShortlistedListingData) -> Self {
        Self {
            id: None,
            user_id: data.user_id,
            listing_id: data.listing_id,
        }
    }
}

impl Entity for ShortlistedListing {
    type Data = ShortlistedListingData;

    fn descriptor() -> &'static EntityDescriptor {
        &SHORTLISTED_LISTINGS
    }

    fn id(&self) -> Option<Uuid> {
        self.id
    }

    fn set_id(&mut self, id: Uuid) {
        self.id = Some(id);
    }
}
