//! Entity contract shared by every persisted document type.
//!
//! Each entity pairs a canonical type (carrying the store-assigned `id`) with a
//! data-only companion type used as creation input, and declares its persisted
//! shape through a static [`EntityDescriptor`].

use std::fmt::Debug;

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::job_listing::JOB_LISTINGS;
use crate::shortlist::SHORTLISTED_LISTINGS;
use crate::user::USERS;

/// Static registration table of every persisted entity type.
pub static ENTITY_TYPES: &[&EntityDescriptor] = &[&USERS, &JOB_LISTINGS, &SHORTLISTED_LISTINGS];

/// Declared shape of a persisted entity.
#[derive(Debug, PartialEq, Eq)]
pub struct EntityDescriptor {
    /// Entity type name used in errors and logs
    pub name: &'static str,
    /// Collection the documents live in
    pub collection: &'static str,
    /// Every field of the canonical type, `id` included
    pub fields: &'static [&'static str],
    /// Fields the store should index
    pub indexed_fields: &'static [&'static str],
    /// Ordering applied by document services when none is requested
    pub default_order: &'static [(&'static str, bool)],
}

impl EntityDescriptor {
    /// Check whether `field` belongs to the declared field set.
    pub fn has_field(&self, field: &str) -> bool {
        self.fields.contains(&field)
    }

    /// Default ordering as owned [`OrderBy`] values.
    pub fn default_ordering(&self) -> Vec<OrderBy> {
        self.default_order
            .iter()
            .map(|(field, ascending)| OrderBy::new(*field, *ascending))
            .collect()
    }
}

/// A canonical, store-backed entity.
pub trait Entity:
    Serialize + DeserializeOwned + Validate + Clone + Debug + Send + Sync + 'static
{
    /// Companion type mirroring the entity without store-generated fields.
    type Data: Serialize + DeserializeOwned + Clone + Debug + Send + Sync + 'static;

    /// Descriptor of the persisted shape.
    fn descriptor() -> &'static EntityDescriptor;

    /// Store-assigned identifier, if the entity has been persisted.
    fn id(&self) -> Option<Uuid>;

    /// Assign the identifier.
    fn set_id(&mut self, id: Uuid);
}

/// One ordering key: a field name and its direction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct OrderBy {
    pub field_name: String,
    pub ascending: bool,
}

impl OrderBy {
    pub fn new(field_name: impl Into<String>, ascending: bool) -> Self {
        Self {
            field_name: field_name.into(),
            ascending,
        }
    }

    pub fn asc(field_name: impl Into<String>) -> Self {
        Self::new(field_name, true)
    }

    pub fn desc(field_name: impl Into<String>) -> Self {
        Self::new(field_name, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registration_table_covers_all_entities() {
        let names: Vec<_> = ENTITY_TYPES.iter().map(|d| d.name).collect();
        assert_eq!(names, vec!["User", "JobListing", "ShortlistedListing"]);
    }

    #[test]
    fn test_every_descriptor_declares_id_and_its_indexes() {
        for descriptor in ENTITY_TYPES {
            assert!(descriptor.has_field("id"), "{} lacks id", descriptor.name);
            for field in descriptor.indexed_fields {
                assert!(descriptor.has_field(field));
            }
            for (field, _) in descriptor.default_order {
                assert!(descriptor.has_field(field));
            }
        }
    }

    #[test]
    fn test_default_ordering() {
        assert_eq!(
            JOB_LISTINGS.default_ordering(),
            vec![OrderBy::desc("date_created")]
        );
        assert!(USERS.default_ordering().is_empty());
    }
}
