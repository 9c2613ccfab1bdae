//! Job listing entity and its enumerations.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationErrors};

use crate::entity::{Entity, EntityDescriptor};
use crate::error::DomainError;

/// Persisted shape of [`JobListing`].
pub static JOB_LISTINGS: EntityDescriptor = EntityDescriptor {
    name: "JobListing",
    collection: "job_listings",
    fields: &[
        "id",
        "ext_id",
        "title",
        "company",
        "source_url",
        "date_posted",
        "date_created",
        "salary_currency",
        "min_salary_monthly",
        "max_salary_monthly",
        "location",
        "workplace_type",
        "expected_experience",
        "min_experience_years",
        "max_experience_years",
        "expected_skills",
        "description",
    ],
    indexed_fields: &["title", "ext_id"],
    default_order: &[("date_created", false)],
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub enum Currency {
    #[serde(rename = "USD", alias = "usd")]
    UsDollar,
    #[serde(rename = "EUR", alias = "eur")]
    Euro,
    #[serde(rename = "GBP", alias = "gbp")]
    UkPound,
    #[serde(rename = "TRY", alias = "try")]
    TurkishLira,
}

/// Where the work happens. Accepts its name or its numeric code (1-3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", try_from = "EnumCode")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub enum WorkplaceType {
    OnSite,
    Remote,
    Hybrid,
}

impl TryFrom<EnumCode> for WorkplaceType {
    type Error = DomainError;

    fn try_from(code: EnumCode) -> Result<Self, Self::Error> {
        match code.normalized().as_str() {
            "1" | "on_site" | "onsite" => Ok(Self::OnSite),
            "2" | "remote" => Ok(Self::Remote),
            "3" | "hybrid" => Ok(Self::Hybrid),
            other => Err(DomainError::validation(format!(
                "Unknown workplace type '{}'",
                other
            ))),
        }
    }
}

/// Seniority expected from candidates. Accepts its name or its numeric code (1-4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", try_from = "EnumCode")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub enum ExperienceLevel {
    Entry,
    Mid,
    Senior,
    Executive,
}

impl TryFrom<EnumCode> for ExperienceLevel {
    type Error = DomainError;

    fn try_from(code: EnumCode) -> Result<Self, Self::Error> {
        match code.normalized().as_str() {
            "1" | "entry" => Ok(Self::Entry),
            "2" | "mid" => Ok(Self::Mid),
            "3" | "senior" => Ok(Self::Senior),
            "4" | "executive" => Ok(Self::Executive),
            other => Err(DomainError::validation(format!(
                "Unknown experience level '{}'",
                other
            ))),
        }
    }
}

/// Wire form of the coded enumerations: a number or a name.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum EnumCode {
    Number(i64),
    Name(String),
}

impl EnumCode {
    fn normalized(&self) -> String {
        match self {
            EnumCode::Number(n) => n.to_string(),
            EnumCode::Name(s) => s.trim().to_lowercase().replace(['-', ' '], "_"),
        }
    }
}

/// Job listing fields without the store identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct JobListingData {
    /// Identifier of the listing on its source site
    #[validate(length(min = 1))]
    pub ext_id: String,
    #[validate(length(min = 1))]
    pub title: String,
    #[validate(length(min = 1))]
    pub company: String,
    #[validate(url)]
    pub source_url: String,

    /// When the listing was posted on its source
    pub date_posted: DateTime<Utc>,
    /// When the listing was added to this system
    #[serde(default = "Utc::now")]
    pub date_created: DateTime<Utc>,

    pub salary_currency: Currency,
    #[validate(range(min = 0.0))]
    pub min_salary_monthly: Option<f64>,
    #[validate(range(min = 0.0))]
    pub max_salary_monthly: Option<f64>,

    #[validate(length(min = 1))]
    pub location: String,
    pub workplace_type: WorkplaceType,

    pub expected_experience: Option<ExperienceLevel>,
    #[validate(range(min = 0))]
    pub min_experience_years: Option<i32>,
    #[validate(range(min = 0))]
    pub max_experience_years: Option<i32>,

    #[serde(default, deserialize_with = "skills::deserialize")]
    pub expected_skills: Option<Vec<String>>,

    #[validate(length(min = 1))]
    pub description: String,
}

/// Stored job listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct JobListing {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    #[serde(flatten)]
    pub data: JobListingData,
}

// Fields are flattened on the wire, so errors are reported without a `data.` prefix.
impl Validate for JobListing {
    fn validate(&self) -> Result<(), ValidationErrors> {
        self.data.validate()
    }
}

impl From<JobListingData> for JobListing {
    fn from(data: JobListingData) -> Self {
        Self { id: None, data }
    }
}

impl Entity for JobListing {
    type Data = JobListingData;

    fn descriptor() -> &'static EntityDescriptor {
        &JOB_LISTINGS
    }

    fn id(&self) -> Option<Uuid> {
        self.id
    }

    fn set_id(&mut self, id: Uuid) {
        self.id = Some(id);
    }
}

/// Lenient deserializer for skill tags.
///
/// Accepts a list of strings or a single string split on
/// [`SKILL_SEPARATORS`](crate::constants::SKILL_SEPARATORS). Blank input
/// yields `None`.
mod skills {
    use super::*;
    use serde::de::{self, Deserializer, SeqAccess, Visitor};

    use crate::constants::SKILL_SEPARATORS;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(SkillsVisitor)
    }

    struct SkillsVisitor;

    fn split(value: &str) -> Option<Vec<String>> {
        let skills: Vec<String> = value
            .split(SKILL_SEPARATORS)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        (!skills.is_empty()).then_some(skills)
    }

    impl<'de> Visitor<'de> for SkillsVisitor {
        type Value = Option<Vec<String>>;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a list of skills or a separated string")
        }

        fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(None)
        }

        fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(None)
        }

        fn visit_some<D: Deserializer<'de>>(self, d: D) -> Result<Self::Value, D::Error> {
            d.deserialize_any(SkillsVisitor)
        }

        fn visit_str<E: de::Error>(self, value: &str) -> Result<Self::Value, E> {
            Ok(split(value))
        }

        fn visit_u64<E: de::Error>(self, value: u64) -> Result<Self::Value, E> {
            Ok(Some(vec![value.to_string()]))
        }

        fn visit_i64<E: de::Error>(self, value: i64) -> Result<Self::Value, E> {
            Ok(Some(vec![value.to_string()]))
        }

        fn visit_f64<E: de::Error>(self, value: f64) -> Result<Self::Value, E> {
            Ok(Some(vec![value.to_string()]))
        }

        fn visit_bool<E: de::Error>(self, value: bool) -> Result<Self::Value, E> {
            Ok(Some(vec![value.to_string()]))
        }

        fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
            let mut skills = Vec::new();
            while let Some(skill) = seq.next_element::<String>()? {
                let skill = skill.trim();
                if !skill.is_empty() {
                    skills.push(skill.to_string());
                }
            }
            Ok((!skills.is_empty()).then_some(skills))
        }
    }
}
