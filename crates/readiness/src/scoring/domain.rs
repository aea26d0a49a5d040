use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

string_id!(
    /// Identifier of a scorable unit (document, activity, subsection, course certificate).
    ComponentId
);
string_id!(
    /// Identifier of a weighted group of sibling components.
    GroupId
);
string_id!(
    /// Student whose readiness is being tracked.
    StudentId
);
string_id!(
    /// Evaluator identity handed over by the caller's identity layer.
    EvaluatorId
);

/// Independent evaluation track contributing to overall readiness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CategoryId {
    #[serde(rename = "formal_academic")]
    FormalAcademic,
    #[serde(rename = "informal_academic")]
    InformalAcademic,
    #[serde(rename = "pointer_2")]
    Pointer2,
    #[serde(rename = "pointer_3")]
    Pointer3,
    #[serde(rename = "pointer_4")]
    Pointer4,
    #[serde(rename = "enrichment_courses")]
    EnrichmentCourses,
}

impl CategoryId {
    pub const ALL: [CategoryId; 6] = [
        CategoryId::FormalAcademic,
        CategoryId::InformalAcademic,
        CategoryId::Pointer2,
        CategoryId::Pointer3,
        CategoryId::Pointer4,
        CategoryId::EnrichmentCourses,
    ];

    pub const fn key(self) -> &'static str {
        match self {
            CategoryId::FormalAcademic => "formal_academic",
            CategoryId::InformalAcademic => "informal_academic",
            CategoryId::Pointer2 => "pointer_2",
            CategoryId::Pointer3 => "pointer_3",
            CategoryId::Pointer4 => "pointer_4",
            CategoryId::EnrichmentCourses => "enrichment_courses",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            CategoryId::FormalAcademic => "Formal Academic",
            CategoryId::InformalAcademic => "Informal Academic",
            CategoryId::Pointer2 => "Pointer 2",
            CategoryId::Pointer3 => "Pointer 3",
            CategoryId::Pointer4 => "Pointer 4",
            CategoryId::EnrichmentCourses => "Enrichment Courses",
        }
    }
}

impl fmt::Display for CategoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Raised when a category key does not name a known track.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown category key '{0}'")]
pub struct UnknownCategoryKey(pub String);

impl FromStr for CategoryId {
    type Err = UnknownCategoryKey;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let normalized = raw.trim().to_ascii_lowercase().replace('-', "_");
        CategoryId::ALL
            .into_iter()
            .find(|category| category.key() == normalized)
            .ok_or_else(|| UnknownCategoryKey(raw.to_string()))
    }
}

/// Closed set of scorable unit kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitKind {
    Document,
    Activity,
    CourseCertificate,
    Subsection,
}

/// Something an evaluator can score. Aggregation only reads the shared component id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScorableUnit {
    Document {
        component_id: ComponentId,
        title: String,
        #[serde(default)]
        document_type: Option<String>,
    },
    Activity {
        component_id: ComponentId,
        name: String,
        #[serde(default)]
        description: Option<String>,
    },
    CourseCertificate {
        component_id: ComponentId,
        course_name: String,
        #[serde(default)]
        provider: Option<String>,
    },
    Subsection {
        component_id: ComponentId,
        section: String,
        label: String,
    },
}

impl ScorableUnit {
    pub fn component_id(&self) -> &ComponentId {
        match self {
            ScorableUnit::Document { component_id, .. }
            | ScorableUnit::Activity { component_id, .. }
            | ScorableUnit::CourseCertificate { component_id, .. }
            | ScorableUnit::Subsection { component_id, .. } => component_id,
        }
    }

    pub fn kind(&self) -> UnitKind {
        match self {
            ScorableUnit::Document { .. } => UnitKind::Document,
            ScorableUnit::Activity { .. } => UnitKind::Activity,
            ScorableUnit::CourseCertificate { .. } => UnitKind::CourseCertificate,
            ScorableUnit::Subsection { .. } => UnitKind::Subsection,
        }
    }

    /// Human readable name for listings.
    pub fn title(&self) -> &str {
        match self {
            ScorableUnit::Document { title, .. } => title,
            ScorableUnit::Activity { name, .. } => name,
            ScorableUnit::CourseCertificate { course_name, .. } => course_name,
            ScorableUnit::Subsection { label, .. } => label,
        }
    }
}

/// A unit together with the track it reports into.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisteredUnit {
    pub category: CategoryId,
    pub unit: ScorableUnit,
}

/// Row of a student's component listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentSummary {
    pub component_id: ComponentId,
    pub category: CategoryId,
    pub kind: UnitKind,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

/// The current evaluator-assigned score for one component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationRecord {
    pub component_id: ComponentId,
    pub score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
    pub evaluator_id: EvaluatorId,
    pub evaluated_at: DateTime<Utc>,
}

/// Caller input for `submit_score`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreSubmission {
    pub component_id: ComponentId,
    pub score: f64,
    pub evaluator_id: EvaluatorId,
    #[serde(default)]
    pub feedback: Option<String>,
}

impl ScoreSubmission {
    pub fn new(
        component_id: impl Into<ComponentId>,
        score: f64,
        evaluator_id: impl Into<EvaluatorId>,
    ) -> Self {
        Self {
            component_id: component_id.into(),
            score,
            evaluator_id: evaluator_id.into(),
            feedback: None,
        }
    }

    pub fn with_feedback(mut self, feedback: impl Into<String>) -> Self {
        self.feedback = Some(feedback.into());
        self
    }

    pub(crate) fn into_record(self, evaluated_at: DateTime<Utc>) -> EvaluationRecord {
        EvaluationRecord {
            component_id: self.component_id,
            score: self.score,
            feedback: self.feedback,
            evaluator_id: self.evaluator_id,
            evaluated_at,
        }
    }
}
