//! Input annotation set: time frames (segments) and time points
//!
//! Produced by an upstream segmentation stage and read-only here.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::capture::TimeUnit;

/// Delimiter between a view id and an annotation id
pub const ID_DELIMITER: char = ':';

/// Source video metadata
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VideoInfo {
    #[serde(default)]
    pub id: String,
    pub fps: Option<f64>,
}

/// Annotation type tag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnnotationKind {
    TimeFrame,
    TimePoint,
    Other,
}

impl AnnotationKind {
    /// Accepts bare names and URI-style names ending in the type
    pub fn from_type_name(name: &str) -> Self {
        // URIs carry a version suffix: .../vocabulary/TimeFrame/v5
        name.split('/')
            .find_map(|part| match part {
                "TimeFrame" => Some(AnnotationKind::TimeFrame),
                "TimePoint" => Some(AnnotationKind::TimePoint),
                _ => None,
            })
            .unwrap_or(AnnotationKind::Other)
    }
}

/// Properties carried by input annotations
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputProperties {
    pub start: Option<f64>,
    pub end: Option<f64>,
    pub time_point: Option<f64>,
    pub time_unit: Option<TimeUnit>,
    pub label: Option<String>,
    #[serde(default)]
    pub representatives: Vec<String>,
}

/// One annotation of the input view
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputAnnotation {
    #[serde(rename = "@type")]
    pub type_name: String,
    pub id: String,
    #[serde(default)]
    pub properties: InputProperties,
}

impl InputAnnotation {
    pub fn kind(&self) -> AnnotationKind {
        AnnotationKind::from_type_name(&self.type_name)
    }
}

/// The serialized input annotation set
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputSet {
    pub view_id: String,
    #[serde(default)]
    pub video: VideoInfo,
    pub annotations: Vec<InputAnnotation>,
}

/// A single instant, in its own unit
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimePoint {
    pub time_point: f64,
    pub time_unit: TimeUnit,
}

impl TimePoint {
    pub fn new(time_point: f64, time_unit: TimeUnit) -> Self {
        Self {
            time_point,
            time_unit,
        }
    }
}

/// A labeled time interval to process
#[derive(Debug, Clone)]
pub struct Segment {
    /// Qualified id (`view:id`)
    pub id: String,
    pub label: Option<String>,
    pub start: f64,
    pub end: f64,
    pub time_unit: TimeUnit,
    /// Qualified representative ids in input order
    pub representatives: Vec<String>,
}

impl Segment {
    /// Midpoint of the interval, used when no representatives exist
    pub fn midpoint(&self) -> TimePoint {
        TimePoint::new(self.start + (self.end - self.start) / 2.0, self.time_unit)
    }

    /// Case-sensitive exact match against an allow-list; empty allows all
    pub fn matches_labels(&self, allow: &[String]) -> bool {
        if allow.is_empty() {
            return true;
        }
        self.label
            .as_deref()
            .is_some_and(|label| allow.iter().any(|a| a == label))
    }
}

/// What a segment's processing task stands on
#[derive(Debug, Clone)]
pub enum Representative {
    /// A time point annotation of the input view
    TimePoint { id: String, point: TimePoint },
    /// Synthesised at the midpoint of a segment without representatives
    Midpoint { segment_id: String, point: TimePoint },
    /// Referenced annotation exists but is not a time point
    Unsupported { id: String, kind: String },
    /// Referenced annotation is absent or incomplete
    Unknown { id: String },
}

impl Representative {
    /// Id for log lines
    pub fn label(&self) -> &str {
        match self {
            Representative::TimePoint { id, .. }
            | Representative::Unsupported { id, .. }
            | Representative::Unknown { id } => id,
            Representative::Midpoint { segment_id, .. } => segment_id,
        }
    }
}

impl InputSet {
    /// Prefix `id` with the input view id unless it is already qualified
    pub fn qualify(&self, id: &str) -> String {
        if id.contains(ID_DELIMITER) {
            id.to_string()
        } else {
            format!("{}{}{}", self.view_id, ID_DELIMITER, id)
        }
    }

    /// Index annotations by qualified id; build once per run
    pub fn index(&self) -> AnnotationIndex<'_> {
        AnnotationIndex {
            by_id: self
                .annotations
                .iter()
                .map(|a| (self.qualify(&a.id), a))
                .collect(),
        }
    }

    /// All time frames in document order
    pub fn segments(&self) -> Vec<Segment> {
        self.annotations
            .iter()
            .filter(|a| a.kind() == AnnotationKind::TimeFrame)
            .map(|a| {
                let p = &a.properties;
                Segment {
                    id: self.qualify(&a.id),
                    label: p.label.clone(),
                    start: p.start.unwrap_or(0.0),
                    end: p.end.or(p.start).unwrap_or(0.0),
                    time_unit: p.time_unit.unwrap_or_default(),
                    representatives: p.representatives.iter().map(|r| self.qualify(r)).collect(),
                }
            })
            .collect()
    }
}

/// Input annotations keyed by qualified id
pub struct AnnotationIndex<'a> {
    by_id: HashMap<String, &'a InputAnnotation>,
}

impl AnnotationIndex<'_> {
    /// Resolve a segment's representative list, falling back to its midpoint
    pub fn representatives(&self, segment: &Segment) -> Vec<Representative> {
        if segment.representatives.is_empty() {
            return vec![Representative::Midpoint {
                segment_id: segment.id.clone(),
                point: segment.midpoint(),
            }];
        }

        segment
            .representatives
            .iter()
            .map(|id| match self.by_id.get(id) {
                Some(a) if a.kind() == AnnotationKind::TimePoint => match a.properties.time_point {
                    Some(value) => Representative::TimePoint {
                        id: id.clone(),
                        point: TimePoint::new(value, a.properties.time_unit.unwrap_or_default()),
                    },
                    None => Representative::Unknown { id: id.clone() },
                },
                Some(a) => Representative::Unsupported {
                    id: id.clone(),
                    kind: a.type_name.clone(),
                },
                None => Representative::Unknown { id: id.clone() },
            })
            .collect()
    }
}

/// Load an input annotation set from a JSON file
pub fn load_input_set(path: &Path) -> Result<InputSet> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read input set {:?}", path))?;
    let input: InputSet = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse input set {:?}", path))?;
    Ok(input)
}
