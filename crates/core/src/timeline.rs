//! The timeline aggregator.
//!
//! Merges every dated sub-record of a case into one ordered activity feed.
//! A pure derivation: recomputed from the aggregate on every call, no side
//! effects, no hidden state, so the feed can never go stale relative to the
//! underlying collections.
//!
//! Each source type maps to its canonical timestamp by the precedence
//! `upload_date > date > created_at > last_edited`. Records with none of
//! these land in an undated bucket after every dated entry. Ordering is
//! descending by timestamp with ties broken by a fixed type precedence, so
//! identical input always yields identical output.
//!
//! Note entries carry neutral titles and descriptions: the feed must never
//! leak private note content.

use crate::model::{Case, NoteKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use uuid::Uuid;

/// Source collection of a timeline entry, in tie-break precedence order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimelineItemType {
    Document,
    Assessment,
    Report,
    Note,
    ExternalUpload,
}

impl TimelineItemType {
    /// Fixed tie-break rank for entries sharing a timestamp.
    fn precedence(self) -> u8 {
        match self {
            TimelineItemType::Document => 0,
            TimelineItemType::Assessment => 1,
            TimelineItemType::Report => 2,
            TimelineItemType::Note => 3,
            TimelineItemType::ExternalUpload => 4,
        }
    }
}

/// One row of the activity feed.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TimelineEntry {
    pub item_type: TimelineItemType,
    pub title: String,
    pub description: String,
    /// Canonical timestamp; `None` marks the undated sentinel bucket.
    pub timestamp: Option<DateTime<Utc>>,
    pub source_id: Uuid,
}

/// Builds the full chronological feed for a case.
///
/// The output length always equals the sum of the five source collection
/// sizes: no entry is dropped or duplicated.
pub fn build_timeline(case: &Case) -> Vec<TimelineEntry> {
    let mut entries: Vec<TimelineEntry> = Vec::with_capacity(
        case.documents.len()
            + case.assessments.len()
            + case.reports.len()
            + case.notes.len()
            + case.external_uploads.len(),
    );

    for doc in &case.documents {
        entries.push(TimelineEntry {
            item_type: TimelineItemType::Document,
            title: doc.name.to_string(),
            description: format!("Document uploaded by {}", doc.uploaded_by),
            timestamp: Some(doc.upload_date),
            source_id: doc.id,
        });
    }

    for assessment in &case.assessments {
        let description = match assessment.status {
            crate::model::AssessmentStatus::NotStarted => "Assessment not started",
            crate::model::AssessmentStatus::InProgress => "Assessment in progress",
            crate::model::AssessmentStatus::Completed => "Assessment completed",
        };
        entries.push(TimelineEntry {
            item_type: TimelineItemType::Assessment,
            title: assessment.title.to_string(),
            description: description.to_string(),
            timestamp: assessment.date,
            source_id: assessment.id,
        });
    }

    for report in &case.reports {
        entries.push(TimelineEntry {
            item_type: TimelineItemType::Report,
            title: report.title.to_string(),
            description: match report.status {
                crate::model::ReportStatus::Draft => "Report in draft".to_string(),
                crate::model::ReportStatus::Completed => "Report completed".to_string(),
            },
            // Precedence: date, then last_edited for drafts never dated.
            timestamp: report.date.or(report.last_edited),
            source_id: report.id,
        });
    }

    for note in &case.notes {
        let title = match note.kind {
            NoteKind::Write => "Written note",
            NoteKind::Dictate => "Dictated note",
            NoteKind::Ocr => "Scanned note",
        };
        entries.push(TimelineEntry {
            item_type: TimelineItemType::Note,
            title: title.to_string(),
            description: format!("Note added by {}", note.created_by),
            timestamp: Some(note.created_at),
            source_id: note.id,
        });
    }

    for upload in &case.external_uploads {
        entries.push(TimelineEntry {
            item_type: TimelineItemType::ExternalUpload,
            title: upload.name.to_string(),
            description: format!("Sent in by {}", upload.uploaded_by),
            timestamp: Some(upload.upload_date),
            source_id: upload.id,
        });
    }

    entries.sort_by(compare_entries);
    entries
}

/// Descending by timestamp, undated entries last, ties by type precedence.
/// The sort is stable, so entries equal under this comparator keep their
/// collection order.
fn compare_entries(a: &TimelineEntry, b: &TimelineEntry) -> Ordering {
    match (a.timestamp, b.timestamp) {
        (Some(ta), Some(tb)) => tb
            .cmp(&ta)
            .then_with(|| a.item_type.precedence().cmp(&b.item_type.precedence())),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.item_type.precedence().cmp(&b.item_type.precedence()),
    }
}
