//! In-memory report accumulator.

use std::cmp::Ordering;

use recon_search::contract::{ReportEntryV1, ReportSinkV1};
use recon_search::ranking::SortDirection;

use crate::digest::canonical_json_bytes;

/// Collects retained models; sorts them on request; emits JSON.
#[derive(Debug, Default, Clone)]
pub struct ModelReport {
    rows: Vec<ReportEntryV1>,
    sorted_by: Option<(String, SortDirection)>,
}

impl ModelReport {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rows in their current order (insertion order until sorted).
    #[must_use]
    pub fn rows(&self) -> &[ReportEntryV1] {
        &self.rows
    }

    /// The first row under the current order.
    #[must_use]
    pub fn best_model(&self) -> Option<&ReportEntryV1> {
        self.rows.first()
    }

    #[must_use]
    pub fn to_json_value(&self) -> serde_json::Value {
        let sorted_by = self.sorted_by.as_ref().map(|(attribute, direction)| {
            serde_json::json!({"attribute": attribute, "direction": direction.as_str()})
        });
        serde_json::json!({
            "rows": self.rows.iter().map(entry_to_json).collect::<Vec<_>>(),
            "sorted_by": sorted_by,
        })
    }
}

impl ReportSinkV1 for ModelReport {
    fn add_model(&mut self, entry: ReportEntryV1) {
        self.rows.push(entry);
    }

    /// Stable sort by `attribute`; rows lacking it go last, ties keep id order.
    fn sort(&mut self, attribute: &str, direction: SortDirection) {
        self.rows.sort_by(|a, b| {
            let by_value = match (a.attributes.get(attribute), b.attributes.get(attribute)) {
                (Some(x), Some(y)) => match direction {
                    SortDirection::Ascending => x.total_cmp(y),
                    SortDirection::Descending => y.total_cmp(x),
                },
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            };
            by_value.then_with(|| a.id.cmp(&b.id))
        });
        self.sorted_by = Some((attribute.to_string(), direction));
    }

    fn emit(&self, out: &mut dyn std::io::Write) -> std::io::Result<()> {
        let bytes = canonical_json_bytes(&self.to_json_value())?;
        out.write_all(&bytes)?;
        out.write_all(b"\n")
    }
}

pub(crate) fn entry_to_json(e: &ReportEntryV1) -> serde_json::Value {
    serde_json::json!({
        "attributes": e.attributes,
        "id": e.id,
        "level": e.level,
        "name": e.name,
        "progenitor": e.progenitor,
        "progenitor_id": e.progenitor_id,
    })
}
