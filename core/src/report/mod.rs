//! Typed view of a `structured_report` reply.
//!
//! Each section is decoded on its own; a section with an unexpected shape is
//! logged and dropped so the rest of the report still renders.

mod render;
pub mod text;

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::content::HasContent;
use crate::references::Reference;
use text::{lenient_list, lenient_opt_text, lenient_rows, lenient_text};

pub use render::{
    DEFAULT_DISCLAIMER, STATE_LAW_BANNER, STATE_LAW_CAVEAT_MARKER, render_chat_view, render_report,
};

/// One row of the at-a-glance summary table
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct GlanceRow {
    #[serde(default, deserialize_with = "lenient_text")]
    pub label: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub value: String,
    #[serde(default, deserialize_with = "lenient_list")]
    pub ref_ids: Vec<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub ref_urls: Vec<String>,
}

/// Statutory provision backing an applicability determination
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct StatutoryBasis {
    #[serde(default, deserialize_with = "lenient_text")]
    pub provision: String,
    #[serde(default, deserialize_with = "lenient_list")]
    pub ref_ids: Vec<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub ref_urls: Vec<String>,
}

/// Whether one act applies to the situation described in the query
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Determination {
    #[serde(default, deserialize_with = "lenient_text")]
    pub act: String,
    /// "true"/"false" or a qualifier such as "Likely"
    #[serde(default, deserialize_with = "lenient_opt_text")]
    pub applies: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub applies_because: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub does_not_apply_if: String,
    #[serde(default, deserialize_with = "basis_list")]
    pub statutory_basis: Vec<StatutoryBasis>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub evidence: String,
}

/// Older workflow versions send applicability as one paragraph.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Applicability {
    #[default]
    Missing,
    Summary(String),
    Determinations(Vec<Determination>),
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ChecklistRow {
    #[serde(default, deserialize_with = "lenient_text")]
    pub obligation: String,
    #[serde(default, alias = "step", deserialize_with = "lenient_text")]
    pub action: String,
    #[serde(default, deserialize_with = "lenient_list")]
    pub ref_ids: Vec<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub ref_urls: Vec<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub timeline: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub owner: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub confidence: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub status: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Risk {
    #[serde(default, deserialize_with = "lenient_text")]
    pub title: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub confidence: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub issue: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub dispute_rationale: String,
    #[serde(default, deserialize_with = "lenient_opt_text")]
    pub case_law_signal: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub recommended_action: String,
    #[serde(default, deserialize_with = "lenient_list")]
    pub ref_ids: Vec<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub ref_urls: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PenaltyRow {
    #[serde(default, deserialize_with = "lenient_text")]
    pub act: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub provision: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub exposure: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub trigger: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct NextStep {
    #[serde(default, deserialize_with = "lenient_text")]
    pub action: String,
    #[serde(default, deserialize_with = "lenient_list")]
    pub ref_ids: Vec<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub ref_urls: Vec<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub rationale: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub timeline: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub owner: String,
}

/// Quoted passage from a bare act
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct BareActExcerpt {
    #[serde(default, deserialize_with = "lenient_text")]
    pub act: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub section: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub doc_id: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub snippet: String,
    #[serde(default, deserialize_with = "lenient_opt_text")]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CaseCitation {
    #[serde(default, deserialize_with = "lenient_text")]
    pub title: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub court: String,
    #[serde(default, deserialize_with = "lenient_opt_text")]
    pub year: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub relevance: String,
    #[serde(default, deserialize_with = "lenient_opt_text")]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct EvidenceIndex {
    #[serde(default, deserialize_with = "lenient_rows")]
    pub bare_act: Vec<BareActExcerpt>,
    #[serde(default, deserialize_with = "lenient_rows")]
    pub case_law: Vec<CaseCitation>,
}

/// The single `bare_act` object older workflow versions send.
#[derive(Debug, Clone, Default, Deserialize)]
struct LegacyBareAct {
    #[serde(default, deserialize_with = "lenient_text")]
    act: String,
    #[serde(default, deserialize_with = "lenient_text")]
    section: String,
    #[serde(default, deserialize_with = "lenient_text")]
    summary: String,
    #[serde(default, deserialize_with = "lenient_rows")]
    evidence: Vec<BareActExcerpt>,
}

impl LegacyBareAct {
    fn into_excerpts(self) -> Vec<BareActExcerpt> {
        let mut excerpts = vec![BareActExcerpt {
            act: self.act.clone(),
            section: self.section.clone(),
            doc_id: String::new(),
            snippet: self.summary,
            url: None,
        }];
        excerpts.extend(self.evidence.into_iter().map(|mut item| {
            if item.act.trim().is_empty() {
                item.act = self.act.clone();
            }
            item
        }));
        excerpts
    }
}

/// A decoded `structured_report` reply.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Report {
    pub confidence: Option<String>,
    pub at_a_glance: Vec<GlanceRow>,
    pub answer: Option<String>,
    pub applicability: Applicability,
    pub key_points: Vec<String>,
    pub checklist: Vec<ChecklistRow>,
    pub risks: Vec<Risk>,
    pub penalties: Vec<PenaltyRow>,
    pub next_steps: Vec<NextStep>,
    pub evidence_index: EvidenceIndex,
    pub assumptions: Vec<String>,
    pub references: Vec<Reference>,
    pub disclaimer: Option<String>,
}

impl Report {
    /// Decode a report from canonical content. Non-object content yields an
    /// empty report.
    pub fn from_value(content: &Value) -> Self {
        let Some(record) = content.as_object() else {
            return Self::default();
        };

        let mut evidence_index: EvidenceIndex = section(record, "evidence_index");
        if let Some(legacy) = section::<Option<LegacyBareAct>>(record, "bare_act") {
            evidence_index.bare_act.extend(legacy.into_excerpts());
        }
        evidence_index
            .case_law
            .extend(section::<Vec<CaseCitation>>(record, "citations"));

        Self {
            confidence: text_field(record, "confidence"),
            at_a_glance: section(record, "at_a_glance"),
            answer: text_field(record, "answer"),
            applicability: applicability(record.get("applicability")),
            key_points: string_list(record.get("key_points")),
            checklist: section(record, "checklist"),
            risks: section(record, "risks"),
            penalties: section(record, "penalties"),
            next_steps: section(record, "next_steps"),
            evidence_index,
            assumptions: string_list(record.get("assumptions")),
            references: section(record, "references"),
            disclaimer: text_field(record, "disclaimer"),
        }
    }
}

fn section<T>(record: &Map<String, Value>, key: &str) -> T
where
    T: DeserializeOwned + Default,
{
    match record.get(key) {
        None | Some(Value::Null) => T::default(),
        Some(raw) => serde_json::from_value(raw.clone()).unwrap_or_else(|err| {
            tracing::warn!(section = key, error = %err, "dropping malformed report section");
            T::default()
        }),
    }
}

fn text_field(record: &Map<String, Value>, key: &str) -> Option<String> {
    record
        .get(key)
        .map(text::value_text)
        .filter(|text| text.has_content())
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .map(text::value_text)
            .filter(|s| s.has_content())
            .collect(),
        Some(Value::String(s)) if s.has_content() => vec![s.clone()],
        _ => Vec::new(),
    }
}

fn applicability(value: Option<&Value>) -> Applicability {
    match value {
        Some(Value::String(s)) if s.has_content() => Applicability::Summary(s.clone()),
        Some(raw @ Value::Array(_)) => match serde_json::from_value(raw.clone()) {
            Ok(determinations) => Applicability::Determinations(determinations),
            Err(err) => {
                tracing::warn!(section = "applicability", error = %err, "dropping malformed report section");
                Applicability::Missing
            }
        },
        Some(raw @ Value::Object(_)) => match serde_json::from_value(raw.clone()) {
            Ok(determination) => Applicability::Determinations(vec![determination]),
            Err(err) => {
                tracing::warn!(section = "applicability", error = %err, "dropping malformed report section");
                Applicability::Missing
            }
        },
        _ => Applicability::Missing,
    }
}

fn basis_list<'de, D>(deserializer: D) -> Result<Vec<StatutoryBasis>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    // Accept bare provision strings alongside full basis records.
    let value = Value::deserialize(deserializer)?;
    let items = match value {
        Value::Null => return Ok(Vec::new()),
        Value::Array(items) => items,
        other => vec![other],
    };
    items
        .into_iter()
        .map(|item| match item {
            Value::Object(_) => serde_json::from_value(item).map_err(serde::de::Error::custom),
            other => Ok(StatutoryBasis {
                provision: text::value_text(&other),
                ..StatutoryBasis::default()
            }),
        })
        .collect()
}

impl HasContent for GlanceRow {
    fn has_content(&self) -> bool {
        self.label.has_content()
            || self.value.has_content()
            || self.ref_ids.has_content()
            || self.ref_urls.has_content()
    }
}

impl HasContent for StatutoryBasis {
    fn has_content(&self) -> bool {
        self.provision.has_content() || self.ref_ids.has_content() || self.ref_urls.has_content()
    }
}

impl HasContent for Determination {
    fn has_content(&self) -> bool {
        self.act.has_content()
            || self.applies.has_content()
            || self.applies_because.has_content()
            || self.does_not_apply_if.has_content()
            || self.statutory_basis.has_content()
            || self.evidence.has_content()
    }
}

impl HasContent for Applicability {
    fn has_content(&self) -> bool {
        match self {
            Applicability::Missing => false,
            Applicability::Summary(text) => text.has_content(),
            Applicability::Determinations(items) => items.has_content(),
        }
    }
}

impl HasContent for ChecklistRow {
    fn has_content(&self) -> bool {
        self.obligation.has_content()
            || self.action.has_content()
            || self.ref_ids.has_content()
            || self.ref_urls.has_content()
            || self.timeline.has_content()
            || self.owner.has_content()
            || self.confidence.has_content()
            || self.status.has_content()
    }
}

impl HasContent for Risk {
    fn has_content(&self) -> bool {
        self.title.has_content()
            || self.confidence.has_content()
            || self.issue.has_content()
            || self.dispute_rationale.has_content()
            || self.case_law_signal.has_content()
            || self.recommended_action.has_content()
            || self.ref_ids.has_content()
            || self.ref_urls.has_content()
    }
}

impl HasContent for PenaltyRow {
    fn has_content(&self) -> bool {
        self.act.has_content()
            || self.provision.has_content()
            || self.exposure.has_content()
            || self.trigger.has_content()
    }
}

impl HasContent for NextStep {
    fn has_content(&self) -> bool {
        self.action.has_content()
            || self.ref_ids.has_content()
            || self.ref_urls.has_content()
            || self.rationale.has_content()
            || self.timeline.has_content()
            || self.owner.has_content()
    }
}

impl HasContent for BareActExcerpt {
    fn has_content(&self) -> bool {
        self.act.has_content()
            || self.section.has_content()
            || self.doc_id.has_content()
            || self.snippet.has_content()
            || self.url.has_content()
    }
}

impl HasContent for CaseCitation {
    fn has_content(&self) -> bool {
        self.title.has_content()
            || self.court.has_content()
            || self.year.has_content()
            || self.relevance.has_content()
            || self.url.has_content()
    }
}

impl HasContent for EvidenceIndex {
    fn has_content(&self) -> bool {
        self.bare_act.has_content() || self.case_law.has_content()
    }
}
