use std::fmt::Write as _;

use serde_json::Value;

use super::{
    Applicability, BareActExcerpt, CaseCitation, ChecklistRow, Determination, GlanceRow, NextStep,
    PenaltyRow, Report, Risk,
};
use crate::content::{HasContent, answer_text, plain_text};
use crate::references::{Reference, resolve_references};

/// Summaries already carrying this phrase get no state-law banner.
pub const STATE_LAW_CAVEAT_MARKER: &str = "state-specific";

pub const STATE_LAW_BANNER: &str = "Labour law obligations vary by State. State-specific rules, \
notifications and amendments may change the position described above; verify them before acting.";

pub const DEFAULT_DISCLAIMER: &str = "This report is generated for general information only and \
is not legal advice. Consult a qualified labour law practitioner before acting on it.";

/// Render a report as Markdown. Sections without content are omitted,
/// headings included.
pub fn render_report(report: &Report) -> String {
    let mut out = ReportWriter::new(&report.references);

    out.header(report.confidence.as_deref());
    if report.at_a_glance.has_content() {
        out.at_a_glance(&report.at_a_glance);
    }
    if report.answer.has_content() {
        out.executive_summary(report.answer.as_deref().unwrap_or_default());
    }
    if report.applicability.has_content() {
        out.applicability(&report.applicability);
    }
    if report.key_points.has_content() {
        out.bullets("Key Findings", &report.key_points);
    }
    if report.checklist.has_content() {
        out.checklist(&report.checklist);
    }
    if report.risks.has_content() {
        out.risks(&report.risks);
    }
    if report.penalties.has_content() {
        out.penalties(&report.penalties);
    }
    if report.next_steps.has_content() {
        out.next_steps(&report.next_steps);
    }
    if report.evidence_index.has_content() {
        out.evidence_index(&report.evidence_index.bare_act, &report.evidence_index.case_law);
    }
    if report.assumptions.has_content() {
        out.bullets("Assumptions Made", &report.assumptions);
    }
    out.footer(report.disclaimer.as_deref());

    out.finish()
}

/// Lightweight projection of a report reply: its top-level answer only.
/// Content without a string answer falls back to the plain rendering.
pub fn render_chat_view(content: &Value) -> String {
    match answer_text(content) {
        Some(answer) if answer.has_content() => answer.to_string(),
        _ => plain_text(content),
    }
}

struct ReportWriter<'a> {
    buf: String,
    references: &'a [Reference],
}

impl<'a> ReportWriter<'a> {
    fn new(references: &'a [Reference]) -> Self {
        Self {
            buf: String::new(),
            references,
        }
    }

    fn finish(self) -> String {
        let mut buf = self.buf;
        let trimmed = buf.trim_end().len();
        buf.truncate(trimmed);
        buf.push('\n');
        buf
    }

    fn heading(&mut self, title: &str) {
        let _ = write!(self.buf, "## {title}\n\n");
    }

    /// Inline reference chips for a field, with a leading space, or "".
    fn chips(&self, ids: &[String], urls: &[String]) -> String {
        let resolved = resolve_references(ids, urls, self.references);
        if resolved.is_empty() {
            return String::new();
        }
        let chips: Vec<String> = resolved.iter().map(chip).collect();
        format!(" {}", chips.join(" "))
    }

    fn header(&mut self, confidence: Option<&str>) {
        self.buf.push_str("# Legal Analysis Report\n\n");
        self.buf.push_str("_Structured guidance based on Indian Labour Law_\n\n");
        if let Some(confidence) = confidence.filter(|c| c.has_content()) {
            let _ = write!(self.buf, "**{} Confidence**\n\n", confidence.trim());
        }
    }

    fn at_a_glance(&mut self, rows: &[GlanceRow]) {
        self.heading("At a Glance");
        let cells = rows
            .iter()
            .filter(|row| row.has_content())
            .map(|row| {
                vec![
                    row.label.clone(),
                    format!("{}{}", row.value, self.chips(&row.ref_ids, &row.ref_urls)),
                ]
            })
            .collect();
        self.table(&["Item", "Detail"], cells);
    }

    fn executive_summary(&mut self, answer: &str) {
        self.heading("Executive Summary");
        let _ = write!(self.buf, "{}\n\n", answer.trim());
        if !answer.to_lowercase().contains(STATE_LAW_CAVEAT_MARKER) {
            let _ = write!(self.buf, "> **Note:** {STATE_LAW_BANNER}\n\n");
        }
    }

    fn applicability(&mut self, applicability: &Applicability) {
        self.heading("Applicability");
        match applicability {
            Applicability::Missing => {}
            Applicability::Summary(text) => {
                let _ = write!(self.buf, "{}\n\n", text.trim());
            }
            Applicability::Determinations(items) => {
                for (idx, determination) in items.iter().filter(|d| d.has_content()).enumerate() {
                    self.determination(idx + 1, determination);
                }
            }
        }
    }

    fn determination(&mut self, number: usize, item: &Determination) {
        if item.act.has_content() {
            let _ = write!(self.buf, "### {}\n\n", item.act.trim());
        } else {
            let _ = write!(self.buf, "### Determination {number}\n\n");
        }
        if let Some(applies) = item.applies.as_deref().filter(|a| a.has_content()) {
            let _ = writeln!(self.buf, "- **Applies:** {}", yes_no(applies));
        }
        if item.applies_because.has_content() {
            let _ = writeln!(self.buf, "- **Applies because:** {}", item.applies_because.trim());
        }
        if item.does_not_apply_if.has_content() {
            let _ = writeln!(self.buf, "- **Does not apply if:** {}", item.does_not_apply_if.trim());
        }
        if item.statutory_basis.has_content() {
            self.buf.push_str("- **Statutory basis:**\n");
            for basis in item.statutory_basis.iter().filter(|b| b.has_content()) {
                let chips = self.chips(&basis.ref_ids, &basis.ref_urls);
                let _ = writeln!(self.buf, "  - {}{}", basis.provision.trim(), chips);
            }
        }
        self.buf.push('\n');
        if item.evidence.has_content() {
            let _ = write!(self.buf, "> \"{}\"\n\n", single_line(&item.evidence));
        }
    }

    fn bullets(&mut self, title: &str, items: &[String]) {
        self.heading(title);
        for item in items.iter().filter(|i| i.has_content()) {
            let _ = writeln!(self.buf, "- {}", item.trim());
        }
        self.buf.push('\n');
    }

    fn checklist(&mut self, rows: &[ChecklistRow]) {
        self.heading("Compliance Checklist");
        let cells = rows
            .iter()
            .filter(|row| row.has_content())
            .map(|row| {
                vec![
                    row.obligation.clone(),
                    format!("{}{}", row.action, self.chips(&row.ref_ids, &row.ref_urls)),
                    row.timeline.clone(),
                    row.owner.clone(),
                    row.confidence.clone(),
                    row.status.clone(),
                ]
            })
            .collect();
        self.table(
            &["Obligation", "Action", "Timeline", "Owner", "Confidence", "Status"],
            cells,
        );
    }

    fn risks(&mut self, risks: &[Risk]) {
        self.heading("Risks");
        for (idx, risk) in risks.iter().filter(|r| r.has_content()).enumerate() {
            if risk.title.has_content() {
                let _ = write!(self.buf, "### Risk {}: {}\n\n", idx + 1, risk.title.trim());
            } else {
                let _ = write!(self.buf, "### Risk {}\n\n", idx + 1);
            }
            if risk.confidence.has_content() {
                let _ = writeln!(self.buf, "- **Confidence:** {}", risk.confidence.trim());
            }
            if risk.issue.has_content() {
                let _ = writeln!(self.buf, "- **Issue:** {}", risk.issue.trim());
            }
            if risk.dispute_rationale.has_content() {
                let _ = writeln!(self.buf, "- **Why it is disputed:** {}", risk.dispute_rationale.trim());
            }
            if let Some(signal) = risk.case_law_signal.as_deref().filter(|s| s.has_content()) {
                let _ = writeln!(self.buf, "- **Case law signal:** {}", signal.trim());
            }
            let chips = self.chips(&risk.ref_ids, &risk.ref_urls);
            if risk.recommended_action.has_content() || !chips.is_empty() {
                let _ = writeln!(
                    self.buf,
                    "- **Recommended action:** {}{}",
                    risk.recommended_action.trim(),
                    chips
                );
            }
            self.buf.push('\n');
        }
    }

    fn penalties(&mut self, rows: &[PenaltyRow]) {
        self.heading("Penalty Exposure");
        let cells = rows
            .iter()
            .filter(|row| row.has_content())
            .map(|row| {
                vec![
                    row.act.clone(),
                    row.provision.clone(),
                    row.exposure.clone(),
                    row.trigger.clone(),
                ]
            })
            .collect();
        self.table(&["Act", "Provision", "Exposure", "Trigger"], cells);
    }

    fn next_steps(&mut self, steps: &[NextStep]) {
        self.heading("Next Steps");
        for (idx, step) in steps.iter().filter(|s| s.has_content()).enumerate() {
            let chips = self.chips(&step.ref_ids, &step.ref_urls);
            let _ = write!(self.buf, "{}.", idx + 1);
            if step.action.has_content() {
                let _ = write!(self.buf, " **{}**", step.action.trim());
            }
            let _ = writeln!(self.buf, "{chips}");
            if step.rationale.has_content() {
                let _ = writeln!(self.buf, "   - Why: {}", step.rationale.trim());
            }
            if step.timeline.has_content() {
                let _ = writeln!(self.buf, "   - Timeline: {}", step.timeline.trim());
            }
            if step.owner.has_content() {
                let _ = writeln!(self.buf, "   - Owner: {}", step.owner.trim());
            }
        }
        self.buf.push('\n');
    }

    fn evidence_index(&mut self, excerpts: &[BareActExcerpt], cases: &[CaseCitation]) {
        self.heading("Evidence Index");
        if excerpts.has_content() {
            self.buf.push_str("### Bare Act Excerpts\n\n");
            for excerpt in excerpts.iter().filter(|e| e.has_content()) {
                let mut label = excerpt.act.trim().to_string();
                if excerpt.section.has_content() {
                    if !label.is_empty() {
                        label.push_str(", ");
                    }
                    let _ = write!(label, "Section {}", excerpt.section.trim());
                }
                self.buf.push('-');
                if !label.is_empty() {
                    let _ = write!(self.buf, " **{label}**");
                }
                if excerpt.doc_id.has_content() {
                    let _ = write!(self.buf, " (Doc: {})", excerpt.doc_id.trim());
                }
                if let Some(url) = excerpt.url.as_deref().filter(|u| u.has_content()) {
                    let _ = write!(self.buf, " [View document]({})", url.trim());
                }
                self.buf.push('\n');
                if excerpt.snippet.has_content() {
                    let _ = writeln!(self.buf, "  > \"{}\"", single_line(&excerpt.snippet));
                }
            }
            self.buf.push('\n');
        }
        if cases.has_content() {
            self.buf.push_str("### Case Law\n\n");
            for case in cases.iter().filter(|c| c.has_content()) {
                self.buf.push('-');
                if case.title.has_content() {
                    let _ = write!(self.buf, " **{}**", case.title.trim());
                }
                if let Some(year) = case.year.as_deref().filter(|y| y.has_content()) {
                    let _ = write!(self.buf, " ({})", year.trim());
                }
                self.buf.push('\n');
                let detail: Vec<&str> = [case.court.trim(), case.relevance.trim()]
                    .into_iter()
                    .filter(|part| !part.is_empty())
                    .collect();
                if !detail.is_empty() {
                    let _ = writeln!(self.buf, "  {}", detail.join(" • "));
                }
                if let Some(url) = case.url.as_deref().filter(|u| u.has_content()) {
                    let _ = writeln!(self.buf, "  [View document]({})", url.trim());
                }
            }
            self.buf.push('\n');
        }
    }

    fn footer(&mut self, disclaimer: Option<&str>) {
        let text = disclaimer
            .filter(|d| d.has_content())
            .map(str::trim)
            .unwrap_or(DEFAULT_DISCLAIMER);
        let _ = write!(self.buf, "---\n\n_{text}_\n");
    }

    fn table(&mut self, headers: &[&str], rows: Vec<Vec<String>>) {
        let _ = writeln!(self.buf, "| {} |", headers.join(" | "));
        let _ = writeln!(self.buf, "|{}", "---|".repeat(headers.len()));
        for row in rows {
            let cells: Vec<String> = row.iter().map(|cell| table_cell(cell)).collect();
            let _ = writeln!(self.buf, "| {} |", cells.join(" | "));
        }
        self.buf.push('\n');
    }
}

fn chip(reference: &Reference) -> String {
    match reference.url.as_deref().filter(|u| u.has_content()) {
        Some(url) => format!("[{}]({})", reference.display_title(), url.trim()),
        None => format!("[{}]", reference.display_title()),
    }
}

fn yes_no(applies: &str) -> &str {
    match applies.trim() {
        "true" => "Yes",
        "false" => "No",
        other => other,
    }
}

fn single_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn table_cell(text: &str) -> String {
    let cell = single_line(text).replace('|', "\\|");
    if cell.is_empty() { "-".to_string() } else { cell }
}

#[cfg(test)]
mod tests {
    use serde_json::{Value, json};

    use super::{DEFAULT_DISCLAIMER, STATE_LAW_BANNER, render_chat_view, render_report};
    use crate::report::Report;

    fn render(content: Value) -> String {
        render_report(&Report::from_value(&content))
    }

    fn full_report() -> Value {
        json!({
            "answer": "Retrenching 40 workers needs notice and compensation.",
            "confidence": "High",
            "at_a_glance": [
                {"label": "Establishment", "value": "Factory, 120 workers", "ref_ids": ["ida"]}
            ],
            "applicability": [{
                "act": "Industrial Disputes Act, 1947",
                "applies": true,
                "applies_because": "Manufacturing unit employing 120 workmen",
                "does_not_apply_if": "Workers are managerial staff",
                "statutory_basis": [{"provision": "Section 25F", "ref_ids": ["ida"], "ref_urls": ["http://ida.pdf"]}],
                "evidence": "No workman ... shall be retrenched"
            }],
            "checklist": [{
                "obligation": "Notice", "action": "Serve one month's notice",
                "ref_urls": ["http://notice.pdf"], "timeline": "30 days", "owner": "HR",
                "confidence": "High", "status": "Pending"
            }],
            "risks": [{
                "title": "Unfair retrenchment claim", "confidence": "Medium",
                "issue": "LIFO not followed", "dispute_rationale": "Seniority lists disputed",
                "case_law_signal": "Courts reinstate with back wages", "recommended_action": "Publish seniority list",
                "ref_ids": ["ida"]
            }],
            "penalties": [{"act": "ID Act", "provision": "Section 31", "exposure": "Fine | imprisonment", "trigger": "Illegal retrenchment"}],
            "next_steps": [{"action": "Prepare seniority list", "rationale": "Section 25G", "timeline": "Week 1", "owner": "HR"}],
            "evidence_index": {
                "bare_act": [{"act": "ID Act", "section": "25F", "doc_id": "ida-1947", "snippet": "No workman employed"}],
                "case_law": [{"title": "A v. B", "court": "Supreme Court", "year": 2010, "relevance": "LIFO", "url": "https://cases/1"}]
            },
            "references": [{"id": "ida", "title": "Industrial Disputes Act", "url": "http://ida.pdf"}]
        })
    }

    #[test]
    fn sections_render_in_fixed_order() {
        let out = render(full_report());
        let order = [
            "# Legal Analysis Report",
            "**High Confidence**",
            "## At a Glance",
            "## Executive Summary",
            "## Applicability",
            "## Compliance Checklist",
            "## Risks",
            "## Penalty Exposure",
            "## Next Steps",
            "## Evidence Index",
            "### Bare Act Excerpts",
            "### Case Law",
            DEFAULT_DISCLAIMER,
        ];
        let mut last = 0;
        for marker in order {
            let pos = out[last..]
                .find(marker)
                .unwrap_or_else(|| panic!("missing or out of order: {marker}\n{out}"));
            last += pos + marker.len();
        }
    }

    #[test]
    fn references_are_resolved_and_not_duplicated() {
        let out = render(full_report());
        assert!(out.contains("- Section 25F [Industrial Disputes Act](http://ida.pdf)\n"));
        assert!(!out.contains("Section 25F [Industrial Disputes Act](http://ida.pdf) ["));
        assert!(out.contains("Serve one month's notice [PDF Reference](http://notice.pdf)"));
    }

    #[test]
    fn table_cells_escape_pipes() {
        let out = render(full_report());
        assert!(out.contains("Fine \\| imprisonment"));
    }

    #[test]
    fn risk_cards_are_numbered() {
        let out = render(full_report());
        assert!(out.contains("### Risk 1: Unfair retrenchment claim"));
        assert!(out.contains("- **Case law signal:** Courts reinstate with back wages"));
    }

    #[test]
    fn summary_gets_state_law_banner_unless_already_caveated() {
        let out = render(json!({"answer": "Gratuity is payable after five years."}));
        assert!(out.contains(STATE_LAW_BANNER));

        let out = render(json!({"answer": "Check State-specific rules for Karnataka."}));
        assert!(!out.contains(STATE_LAW_BANNER));
    }

    #[test]
    fn empty_sections_render_no_heading() {
        let out = render(json!({
            "answer": "Only a summary.",
            "checklist": [{"obligation": " ", "action": ""}],
            "risks": [],
            "penalties": [{}],
            "next_steps": null,
            "evidence_index": {"bare_act": [], "case_law": []},
            "at_a_glance": [{"label": ""}]
        }));
        for heading in [
            "## At a Glance",
            "## Compliance Checklist",
            "## Risks",
            "## Penalty Exposure",
            "## Next Steps",
            "## Evidence Index",
            "## Applicability",
        ] {
            assert!(!out.contains(heading), "unexpected {heading}");
        }
        assert!(out.contains("## Executive Summary"));
    }

    #[test]
    fn partially_filled_rows_keep_their_sections() {
        let out = render(json!({
            "answer": "x",
            "next_steps": [{"timeline": "Week 1", "owner": "HR"}],
            "risks": [{"confidence": "High"}],
            "checklist": [{"confidence": "Low"}],
            "evidence_index": {
                "bare_act": [{"doc_id": "ida-25f"}],
                "case_law": [{"court": "Supreme Court", "year": 2010}]
            }
        }));
        assert!(out.contains("## Next Steps"));
        assert!(out.contains("1.\n   - Timeline: Week 1\n   - Owner: HR"));
        assert!(out.contains("## Risks"));
        assert!(out.contains("- **Confidence:** High"));
        assert!(out.contains("## Compliance Checklist"));
        assert!(out.contains("| - | - | - | - | Low | - |"));
        assert!(out.contains("## Evidence Index"));
        assert!(out.contains("- (Doc: ida-25f)"));
        assert!(out.contains("- (2010)\n  Supreme Court"));
        assert!(!out.contains("****"));
    }

    #[test]
    fn supplied_disclaimer_replaces_default() {
        let out = render(json!({"answer": "x", "disclaimer": "Firm-approved wording."}));
        assert!(out.contains("_Firm-approved wording._"));
        assert!(!out.contains(DEFAULT_DISCLAIMER));
    }

    #[test]
    fn legacy_report_renders_key_findings_and_assumptions() {
        let out = render(json!({
            "answer": "Minimum wages apply.",
            "applicability": "Applies to scheduled employments.",
            "key_points": ["Revised every five years"],
            "assumptions": ["Employer is in Maharashtra"],
            "bare_act": {"act": "Minimum Wages Act, 1948", "section": "12", "summary": "Payment of minimum rates"}
        }));
        assert!(out.contains("Applies to scheduled employments."));
        assert!(out.contains("## Key Findings\n\n- Revised every five years"));
        assert!(out.contains("## Assumptions Made"));
        assert!(out.contains("- **Minimum Wages Act, 1948, Section 12**"));
    }

    #[test]
    fn rendering_is_deterministic() {
        let report = Report::from_value(&full_report());
        assert_eq!(render_report(&report), render_report(&report));
    }

    #[test]
    fn chat_view_shows_only_the_answer() {
        assert_eq!(render_chat_view(&full_report()), "Retrenching 40 workers needs notice and compensation.");
        assert_eq!(render_chat_view(&json!({"key_points": ["a"]})), "{\"key_points\":[\"a\"]}");
    }
}
