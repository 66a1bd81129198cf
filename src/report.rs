//! Terminal and JSON rendering of query outcomes

use std::fmt::Write as _;

use crate::assistant::{QueryOutcome, Report, REJECTION_MESSAGE};

const NO_REMEDIES: &str = "No remedies found for this query.";

/// Plain-text rendering of a whole outcome
pub fn render_outcome(outcome: &QueryOutcome) -> String {
    match outcome {
        QueryOutcome::Empty => String::new(),
        QueryOutcome::NotHealthRelated { .. } => format!("{}\n", REJECTION_MESSAGE),
        QueryOutcome::Answered(report) => render_report(report),
    }
}

/// Plain-text rendering of an answered query
pub fn render_report(report: &Report) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "Here's what I suggest:\n");
    let _ = writeln!(out, "{}\n", report.advice.trim());
    let _ = writeln!(
        out,
        "Risk Estimate: {}% ({})\n",
        report.risk_score,
        report.risk_level.label()
    );

    if report.remedies.is_empty() {
        let _ = writeln!(out, "{}\n", NO_REMEDIES);
    } else {
        let _ = writeln!(out, "Home Remedies & Medicines");
        for (category, names) in report.remedies.iter() {
            let _ = writeln!(out, "\n{}", category.heading());
            for name in names {
                let _ = writeln!(out, "- {}", name);
            }
        }
        out.push('\n');
    }

    let _ = writeln!(out, "General First-Aid");
    let _ = writeln!(out, "{}", report.first_aid);
    out
}

/// Pretty JSON rendering of an outcome
pub fn render_json(outcome: &QueryOutcome) -> serde_json::Result<String> {
    serde_json::to_string_pretty(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assistant::{build_report, FIRST_AID_NOTE};
    use crate::triage::{Verdict, VerdictSource};

    fn report(query: &str) -> Report {
        build_report(
            query,
            query,
            Verdict {
                health_related: true,
                source: VerdictSource::Remote,
            },
            "Drink warm water.".to_string(),
            "llama3-8b-8192",
        )
    }

    #[test]
    fn test_render_report_with_remedies() {
        let text = render_report(&report("cough and fever"));
        assert!(text.contains("Drink warm water."));
        assert!(text.contains("Risk Estimate: 40% (low)"));

        let home = text.find("Home Remedies\n").unwrap();
        let ayurvedic = text.find("Ayurvedic Medicines").unwrap();
        let allopathic = text.find("Allopathic Medicines").unwrap();
        let homeopathic = text.find("Homeopathic Medicines").unwrap();
        assert!(home < ayurvedic && ayurvedic < allopathic && allopathic < homeopathic);

        assert!(text.contains("- Steam inhalation"));
        assert!(!text.contains(NO_REMEDIES));
        assert!(text.trim_end().ends_with(FIRST_AID_NOTE));
    }

    #[test]
    fn test_render_report_without_remedies() {
        let text = render_report(&report("dizzy"));
        assert!(text.contains("Risk Estimate: 0% (none)"));
        assert!(text.contains(NO_REMEDIES));
        assert!(!text.contains("Ayurvedic Medicines"));
        assert!(text.contains(FIRST_AID_NOTE));
    }

    #[test]
    fn test_render_outcome_variants() {
        assert_eq!(render_outcome(&QueryOutcome::Empty), "");

        let rejected = render_outcome(&QueryOutcome::NotHealthRelated {
            normalized_query: "weather".to_string(),
        });
        assert_eq!(rejected.trim(), REJECTION_MESSAGE);
    }

    #[test]
    fn test_render_json() {
        let outcome = QueryOutcome::Answered(Box::new(report("body pain")));
        let json: serde_json::Value = serde_json::from_str(&render_json(&outcome).unwrap()).unwrap();
        assert_eq!(json["outcome"], "answered");
        assert_eq!(json["symptom"], "body_pain");
        assert_eq!(json["remedies"]["home_remedies"][0], "Warm bath");
        assert_eq!(json["first_aid"], FIRST_AID_NOTE);
        assert!(json["generated_at"].as_str().is_some());
    }
}
