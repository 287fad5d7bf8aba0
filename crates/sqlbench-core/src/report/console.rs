use super::{IndicatorReport, RunReport};
use crate::model::CaseStatus;

pub fn print_indicator(rep: &IndicatorReport) {
    eprintln!(
        "== {}/{} ({}) ==",
        rep.capability, rep.name, rep.evaluation_type
    );
    for row in &rep.details {
        let rule = row
            .rule_id
            .as_deref()
            .map(|r| format!(" rule={}", r))
            .unwrap_or_default();
        match (row.status, row.passed) {
            (CaseStatus::Error, _) | (_, None) => eprintln!(
                "FAILED [{}]{}: {}",
                row.case_id,
                rule,
                row.error.as_deref().unwrap_or("no verdict")
            ),
            (_, Some(true)) => eprintln!("PASS   [{}]{}", row.case_id, rule),
            (_, Some(false)) => eprintln!("false  [{}]{}", row.case_id, rule),
        }
    }

    let s = &rep.summary;
    let rate = s
        .pass_rate
        .map(|r| format!("{:.1}%", r * 100.0))
        .unwrap_or_else(|| "n/a".into());
    eprintln!(
        "Results: cases={} rows={} passed={} false={} failed={} pass_rate={}",
        s.cases, s.rows, s.passed, s.failed_verdict, s.errored, rate
    );
}

pub fn print_summary(report: &RunReport) {
    eprintln!(
        "Run #{} suite={} target={}",
        report.run_id, report.suite, report.target
    );
    for rep in &report.indicators {
        print_indicator(rep);
    }
    for s in &report.skipped {
        eprintln!("FAILED {}/{}: indicator skipped: {}", s.capability, s.name, s.error);
    }
}
