//! Plain-text renderer: fixed-width tables for terminals and logs.

use std::fmt::Write as _;

use crate::ReportModel;

/// Render the model as aligned plain text. Column widths are fixed; long
/// names are truncated so rows never wrap.
pub fn render_text(m: &ReportModel) -> String {
    let mut out = String::new();
    let h = &m.headline;

    let _ = writeln!(out, "{} (as of {})", h.title, h.as_of);
    let _ = writeln!(
        out,
        "Declared {}/{} seats, {} remaining; majority at {}",
        h.declared_seats, h.total_seats, h.remaining_seats, h.required_majority
    );
    let _ = writeln!(
        out,
        "Turnout {}% ({} of {} registered)",
        h.turnout_pct, h.total_votes_cast, h.total_registered_voters
    );
    let majority = match (&h.majority_party, &h.majority_alliance) {
        (Some(p), _) => p.clone(),
        (None, Some(a)) => a.clone(),
        (None, None) => "none".to_string(),
    };
    let _ = writeln!(out, "Majority: {majority}");

    out.push('\n');
    let _ = writeln!(out, "{:<8} {:<10} {:>5} {:>5} {:>12} {:>8}", "PARTY", "ALLIANCE", "SEATS", "LEAD", "VOTES", "SHARE");
    for p in &m.parties {
        let _ = writeln!(
            out,
            "{:<8} {:<10} {:>5} {:>5} {:>12} {:>7}%",
            clip(&p.short_name, 8),
            clip(&p.alliance_id, 10),
            p.seats,
            p.leading_seats,
            p.votes,
            p.vote_pct
        );
    }

    if !m.alliances.is_empty() {
        out.push('\n');
        let _ = writeln!(out, "{:<24} {:>5} {:>5} {:>12} {:>8}", "ALLIANCE", "SEATS", "LEAD", "VOTES", "SHARE");
        for a in &m.alliances {
            let _ = writeln!(
                out,
                "{:<24} {:>5} {:>5} {:>12} {:>7}%",
                clip(&a.name, 24),
                a.seats,
                a.leading_seats,
                a.votes,
                a.vote_pct
            );
        }
    }

    if !m.divisions.is_empty() {
        out.push('\n');
        let _ = writeln!(out, "{:<16} {:>9} {:>12} {:<8}", "DIVISION", "DECLARED", "VOTES", "LEADER");
        for d in &m.divisions {
            let declared = format!("{}/{}", d.declared_seats, d.total_constituencies);
            let _ = writeln!(
                out,
                "{:<16} {:>9} {:>12} {:<8}",
                clip(&d.name, 16),
                declared,
                d.votes,
                d.leader.as_deref().unwrap_or("-")
            );
        }
    }
    out
}

/// Truncate to `width` chars (not bytes).
fn clip(s: &str, width: usize) -> String {
    s.chars().take(width).collect()
}
