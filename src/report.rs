/// Scenario assignment table, summary counts and the scenario filter
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::io::{BufRead, Write};
use std::str::FromStr;

use crate::classifier::{Classification, ScenarioAssignment};
use crate::error::{PavError, Result};
use crate::gene::Side;
use crate::scenario::ScenarioLabel;

pub const ASSIGNMENT_HEADER: [&str; 8] = [
    "gene_id",
    "side",
    "scenario",
    "group_id",
    "degree",
    "group_ref_genes",
    "group_query_genes",
    "bbh_partner",
];

const NULL: &str = "-";

/// Which labels make it into the output table
///
/// Applied after classification; it never changes what a gene is labelled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScenarioFilter {
    labels: BTreeSet<ScenarioLabel>,
}

impl ScenarioFilter {
    pub fn all() -> Self {
        ScenarioFilter {
            labels: ScenarioLabel::ALL.into_iter().collect(),
        }
    }

    pub fn only<I: IntoIterator<Item = ScenarioLabel>>(labels: I) -> Self {
        ScenarioFilter {
            labels: labels.into_iter().collect(),
        }
    }

    pub fn contains(&self, label: ScenarioLabel) -> bool {
        self.labels.contains(&label)
    }

    pub fn is_all(&self) -> bool {
        self.labels.len() == ScenarioLabel::ALL.len()
    }
}

impl Default for ScenarioFilter {
    fn default() -> Self {
        Self::all()
    }
}

impl FromStr for ScenarioFilter {
    type Err = String;

    /// "E,A,B,J,CDI,G,H" or "all"
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            return Ok(Self::all());
        }
        let labels = s
            .split(',')
            .filter(|part| !part.trim().is_empty())
            .map(|part| part.parse::<ScenarioLabel>())
            .collect::<std::result::Result<BTreeSet<_>, _>>()?;
        if labels.is_empty() {
            return Err("Empty scenario list".to_string());
        }
        Ok(ScenarioFilter { labels })
    }
}

impl fmt::Display for ScenarioFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = ScenarioLabel::ALL
            .iter()
            .filter(|l| self.labels.contains(*l))
            .map(|l| l.as_str())
            .collect();
        f.write_str(&names.join(","))
    }
}

/// Gene count with thousands separators, e.g. 12345 -> "12,345"
pub fn format_count(n: usize) -> String {
    let digits = n.to_string();
    let lead = digits.len() % 3;
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (i + 3 - lead) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

fn or_null<T: ToString>(value: Option<T>) -> String {
    value.map_or_else(|| NULL.to_string(), |v| v.to_string())
}

fn assignment_line(a: &ScenarioAssignment) -> String {
    let partners = if a.bbh_partners.is_empty() {
        NULL.to_string()
    } else {
        a.bbh_partners.join(",")
    };
    format!(
        "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
        a.gene_id,
        a.side,
        a.label,
        or_null(a.group_id),
        a.degree,
        or_null(a.group_shape.map(|s| s.ref_count)),
        or_null(a.group_shape.map(|s| s.query_count)),
        partners,
    )
}

/// Write the assignment table; returns the number of rows written
pub fn write_assignments<W: Write>(
    writer: &mut W,
    classification: &Classification,
    filter: &ScenarioFilter,
) -> Result<usize> {
    writeln!(writer, "{}", ASSIGNMENT_HEADER.join("\t"))?;
    let mut written = 0;
    for a in classification
        .assignments
        .iter()
        .filter(|a| filter.contains(a.label))
    {
        writeln!(writer, "{}", assignment_line(a))?;
        written += 1;
    }
    writer.flush()?;
    Ok(written)
}

/// Gene counts per scenario and side, with every label present
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScenarioSummary {
    counts: BTreeMap<ScenarioLabel, (usize, usize)>,
    groups: BTreeMap<ScenarioLabel, BTreeSet<usize>>,
}

impl ScenarioSummary {
    pub fn from_classification(classification: &Classification) -> Self {
        Self::from_records(
            classification
                .assignments
                .iter()
                .map(|a| (a.side, a.label, a.group_id)),
        )
    }

    pub fn from_records<I>(records: I) -> Self
    where
        I: IntoIterator<Item = (Side, ScenarioLabel, Option<usize>)>,
    {
        let mut counts: BTreeMap<ScenarioLabel, (usize, usize)> =
            ScenarioLabel::ALL.into_iter().map(|l| (l, (0, 0))).collect();
        let mut groups: BTreeMap<ScenarioLabel, BTreeSet<usize>> = BTreeMap::new();
        for (side, label, group_id) in records {
            let entry = counts.entry(label).or_insert((0, 0));
            match side {
                Side::Reference => entry.0 += 1,
                Side::Query => entry.1 += 1,
            }
            if let Some(id) = group_id {
                groups.entry(label).or_default().insert(id);
            }
        }
        ScenarioSummary { counts, groups }
    }

    /// (ref genes, query genes) labelled `label`
    pub fn count(&self, label: ScenarioLabel) -> (usize, usize) {
        self.counts.get(&label).copied().unwrap_or((0, 0))
    }

    pub fn group_count(&self, label: ScenarioLabel) -> usize {
        self.groups.get(&label).map_or(0, |g| g.len())
    }

    pub fn total(&self) -> (usize, usize) {
        self.counts
            .values()
            .fold((0, 0), |acc, c| (acc.0 + c.0, acc.1 + c.1))
    }

    pub fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        writeln!(writer, "scenario\tref_genes\tquery_genes\tgroups")?;
        for label in ScenarioLabel::ALL {
            let (r, q) = self.count(label);
            let groups = if label.is_unmapped() {
                NULL.to_string()
            } else {
                self.group_count(label).to_string()
            };
            writeln!(writer, "{label}\t{r}\t{q}\t{groups}")?;
        }
        let (r, q) = self.total();
        let all_groups: BTreeSet<usize> = self.groups.values().flatten().copied().collect();
        writeln!(writer, "total\t{r}\t{q}\t{}", all_groups.len())?;
        writer.flush()?;
        Ok(())
    }
}

/// One row of a previously written assignment table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssignmentRecord {
    pub gene_id: String,
    pub side: Side,
    pub label: ScenarioLabel,
    pub group_id: Option<usize>,
}

/// Read back an assignment table written by `write_assignments`
pub fn parse_assignments<R: BufRead>(reader: R, source: &str) -> Result<Vec<AssignmentRecord>> {
    let parse_error = |line: usize, message: String| PavError::Parse {
        path: source.to_string(),
        line,
        message,
    };

    let mut records = Vec::new();
    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        let line_no = i + 1;
        if line.trim().is_empty() || line.starts_with('#') || line.starts_with("gene_id\t") {
            continue;
        }
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < 4 {
            return Err(parse_error(
                line_no,
                format!("expected at least 4 fields, found {}", fields.len()),
            ));
        }
        let side = fields[1]
            .parse::<Side>()
            .map_err(|e| parse_error(line_no, e))?;
        let label = fields[2]
            .parse::<ScenarioLabel>()
            .map_err(|e| parse_error(line_no, e))?;
        let group_id = match fields[3] {
            NULL => None,
            s => Some(s.parse::<usize>().map_err(|e| {
                parse_error(line_no, format!("invalid group id '{s}': {e}"))
            })?),
        };
        records.push(AssignmentRecord {
            gene_id: fields[0].to_string(),
            side,
            label,
            group_id,
        });
    }

    if records.is_empty() {
        return Err(PavError::EmptyTable {
            path: source.to_string(),
        });
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::run;
    use crate::config::ClassifyConfig;
    use crate::correspondence::{CorrespondenceTable, TrackingRow};
    use crate::gene::GeneUniverse;
    use std::io::Cursor;

    fn classification() -> Classification {
        let table = CorrespondenceTable::from_rows(
            vec![
                TrackingRow::pair("R1", "Q1"),
                TrackingRow::pair("R2", "Q2"),
                TrackingRow::pair("R2", "Q3"),
            ],
            &ClassifyConfig::default(),
        );
        let universe = GeneUniverse::new()
            .with_reference(["R1", "R2", "R3"].map(String::from));
        run(&table, &universe, None).unwrap()
    }

    #[test]
    fn test_filter_parsing() {
        let filter: ScenarioFilter = "e, cdi,G".parse().unwrap();
        assert!(filter.contains(ScenarioLabel::E));
        assert!(filter.contains(ScenarioLabel::Cdi));
        assert!(!filter.contains(ScenarioLabel::A));
        assert_eq!(filter.to_string(), "E,CDI,G");

        assert!("all".parse::<ScenarioFilter>().unwrap().is_all());
        assert!("E,F".parse::<ScenarioFilter>().is_err());
        assert!(",".parse::<ScenarioFilter>().is_err());
    }

    #[test]
    fn test_write_assignments() {
        let mut out = Vec::new();
        let n = write_assignments(&mut out, &classification(), &ScenarioFilter::all()).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(n, 6);
        assert_eq!(lines[0], ASSIGNMENT_HEADER.join("\t"));
        assert_eq!(lines[1], "R1\tref\tE\t1\t1\t1\t1\t-");
        assert_eq!(lines[2], "R2\tref\tA\t2\t2\t1\t2\t-");
        assert_eq!(lines[3], "R3\tref\tG\t-\t0\t-\t-\t-");
        assert_eq!(lines[4], "Q1\tquery\tE\t1\t1\t1\t1\t-");
    }

    #[test]
    fn test_filter_only_restricts_output() {
        let c = classification();
        let mut out = Vec::new();
        let filter = ScenarioFilter::only([ScenarioLabel::G]);
        assert_eq!(write_assignments(&mut out, &c, &filter).unwrap(), 1);
        // Classification itself still holds every gene
        assert_eq!(c.assignments.len(), 6);
    }

    #[test]
    fn test_summary_counts() {
        let summary = ScenarioSummary::from_classification(&classification());
        assert_eq!(summary.count(ScenarioLabel::E), (1, 1));
        assert_eq!(summary.count(ScenarioLabel::A), (1, 2));
        assert_eq!(summary.count(ScenarioLabel::G), (1, 0));
        assert_eq!(summary.count(ScenarioLabel::Cdi), (0, 0));
        assert_eq!(summary.group_count(ScenarioLabel::A), 1);
        assert_eq!(summary.total(), (3, 3));

        let mut out = Vec::new();
        summary.write(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("A\t1\t2\t1\n"));
        assert!(text.contains("total\t3\t3\t2\n"));
        assert!(!text.contains("\nF\t"));
    }

    #[test]
    fn test_format_count() {
        assert_eq!(format_count(0), "0");
        assert_eq!(format_count(999), "999");
        assert_eq!(format_count(1000), "1,000");
        assert_eq!(format_count(12345), "12,345");
        assert_eq!(format_count(1234567), "1,234,567");
    }

    #[test]
    fn test_assignments_read_back() {
        let mut out = Vec::new();
        write_assignments(&mut out, &classification(), &ScenarioFilter::all()).unwrap();
        let records = parse_assignments(Cursor::new(out), "a.tsv").unwrap();
        assert_eq!(records.len(), 6);
        assert_eq!(records[2].gene_id, "R3");
        assert_eq!(records[2].label, ScenarioLabel::G);
        assert_eq!(records[2].group_id, None);

        assert!(parse_assignments(Cursor::new("x\tsideways\tE\t1\n"), "a").is_err());
    }
}
