//! Dashboard metrics
//!
//! Aggregates an analysed table into the figures the NPS dashboard shows:
//! headline KPIs, a weekly NPS series, an agent by month NPS matrix, the top
//! categories per segment and the recoverable split. The segment is always
//! recomputed from the score; the model's tier column is ignored.

use std::collections::{BTreeMap, HashMap};

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime};
use classifier_sdk::{ExperienceTier, Recoverable, ERROR_MARKER};
use serde::Serialize;

use crate::columns::ColumnMap;
use crate::error::{PipelineError, Result};
use crate::table::{parse_number, SurveyTable};

const TOP_CATEGORIES: usize = 5;

const DATETIME_FORMATS: [&str; 6] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%d-%m-%Y %H:%M",
    "%d/%m/%Y %H:%M",
    "%d/%m/%Y %H:%M:%S",
];

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%d-%m-%Y", "%d/%m/%Y"];

/// Parse an opening timestamp; bare dates read as midnight
pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(value, f).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|f| NaiveDate::parse_from_str(value, f).ok())
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn percent(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64 * 100.0
    }
}

/// Row selection applied before any aggregate
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReportFilter {
    /// Empty means every segment
    pub segments: Vec<ExperienceTier>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl ReportFilter {
    fn has_date_bounds(&self) -> bool {
        self.from.is_some() || self.to.is_some()
    }

    fn accepts(&self, row: &ReportRow) -> bool {
        if !self.segments.is_empty() && !self.segments.contains(&row.segment) {
            return false;
        }
        if !self.has_date_bounds() {
            return true;
        }
        let Some(opened) = row.opened_at else {
            return false;
        };
        let day = opened.date();
        self.from.map_or(true, |from| day >= from) && self.to.map_or(true, |to| day <= to)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SegmentCounts {
    pub promoters: usize,
    pub neutrals: usize,
    pub detractors: usize,
    pub total: usize,
}

impl SegmentCounts {
    fn add(&mut self, segment: ExperienceTier) {
        match segment {
            ExperienceTier::Promotor => self.promoters += 1,
            ExperienceTier::Neutro => self.neutrals += 1,
            ExperienceTier::Detractor => self.detractors += 1,
        }
        self.total += 1;
    }

    /// (promoters - detractors) / total * 100, unrounded
    fn nps(&self) -> f64 {
        percent(self.promoters, self.total) - percent(self.detractors, self.total)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Kpis {
    #[serde(flatten)]
    pub counts: SegmentCounts,
    pub pct_promoters: f64,
    pub pct_neutrals: f64,
    pub pct_detractors: f64,
    pub nps: f64,
}

impl Kpis {
    fn from_counts(counts: SegmentCounts) -> Self {
        let pct_promoters = round1(percent(counts.promoters, counts.total));
        let pct_neutrals = round1(percent(counts.neutrals, counts.total));
        let pct_detractors = round1(percent(counts.detractors, counts.total));
        Self {
            counts,
            pct_promoters,
            pct_neutrals,
            pct_detractors,
            nps: round1(pct_promoters - pct_detractors),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeeklyNps {
    /// Monday of the week
    pub week_start: NaiveDate,
    #[serde(flatten)]
    pub counts: SegmentCounts,
    pub nps: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AgentMonthMatrix {
    /// `YYYY-MM`, ascending
    pub months: Vec<String>,
    /// Agent id to month to integer NPS; months without cases are absent
    pub agents: BTreeMap<String, BTreeMap<String, i64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CauseCount {
    pub cause: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryCount {
    pub category: String,
    pub count: usize,
    pub causes: Vec<CauseCount>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentBreakdown {
    pub segment: ExperienceTier,
    pub total: usize,
    /// Rows whose classification failed; left out of `top_categories`
    pub error_rows: usize,
    pub top_categories: Vec<CategoryCount>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RecoverableSplit {
    pub recoverable: usize,
    pub not_recoverable: usize,
    pub unclassified: usize,
    /// Percent of recognised values, 1 decimal
    pub recoverable_share: f64,
    pub not_recoverable_share: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NonRecoverableCase {
    pub case_id: String,
    pub justification: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardReport {
    pub filter: ReportFilter,
    pub kpis: Kpis,
    pub weekly: Vec<WeeklyNps>,
    pub agent_month: AgentMonthMatrix,
    pub segments: Vec<SegmentBreakdown>,
    pub recoverable: RecoverableSplit,
    pub non_recoverable_cases: Vec<NonRecoverableCase>,
}

impl DashboardReport {
    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| PipelineError::Config(format!("cannot serialize report: {}", e)))
    }
}

/// One analysed row, reduced to what the aggregates read
#[derive(Debug, Clone)]
struct ReportRow {
    case_id: String,
    segment: ExperienceTier,
    opened_at: Option<NaiveDateTime>,
    agent: String,
    category: String,
    cause: String,
    recoverable: String,
    justification: String,
}

struct ReportColumns {
    nps: usize,
    category: usize,
    cause: usize,
    recoverable: usize,
    justification: usize,
    case_id: Option<usize>,
    opened_at: Option<usize>,
    agent: Option<usize>,
}

impl ReportColumns {
    fn resolve(table: &SurveyTable, columns: &ColumnMap, filter: &ReportFilter) -> Result<Self> {
        let mut required = vec![
            columns.nps.as_str(),
            "categoria",
            "causa_principal",
            "es_recuperable",
            "detalle_analisis",
        ];
        if filter.has_date_bounds() {
            required.push(columns.opened_at.as_str());
        }

        let missing: Vec<String> = required
            .iter()
            .filter(|name| table.column_index(name).is_none())
            .map(|name| name.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(PipelineError::schema(missing));
        }

        let index = |name: &str| table.column_index(name).unwrap_or_default();
        Ok(Self {
            nps: index(&columns.nps),
            category: index("categoria"),
            cause: index("causa_principal"),
            recoverable: index("es_recuperable"),
            justification: index("detalle_analisis"),
            case_id: table.column_index(&columns.case_id),
            opened_at: table.column_index(&columns.opened_at),
            agent: table.column_index(&columns.agent_id),
        })
    }

    fn read(&self, table: &SurveyTable, row: usize) -> ReportRow {
        let cell = |col: usize| table.cell(row, col).trim().to_string();
        let optional = |col: Option<usize>| col.map(|c| cell(c)).unwrap_or_default();

        let score = parse_number(table.cell(row, self.nps)).unwrap_or(0.0);
        let case_id = optional(self.case_id);

        ReportRow {
            case_id: if case_id.is_empty() {
                format!("fila-{}", row + 1)
            } else {
                case_id
            },
            segment: ExperienceTier::from_nps(score),
            opened_at: self.opened_at.and_then(|c| parse_timestamp(table.cell(row, c))),
            agent: optional(self.agent),
            category: cell(self.category),
            cause: cell(self.cause),
            recoverable: cell(self.recoverable),
            justification: cell(self.justification),
        }
    }
}

/// Monday of the week containing `day`
fn week_start(day: NaiveDate) -> NaiveDate {
    day - Duration::days(day.weekday().num_days_from_monday() as i64)
}

fn weekly_series(rows: &[ReportRow]) -> Vec<WeeklyNps> {
    let mut weeks: BTreeMap<NaiveDate, SegmentCounts> = BTreeMap::new();
    for row in rows {
        if let Some(opened) = row.opened_at {
            weeks.entry(week_start(opened.date())).or_default().add(row.segment);
        }
    }
    weeks
        .into_iter()
        .map(|(week_start, counts)| WeeklyNps {
            week_start,
            nps: round1(counts.nps()),
            counts,
        })
        .collect()
}

fn agent_month_matrix(rows: &[ReportRow]) -> AgentMonthMatrix {
    let mut cells: BTreeMap<(String, String), SegmentCounts> = BTreeMap::new();
    for row in rows {
        let Some(opened) = row.opened_at else { continue };
        if row.agent.is_empty() {
            continue;
        }
        let month = format!("{:04}-{:02}", opened.year(), opened.month());
        cells.entry((row.agent.clone(), month)).or_default().add(row.segment);
    }

    let mut matrix = AgentMonthMatrix::default();
    for ((agent, month), counts) in cells {
        if !matrix.months.contains(&month) {
            matrix.months.push(month.clone());
        }
        matrix
            .agents
            .entry(agent)
            .or_default()
            .insert(month, counts.nps().round_ties_even() as i64);
    }
    matrix.months.sort();
    matrix
}

/// Sort counts descending, ties by name
fn ranked(counts: HashMap<&str, usize>) -> Vec<(String, usize)> {
    let mut ranked: Vec<(String, usize)> = counts
        .into_iter()
        .map(|(name, count)| (name.to_string(), count))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked
}

fn segment_breakdown(rows: &[ReportRow], segment: ExperienceTier) -> SegmentBreakdown {
    let in_segment: Vec<&ReportRow> = rows.iter().filter(|r| r.segment == segment).collect();
    let (errors, classified): (Vec<&ReportRow>, Vec<&ReportRow>) = in_segment
        .iter()
        .copied()
        .partition(|r| r.category == ERROR_MARKER);

    let mut categories: HashMap<&str, usize> = HashMap::new();
    for row in &classified {
        *categories.entry(row.category.as_str()).or_default() += 1;
    }

    let top_categories = ranked(categories)
        .into_iter()
        .take(TOP_CATEGORIES)
        .map(|(category, count)| {
            let mut causes: HashMap<&str, usize> = HashMap::new();
            for row in classified.iter().filter(|r| r.category == category) {
                *causes.entry(row.cause.as_str()).or_default() += 1;
            }
            CategoryCount {
                causes: ranked(causes)
                    .into_iter()
                    .map(|(cause, count)| CauseCount { cause, count })
                    .collect(),
                category,
                count,
            }
        })
        .collect();

    SegmentBreakdown {
        segment,
        total: in_segment.len(),
        error_rows: errors.len(),
        top_categories,
    }
}

fn recoverable_split(rows: &[ReportRow]) -> (RecoverableSplit, Vec<NonRecoverableCase>) {
    let mut split = RecoverableSplit::default();
    let mut cases = Vec::new();

    for row in rows {
        match Recoverable::parse(&row.recoverable) {
            Some(Recoverable::Yes) => split.recoverable += 1,
            Some(Recoverable::No) => {
                split.not_recoverable += 1;
                cases.push(NonRecoverableCase {
                    case_id: row.case_id.clone(),
                    justification: row.justification.clone(),
                });
            }
            None => split.unclassified += 1,
        }
    }

    let known = split.recoverable + split.not_recoverable;
    split.recoverable_share = round1(percent(split.recoverable, known));
    split.not_recoverable_share = round1(percent(split.not_recoverable, known));
    (split, cases)
}

/// Compute every dashboard aggregate over the rows the filter accepts
pub fn build_report(
    table: &SurveyTable,
    columns: &ColumnMap,
    filter: ReportFilter,
) -> Result<DashboardReport> {
    let layout = ReportColumns::resolve(table, columns, &filter)?;

    let rows: Vec<ReportRow> = (0..table.len())
        .map(|i| layout.read(table, i))
        .filter(|row| filter.accepts(row))
        .collect();

    let undated = rows.iter().filter(|r| r.opened_at.is_none()).count();
    if undated > 0 {
        log::warn!("{} rows have no readable opening date; left out of time series", undated);
    }
    log::info!("Building report over {} of {} rows", rows.len(), table.len());

    let mut counts = SegmentCounts::default();
    for row in &rows {
        counts.add(row.segment);
    }

    let (recoverable, non_recoverable_cases) = recoverable_split(&rows);

    Ok(DashboardReport {
        kpis: Kpis::from_counts(counts),
        weekly: weekly_series(&rows),
        agent_month: agent_month_matrix(&rows),
        segments: ExperienceTier::ALL
            .iter()
            .map(|&segment| segment_breakdown(&rows, segment))
            .collect(),
        recoverable,
        non_recoverable_cases,
        filter,
    })
}
