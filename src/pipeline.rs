use crate::aggregate::{
    aggregate_countries, aggregate_monthly, aggregate_shares, sort_by_month, status_totals,
    AggregateRow, CountryAggregateRow, ShareRow, StatusTotal,
};
use crate::country::CountryRegistry;
use crate::error::{DashboardError, ParseError, SchemaError};
use crate::filter::{distinct_providers, distinct_years, filter, FilterSpec};
use crate::loader::parse_workbook;
use crate::record::RejectedRow;
use crate::table::{Table, Workbook};
use crate::validate::{validate_for, PipelineKind};
use chrono::{DateTime, Duration, Utc};
use log::{debug, info};
use serde::{Deserialize, Serialize};

/// Everything one pipeline run needs, passed explicitly from step to step
pub struct PipelineContext<'a> {
    pub table: &'a Table,
    pub filter: FilterSpec,
    pub registry: &'a dyn CountryRegistry,
}

impl<'a> PipelineContext<'a> {
    pub fn new(table: &'a Table, filter: FilterSpec, registry: &'a dyn CountryRegistry) -> Self {
        PipelineContext {
            table,
            filter,
            registry,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MonthlyReport {
    pub sheet: String,
    pub filter: FilterSpec,
    pub rows: Vec<AggregateRow>,
    pub status_totals: Vec<StatusTotal>,
    pub rejected: Vec<RejectedRow>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CountryReport {
    pub sheet: String,
    pub filter: FilterSpec,
    pub shares: Vec<ShareRow>,
    pub countries: Vec<CountryAggregateRow>,
    pub status_totals: Vec<StatusTotal>,
    pub rejected: Vec<RejectedRow>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "pipeline", rename_all = "lowercase")]
pub enum Report {
    Monthly(MonthlyReport),
    Country(CountryReport),
}

impl Report {
    pub fn filter(&self) -> &FilterSpec {
        match self {
            Report::Monthly(r) => &r.filter,
            Report::Country(r) => &r.filter,
        }
    }

    pub fn kind(&self) -> PipelineKind {
        match self {
            Report::Monthly(_) => PipelineKind::Monthly,
            Report::Country(_) => PipelineKind::Country,
        }
    }
}

/// Monthly dashboard: validate, type, filter, then sum per (month, status)
pub fn run_monthly(ctx: &PipelineContext<'_>) -> Result<MonthlyReport, DashboardError> {
    let table = validate_for(ctx.table, PipelineKind::Monthly)?;
    let coerced = table.records(PipelineKind::Monthly, ctx.registry);
    let filtered = filter(&coerced.records, &ctx.filter);
    debug!(
        "monthly '{}': {} of {} records match {:?}",
        table.name,
        filtered.len(),
        coerced.records.len(),
        ctx.filter
    );

    let mut rows = aggregate_monthly(&filtered)?;
    sort_by_month(&mut rows);

    Ok(MonthlyReport {
        sheet: table.name.clone(),
        filter: ctx.filter.clone(),
        rows,
        status_totals: status_totals(&filtered)?,
        rejected: coerced.rejected,
    })
}

/// Country dashboard: monthly status shares plus a per-country breakdown
pub fn run_country(ctx: &PipelineContext<'_>) -> Result<CountryReport, DashboardError> {
    let table = validate_for(ctx.table, PipelineKind::Country)?;
    let coerced = table.records(PipelineKind::Country, ctx.registry);
    let filtered = filter(&coerced.records, &ctx.filter);
    debug!(
        "country '{}': {} of {} records match {:?}",
        table.name,
        filtered.len(),
        coerced.records.len(),
        ctx.filter
    );

    let mut shares = aggregate_shares(&filtered)?;
    sort_by_month(&mut shares);

    Ok(CountryReport {
        sheet: table.name.clone(),
        filter: ctx.filter.clone(),
        shares,
        countries: aggregate_countries(&filtered)?,
        status_totals: status_totals(&filtered)?,
        rejected: coerced.rejected,
    })
}

pub fn run(kind: PipelineKind, ctx: &PipelineContext<'_>) -> Result<Report, DashboardError> {
    match kind {
        PipelineKind::Monthly => run_monthly(ctx).map(Report::Monthly),
        PipelineKind::Country => run_country(ctx).map(Report::Country),
    }
}

/// Selector candidates for one sheet
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SheetOptions {
    pub sheet: String,
    pub pipeline: PipelineKind,
    pub providers: Vec<String>,
    pub years: Vec<i32>,
    pub rejected: Vec<RejectedRow>,
}

/// Validate `table` for `kind` and list the providers and years it contains
pub fn sheet_options(
    table: &Table,
    kind: PipelineKind,
    registry: &dyn CountryRegistry,
) -> Result<SheetOptions, SchemaError> {
    let table = validate_for(table, kind)?;
    let coerced = table.records(kind, registry);

    Ok(SheetOptions {
        sheet: table.name.clone(),
        pipeline: kind,
        providers: distinct_providers(&coerced.records),
        years: distinct_years(&coerced.records),
        rejected: coerced.rejected,
    })
}

/// The user's current choice of sheet, dashboard and filter
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub sheet: String,
    #[serde(default)]
    pub pipeline: PipelineKind,
    pub provider: String,
    pub year: i32,
}

impl Selection {
    pub fn filter(&self) -> FilterSpec {
        FilterSpec::new(self.provider.clone(), self.year)
    }
}

/// State owned by one user: the current upload and the last selection
///
/// Nothing derived is cached; every run starts again from the workbook.
#[derive(Clone, Debug)]
pub struct Session {
    workbook: Option<Workbook>,
    selection: Option<Selection>,
    last_seen: DateTime<Utc>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Session {
            workbook: None,
            selection: None,
            last_seen: Utc::now(),
        }
    }

    /// Replace the workbook with a new upload
    ///
    /// On a parse failure the previous workbook is discarded as well.
    pub fn upload(&mut self, bytes: &[u8]) -> Result<Vec<String>, ParseError> {
        self.touch();
        self.workbook = None;
        self.selection = None;

        let workbook = parse_workbook(bytes)?;
        let names = workbook.sheet_names();
        info!("session workbook replaced: {} sheet(s)", names.len());
        self.workbook = Some(workbook);
        Ok(names)
    }

    pub fn workbook(&self) -> Option<&Workbook> {
        self.workbook.as_ref()
    }

    pub fn selection(&self) -> Option<&Selection> {
        self.selection.as_ref()
    }

    pub fn sheet_names(&self) -> Vec<String> {
        self.workbook
            .as_ref()
            .map(Workbook::sheet_names)
            .unwrap_or_default()
    }

    pub fn table(&self, sheet: &str) -> Result<&Table, DashboardError> {
        let workbook = self.workbook.as_ref().ok_or(DashboardError::NoWorkbook)?;
        workbook
            .table(sheet)
            .ok_or_else(|| DashboardError::UnknownSheet(sheet.to_string()))
    }

    pub fn options(
        &mut self,
        sheet: &str,
        kind: PipelineKind,
        registry: &dyn CountryRegistry,
    ) -> Result<SheetOptions, DashboardError> {
        self.touch();
        let table = self.table(sheet)?;
        Ok(sheet_options(table, kind, registry)?)
    }

    /// Recompute the dashboard for `selection` from scratch
    pub fn run(
        &mut self,
        selection: Selection,
        registry: &dyn CountryRegistry,
    ) -> Result<Report, DashboardError> {
        self.touch();
        let report = {
            let table = self.table(&selection.sheet)?;
            let ctx = PipelineContext::new(table, selection.filter(), registry);
            run(selection.pipeline, &ctx)?
        };
        self.selection = Some(selection);
        Ok(report)
    }

    pub fn touch(&mut self) {
        self.last_seen = Utc::now();
    }

    pub fn is_expired(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        now - self.last_seen > ttl
    }
}
