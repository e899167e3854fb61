/*!
# Provider Dashboard

Upload a spreadsheet of provider/status/count records and view derived
charts and summary tables, filtered by provider and year.

## Overview

Two dashboards share one pipeline shape:

1. **Ingestion** - the upload is parsed into a Workbook, one Table per sheet
2. **Validation** - the selected Table must carry the dashboard's required columns
3. **Coercion** - rows are typed into Records; rows that cannot be typed are reported
4. **Filtering** - Records are restricted to the selected provider and year
5. **Aggregation** - counts are summed per (month, status), per (country, status)
   and per status
6. **Derivation** - the country dashboard joins per-status sums onto their
   (year, month, provider) totals and derives a percentage share
7. **Presentation** - finished rows become chart specs and labelled tables

### Monthly dashboard
Required columns `{year, month, provider, status, count}`. Produces a line chart
of monthly counts per status, a pie chart of status totals and a summary table.

### Country dashboard
Required columns `{year, month, provider, country, status, count}`. Country
codes are resolved to display names (unknown codes pass through unchanged).
Produces a line chart of monthly status shares, a stacked bar chart per
country, a pie chart of status totals and two summary tables.

## Modules

- **loader**: Workbook ingestion from uploaded bytes or a file
- **table**: Workbook, Table and cell types
- **validate**: Required column sets and the schema check
- **record**: Typed records and row coercion
- **country**: Country-code registry and fail-soft resolution
- **filter**: Provider/year filtering and selector candidates
- **aggregate**: Group-and-sum steps and the share join
- **pipeline**: Session state, pipeline context and the two pipelines
- **presentation**: Chart-ready payloads and labelled tables
- **graph**: SVG chart rendering
- **downloader**: CSV and XLSX export of summary tables
- **config**: Server settings and logging setup
- **app**: HTTP routes (requires the `web` feature)
*/

pub mod aggregate;
pub mod config;
pub mod country;
pub mod downloader;
pub mod error;
pub mod filter;
pub mod graph;
pub mod loader;
pub mod month;
pub mod pipeline;
pub mod presentation;
pub mod record;
pub mod table;
pub mod validate;

#[cfg(feature = "web")]
pub mod app;

pub use error::{DashboardError, ParseError, SchemaError};
pub use filter::FilterSpec;
pub use month::Month;
pub use pipeline::{PipelineContext, Report, Selection, Session};
pub use record::Record;
pub use table::{Table, Workbook};
pub use validate::PipelineKind;
