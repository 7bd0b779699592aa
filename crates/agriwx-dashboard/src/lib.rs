//! Terminal dashboard over the forecast store.
//!
//! Works purely on a loaded [`agriwx_store::ForecastTable`]: region and date
//! filtering, summary metrics, chart series and table rows.

pub mod filter;
pub mod render;
pub mod view;

pub use filter::{date_bounds, default_region, regions, ForecastFilter};
pub use render::render;
pub use view::{build_view, ChartSeries, DashboardView, Metrics, RegionView, TableRow};
