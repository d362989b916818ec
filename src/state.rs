use std::path::PathBuf;
use std::sync::Arc;

use retail_lens::config::DashboardConfig;
use retail_lens::data::filter::{FilterContext, FilterDomain, TopN};
use retail_lens::data::loader::FileSource;
use retail_lens::data::model::Dataset;
use retail_lens::data::store::DatasetStore;
use retail_lens::data::summary::{ColumnSummary, summarize};
use retail_lens::engine::{
    AgeSales, Aggregation, AggregationEngine, CategorySales, TotalsOverview,
};
use retail_lens::query::ResultSet;

use crate::color::ColorMap;

// ---------------------------------------------------------------------------
// Derived views
// ---------------------------------------------------------------------------

/// A display region's content, or the message of the fault that replaced it.
pub type Region<T> = Result<T, String>;

/// Everything that depends on the dataset alone.  Computed once per load.
pub struct Overview {
    pub totals: Region<TotalsOverview>,
    pub statistics: Vec<ColumnSummary>,
    pub breakdown: Region<Vec<CategorySales>>,
    pub breakdown_table: Region<ResultSet>,
}

impl Overview {
    fn compute(dataset: &Dataset) -> Self {
        let engine = AggregationEngine::new(dataset);
        Overview {
            totals: region(engine.totals_overview()),
            statistics: summarize(dataset),
            breakdown: region(engine.sales_by_category_breakdown()),
            breakdown_table: region(engine.run_overall(Aggregation::SalesByCategoryBreakdown)),
        }
    }
}

/// Regions that follow the filter context.  Recomputed once per filter
/// change, not per frame.
pub struct Views {
    pub filtered_table: Region<ResultSet>,
    pub age_trend: Region<Vec<AgeSales>>,
    /// `None` when the dataset carries no product columns.
    pub top_products: Option<Region<ResultSet>>,
}

impl Views {
    fn compute(dataset: &Dataset, filter: &FilterContext) -> Self {
        let engine = AggregationEngine::new(dataset);
        Views {
            filtered_table: region(engine.run(Aggregation::FilteredSummary, filter)),
            age_trend: region(engine.sales_by_age_trend(filter)),
            top_products: dataset
                .has_products()
                .then(|| region(engine.run(Aggregation::TopProducts, filter))),
        }
    }
}

fn region<T>(result: retail_lens::Result<T>) -> Region<T> {
    result.map_err(|e| e.to_string())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    Overview,
    FilteredAnalysis,
    CategoryBreakdown,
    TopProducts,
}

impl Tab {
    pub const ALL: [Tab; 4] = [
        Tab::Overview,
        Tab::FilteredAnalysis,
        Tab::CategoryBreakdown,
        Tab::TopProducts,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Tab::Overview => "📈 Overview",
            Tab::FilteredAnalysis => "🔎 Filtered Analysis",
            Tab::CategoryBreakdown => "📊 Category Breakdown",
            Tab::TopProducts => "🏷 Top Products",
        }
    }
}

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// The full UI state, independent of rendering.
pub struct AppState {
    /// Owner of every dataset loaded this session.
    pub store: DatasetStore,

    /// Source of the current dataset.
    pub source: Option<FileSource>,

    pub dataset: Option<Arc<Dataset>>,

    /// Selectable category/gender values of the current dataset.
    pub domain: Option<FilterDomain>,

    pub filter: Option<FilterContext>,

    /// Present whenever a dataset is loaded, even an empty one.
    pub overview: Option<Overview>,

    /// `None` without a selectable category/gender pair.
    pub views: Option<Views>,

    /// Colours for category bars.
    pub color_map: Option<ColorMap>,

    pub show_chart: bool,
    pub show_table: bool,
    pub tab: Tab,

    /// Blocking message when the dataset could not be loaded.
    pub load_error: Option<String>,

    /// Non-blocking status / error message shown in the top bar.
    pub status_message: Option<String>,

    default_top_n: TopN,
}

impl AppState {
    pub fn new(config: &DashboardConfig) -> Self {
        Self {
            store: DatasetStore::new(),
            source: None,
            dataset: None,
            domain: None,
            filter: None,
            overview: None,
            views: None,
            color_map: None,
            show_chart: config.show_chart,
            show_table: config.show_table,
            tab: Tab::Overview,
            load_error: None,
            status_message: None,
            default_top_n: config.top_n(),
        }
    }

    /// Load a file through the store and make it the current dataset.
    pub fn open(&mut self, path: PathBuf) {
        let source = FileSource::new(path);
        let result = self.store.load(&source);
        self.source = Some(source);
        self.apply_load(result);
    }

    /// Re-read the current source from disk.
    pub fn reload(&mut self) {
        let Some(source) = &self.source else {
            return;
        };
        let result = self.store.reload(source);
        self.apply_load(result);
    }

    fn apply_load(&mut self, result: retail_lens::Result<Arc<Dataset>>) {
        match result {
            Ok(dataset) => self.set_dataset(dataset),
            Err(e) => {
                self.dataset = None;
                self.domain = None;
                self.filter = None;
                self.overview = None;
                self.views = None;
                self.color_map = None;
                self.load_error = Some(e.to_string());
            }
        }
    }

    /// Ingest a loaded dataset, initialise the filter domain and views.
    pub fn set_dataset(&mut self, dataset: Arc<Dataset>) {
        self.load_error = None;
        self.status_message = None;

        let domain = match FilterDomain::from_dataset(&dataset) {
            Ok(domain) => domain,
            Err(e) => {
                self.load_error = Some(e.to_string());
                return;
            }
        };
        let top_n = self
            .filter
            .as_ref()
            .and_then(FilterContext::top_n)
            .unwrap_or(self.default_top_n);

        self.color_map = Some(ColorMap::new(domain.categories()));
        self.filter = domain.default_selection(top_n);
        self.domain = Some(domain);
        self.overview = Some(Overview::compute(&dataset));
        self.dataset = Some(dataset);
        self.recompute();
    }

    /// Top-N currently in effect.
    pub fn top_n(&self) -> TopN {
        self.filter
            .as_ref()
            .and_then(FilterContext::top_n)
            .unwrap_or(self.default_top_n)
    }

    pub fn select_category(&mut self, category: &str) {
        let gender = self.filter.as_ref().map(|f| f.gender().to_string());
        if let Some(gender) = gender {
            self.select(category, &gender, self.top_n());
        }
    }

    pub fn select_gender(&mut self, gender: &str) {
        let category = self.filter.as_ref().map(|f| f.category().to_string());
        if let Some(category) = category {
            self.select(&category, gender, self.top_n());
        }
    }

    pub fn set_top_n(&mut self, n: u32) {
        let current = self
            .filter
            .as_ref()
            .map(|f| (f.category().to_string(), f.gender().to_string()));
        if let Some((category, gender)) = current {
            self.select(&category, &gender, TopN::clamped(n as i64));
        }
    }

    fn select(&mut self, category: &str, gender: &str, top_n: TopN) {
        let Some(domain) = &self.domain else {
            return;
        };
        match domain.select(category, gender, Some(top_n.get() as i64)) {
            Ok(filter) if self.filter.as_ref() == Some(&filter) => {}
            Ok(filter) => {
                self.filter = Some(filter);
                self.recompute();
            }
            Err(e) => {
                log::warn!("Rejected filter selection: {e}");
                self.status_message = Some(e.to_string());
            }
        }
    }

    /// Run the filter-dependent aggregations against the current filter.
    fn recompute(&mut self) {
        self.views = match (&self.dataset, &self.filter) {
            (Some(dataset), Some(filter)) => {
                log::debug!("Recomputing views for {filter:?}");
                Some(Views::compute(dataset, filter))
            }
            _ => None,
        };
    }
}
