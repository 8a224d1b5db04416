use crate::types::Asset;
use tracing::debug;

/// Everything the user has chosen or loaded so far. Mutated only through the
/// transitions below; completions from async fetches carry a generation and
/// are dropped when a newer request superseded them.
#[derive(Debug)]
pub struct Session {
    per_page: u32,
    selected: Option<Asset>,
    page: u32,
    assets: Vec<Asset>,
    search_active: bool,
    search_results: Vec<Asset>,
    load_more_visible: bool,
    /// A page came back with fewer new assets than a full page.
    exhausted: bool,
    page_generation: u64,
    page_in_flight: bool,
}

impl Session {
    pub fn new(per_page: u32) -> Self {
        Self {
            per_page,
            selected: None,
            page: 1,
            assets: Vec::new(),
            search_active: false,
            search_results: Vec::new(),
            load_more_visible: false,
            exhausted: false,
            page_generation: 0,
            page_in_flight: false,
        }
    }

    pub fn selected(&self) -> Option<&Asset> {
        self.selected.as_ref()
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn assets(&self) -> &[Asset] {
        &self.assets
    }

    pub fn is_search_active(&self) -> bool {
        self.search_active
    }

    pub fn load_more_visible(&self) -> bool {
        self.load_more_visible && !self.search_active
    }

    /// What is currently on screen.
    pub fn view(&self) -> &[Asset] {
        if self.search_active {
            &self.search_results
        } else {
            &self.assets
        }
    }

    /// Id to highlight in the list. Custom assets have no list entry.
    pub fn highlighted_id(&self) -> Option<&str> {
        self.selected
            .as_ref()
            .filter(|a| !a.is_custom())
            .map(|a| a.id.as_str())
    }

    /// Look up an asset by id in the view first, then the accumulated list.
    pub fn find(&self, id: &str) -> Option<&Asset> {
        self.view()
            .iter()
            .chain(self.assets.iter())
            .find(|a| a.id == id)
    }

    pub fn select(&mut self, asset: Asset) {
        debug!("selected '{}'", asset.id);
        self.selected = Some(asset);
    }

    /// Initial list. Invalidates any page request still running.
    pub fn replace_list(&mut self, assets: Vec<Asset>) {
        self.page_generation += 1;
        self.page_in_flight = false;
        self.page = 1;
        self.exhausted = false;
        self.load_more_visible = assets.len() >= self.per_page as usize;
        self.assets = assets;
    }

    /// Reserve the next page. `None` while searching or while another page
    /// is still loading.
    pub fn begin_page_advance(&mut self) -> Option<(u64, u32)> {
        if self.search_active || self.page_in_flight {
            return None;
        }
        self.page += 1;
        self.page_generation += 1;
        self.page_in_flight = true;
        Some((self.page_generation, self.page))
    }

    /// Append a loaded page, skipping ids already listed (the built-in
    /// fallback answers every page with the same assets). Load-more stays
    /// visible only if a full page of new assets arrived. Returns `false`
    /// when the completion is stale.
    pub fn apply_page(&mut self, generation: u64, assets: Vec<Asset>) -> bool {
        if generation != self.page_generation {
            debug!("dropping stale page (generation {} != {})", generation, self.page_generation);
            return false;
        }
        self.page_in_flight = false;
        let before = self.assets.len();
        for asset in assets {
            if !self.assets.iter().any(|a| a.id == asset.id) {
                self.assets.push(asset);
            }
        }
        if self.assets.len() - before < self.per_page as usize {
            self.exhausted = true;
            self.load_more_visible = false;
        }
        true
    }

    /// The request for the reserved page was abandoned: step the cursor back
    /// so the next advance asks for the same page again. Returns `false` when
    /// `generation` is stale.
    pub fn fail_page(&mut self, generation: u64) -> bool {
        if generation != self.page_generation || !self.page_in_flight {
            return false;
        }
        self.page_in_flight = false;
        self.page = self.page.saturating_sub(1).max(1);
        true
    }

    pub fn enter_search(&mut self, results: Vec<Asset>) {
        self.search_active = true;
        self.search_results = results;
    }

    /// Back to the accumulated list. Returns `false` if search was not active.
    pub fn exit_search(&mut self) -> bool {
        if !self.search_active {
            return false;
        }
        self.search_active = false;
        self.search_results.clear();
        self.load_more_visible = !self.exhausted && self.assets.len() >= self.per_page as usize;
        true
    }
}
