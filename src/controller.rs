use crate::config::Config;
use crate::error::ValidationError;
use crate::format::Formatter;
use crate::output;
use crate::projection::{calculate_projection, create_custom_asset, validate_target_price};
use crate::search::{InputChange, SearchCoordinator, SearchOutcome};
use crate::session::Session;
use crate::sources::Gateway;
use crate::types::Asset;
use anyhow::Result;
use std::io::Write;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, warn};

pub const HELP: &str = "\
Commands:
  type <text>                              edit the search field (debounced search)
  clear                                    clear the search field
  search [text]                            search now
  more                                     load the next page
  select <id>                              choose an asset
  custom <name> <symbol> <price> <supply>  use your own numbers
  target <price>                           project the selected asset to a price
  show                                     show the current list and selection
  help                                     this text
  quit                                     leave";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// New contents of the search field.
    Input(String),
    /// Submit the search, optionally replacing the field first.
    SearchNow(Option<String>),
    LoadMore,
    Select(String),
    Custom {
        name: String,
        symbol: String,
        price: String,
        supply: String,
    },
    Target(String),
    Show,
    Help,
    Quit,
}

impl FromStr for Command {
    type Err = ValidationError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };
        let required = |what: &'static str| {
            if rest.is_empty() {
                Err(ValidationError::MissingField(what))
            } else {
                Ok(rest.to_string())
            }
        };

        match word.to_lowercase().as_str() {
            "type" => Ok(Self::Input(rest.to_string())),
            "clear" => Ok(Self::Input(String::new())),
            "search" => Ok(Self::SearchNow((!rest.is_empty()).then(|| rest.to_string()))),
            "more" => Ok(Self::LoadMore),
            "select" => Ok(Self::Select(required("asset id")?)),
            "target" => Ok(Self::Target(required("target price")?)),
            "custom" => {
                let parts: Vec<&str> = rest.split_whitespace().collect();
                if parts.len() < 4 {
                    return Err(ValidationError::InvalidInput(
                        "usage: custom <name> <symbol> <price> <supply>".to_string(),
                    ));
                }
                let (name, tail) = parts.split_at(parts.len() - 3);
                Ok(Self::Custom {
                    name: name.join(" "),
                    symbol: tail[0].to_string(),
                    price: tail[1].to_string(),
                    supply: tail[2].to_string(),
                })
            }
            "show" | "list" => Ok(Self::Show),
            "help" | "?" => Ok(Self::Help),
            "quit" | "exit" => Ok(Self::Quit),
            other => Err(ValidationError::InvalidInput(format!(
                "unknown command '{}'; type 'help'",
                other
            ))),
        }
    }
}

/// Completions of fetches the controller spawned.
#[derive(Debug)]
enum Event {
    PageLoaded {
        generation: u64,
        page: u32,
        assets: Vec<Asset>,
    },
    PageAbandoned {
        generation: u64,
        page: u32,
    },
    DetailsLoaded {
        request: u64,
        id: String,
        asset: Option<Asset>,
    },
}

/// Receiving ends of the controller's internal channels.
pub struct Inbox {
    events: mpsc::UnboundedReceiver<Event>,
    searches: mpsc::UnboundedReceiver<SearchOutcome>,
}

/// Turns commands into session transitions and renders the result. All
/// state lives on the task running the controller; fetches run on spawned
/// tasks and report back through the inbox.
pub struct Controller<W: Write> {
    gateway: Arc<Gateway>,
    fmt: Formatter,
    per_page: u32,
    startup_timeout: Duration,
    session: Session,
    search: SearchCoordinator,
    search_text: String,
    details_request: u64,
    events: mpsc::UnboundedSender<Event>,
    out: W,
}

impl<W: Write> Controller<W> {
    pub fn new(cfg: &Config, gateway: Arc<Gateway>, out: W) -> (Self, Inbox) {
        let (events_tx, events) = mpsc::unbounded_channel();
        let (searches_tx, searches) = mpsc::unbounded_channel();
        let controller = Self {
            search: SearchCoordinator::new(Arc::clone(&gateway), cfg.search_debounce(), searches_tx),
            gateway,
            fmt: Formatter::from_config(cfg),
            per_page: cfg.items_per_page,
            startup_timeout: cfg.api_timeout(),
            session: Session::new(cfg.items_per_page),
            search_text: String::new(),
            details_request: 0,
            events: events_tx,
            out,
        };
        (controller, Inbox { events, searches })
    }

    /// Load the first page and process commands until `Quit` or the command
    /// channel closes.
    pub async fn run(
        &mut self,
        mut inbox: Inbox,
        mut commands: mpsc::UnboundedReceiver<Command>,
    ) -> Result<()> {
        self.start().await?;
        loop {
            tokio::select! {
                cmd = commands.recv() => match cmd {
                    None | Some(Command::Quit) => break,
                    Some(cmd) => self.handle_command(cmd)?,
                },
                Some(event) = inbox.events.recv() => self.handle_event(event)?,
                Some(outcome) = inbox.searches.recv() => self.handle_search(outcome)?,
            }
        }
        Ok(())
    }

    async fn start(&mut self) -> Result<()> {
        let assets = self
            .gateway
            .load_initial(self.per_page, self.startup_timeout)
            .await;
        self.session.replace_list(assets);
        writeln!(self.out, "Loaded {} assets.", self.session.assets().len())?;
        self.render_view()?;
        writeln!(self.out, "Type 'help' for commands.")?;
        Ok(())
    }

    pub fn handle_command(&mut self, cmd: Command) -> Result<()> {
        match cmd {
            Command::Input(text) => {
                self.search_text = text;
                match self.search.input_changed(&self.search_text) {
                    InputChange::Cleared => {
                        if self.session.exit_search() {
                            self.render_view()?;
                        }
                    }
                    InputChange::Scheduled(seq) => debug!("search #{} scheduled", seq),
                }
            }
            Command::SearchNow(text) => {
                if let Some(text) = text {
                    self.search_text = text;
                }
                if self.search.search_now(&self.search_text).is_none() {
                    writeln!(self.out, "Type something to search for first.")?;
                }
            }
            Command::LoadMore => self.load_more()?,
            Command::Select(id) => {
                self.details_request += 1;
                match self.session.find(&id).cloned() {
                    Some(asset) => self.select(asset)?,
                    None => self.fetch_details(id)?,
                }
            }
            Command::Custom {
                name,
                symbol,
                price,
                supply,
            } => match create_custom_asset(&name, &symbol, &price, &supply) {
                Ok(asset) => {
                    self.details_request += 1;
                    self.select(asset)?;
                }
                Err(e) => self.report(&e)?,
            },
            Command::Target(raw) => self.project(&raw)?,
            Command::Show => {
                self.render_view()?;
                if let Some(asset) = self.session.selected() {
                    output::write_selection(&mut self.out, asset, &self.fmt)?;
                }
            }
            Command::Help => writeln!(self.out, "{}", HELP)?,
            Command::Quit => {}
        }
        Ok(())
    }

    fn handle_event(&mut self, event: Event) -> Result<()> {
        match event {
            Event::PageLoaded {
                generation,
                page,
                assets,
            } => {
                if self.session.apply_page(generation, assets) {
                    writeln!(
                        self.out,
                        "Loaded page {} ({} assets in total).",
                        page,
                        self.session.assets().len()
                    )?;
                    if !self.session.is_search_active() {
                        self.render_view()?;
                    }
                }
            }
            Event::PageAbandoned { generation, page } => {
                if self.session.fail_page(generation) {
                    writeln!(self.out, "Could not load page {}; try 'more' again.", page)?;
                }
            }
            Event::DetailsLoaded { request, id, asset } => {
                if request != self.details_request {
                    debug!("dropping stale details for '{}'", id);
                    return Ok(());
                }
                match asset {
                    Some(asset) => self.select(asset)?,
                    None => writeln!(self.out, "No asset found with id '{}'.", id)?,
                }
            }
        }
        Ok(())
    }

    fn handle_search(&mut self, outcome: SearchOutcome) -> Result<()> {
        if !self.search.is_current(outcome.seq) {
            debug!("dropping stale search #{} for '{}'", outcome.seq, outcome.query);
            return Ok(());
        }
        writeln!(
            self.out,
            "Search results for '{}': {}",
            outcome.query,
            outcome.results.len()
        )?;
        self.session.enter_search(outcome.results);
        self.render_view()
    }

    fn load_more(&mut self) -> Result<()> {
        if self.session.is_search_active() {
            writeln!(self.out, "Clear the search to load more assets.")?;
            return Ok(());
        }
        if !self.session.load_more_visible() {
            writeln!(self.out, "No more assets to load.")?;
            return Ok(());
        }
        let Some((generation, page)) = self.session.begin_page_advance() else {
            writeln!(self.out, "Still loading the previous page.")?;
            return Ok(());
        };

        writeln!(self.out, "Loading page {}...", page)?;
        let gateway = Arc::clone(&self.gateway);
        let events = self.events.clone();
        let per_page = self.per_page;
        let fetch = tokio::spawn(async move { gateway.fetch_asset_page(page, per_page).await });
        tokio::spawn(async move {
            let event = match fetch.await {
                Ok(assets) => Event::PageLoaded {
                    generation,
                    page,
                    assets,
                },
                Err(e) => {
                    warn!("request for page {} abandoned: {}", page, e);
                    Event::PageAbandoned { generation, page }
                }
            };
            let _ = events.send(event);
        });
        Ok(())
    }

    fn fetch_details(&mut self, id: String) -> Result<()> {
        writeln!(self.out, "Looking up '{}'...", id)?;
        let request = self.details_request;
        let gateway = Arc::clone(&self.gateway);
        let events = self.events.clone();
        tokio::spawn(async move {
            let asset = gateway.fetch_asset_details(&id).await;
            let _ = events.send(Event::DetailsLoaded { request, id, asset });
        });
        Ok(())
    }

    fn select(&mut self, asset: Asset) -> Result<()> {
        output::write_selection(&mut self.out, &asset, &self.fmt)?;
        self.session.select(asset);
        Ok(())
    }

    fn project(&mut self, raw: &str) -> Result<()> {
        let Some(asset) = self.session.selected() else {
            writeln!(self.out, "Select an asset first.")?;
            return Ok(());
        };
        match validate_target_price(raw) {
            Ok(target) => {
                let result = calculate_projection(asset, target);
                output::write_projection(&mut self.out, &result, &self.fmt)?;
            }
            Err(e) => self.report(&e)?,
        }
        Ok(())
    }

    fn render_view(&mut self) -> Result<()> {
        output::write_asset_table(
            &mut self.out,
            self.session.view(),
            self.session.highlighted_id(),
            &self.fmt,
        )?;
        if self.session.load_more_visible() {
            writeln!(
                self.out,
                "Page {} loaded; 'more' fetches the next one.",
                self.session.page()
            )?;
        }
        Ok(())
    }

    fn report(&mut self, err: &ValidationError) -> Result<()> {
        writeln!(self.out, "Error: {}", err)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::testing::{asset, Behavior, FakeSource};
    use crate::sources::MarketSource;

    fn controller(sources: Vec<FakeSource>, cfg: Config) -> (Controller<Vec<u8>>, Inbox) {
        let gateway = Arc::new(Gateway::with_sources(
            sources
                .into_iter()
                .map(|s| Box::new(s) as Box<dyn MarketSource>)
                .collect(),
            false,
        ));
        Controller::new(&cfg, gateway, Vec::new())
    }

    fn offline() -> (Controller<Vec<u8>>, Inbox) {
        controller(vec![FakeSource::new("proxy", Behavior::Fail)], Config::default())
    }

    fn text(c: &mut Controller<Vec<u8>>) -> String {
        String::from_utf8(std::mem::take(&mut c.out)).unwrap()
    }

    fn page(prefix: &str, n: usize) -> Vec<Asset> {
        (0..n).map(|i| asset(&format!("{}-{}", prefix, i), 1.0 + i as f64)).collect()
    }

    #[test]
    fn parses_commands() {
        assert_eq!("type  bit coin ".parse::<Command>(), Ok(Command::Input("bit coin".to_string())));
        assert_eq!("clear".parse::<Command>(), Ok(Command::Input(String::new())));
        assert_eq!("search".parse::<Command>(), Ok(Command::SearchNow(None)));
        assert_eq!("search eth".parse::<Command>(), Ok(Command::SearchNow(Some("eth".to_string()))));
        assert_eq!("SELECT bitcoin".parse::<Command>(), Ok(Command::Select("bitcoin".to_string())));
        assert_eq!(
            "custom My Token mtk 0.5 1000000".parse::<Command>(),
            Ok(Command::Custom {
                name: "My Token".to_string(),
                symbol: "mtk".to_string(),
                price: "0.5".to_string(),
                supply: "1000000".to_string(),
            })
        );
        assert_eq!("target".parse::<Command>(), Err(ValidationError::MissingField("target price")));
        assert!("custom a b c".parse::<Command>().is_err());
        assert!("launch".parse::<Command>().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn startup_falls_back_to_static_assets() {
        let (mut c, _inbox) = offline();
        c.start().await.unwrap();
        assert_eq!(c.session.assets().len(), 18);
        let out = text(&mut c);
        assert!(out.starts_with("Loaded 18 assets."));
        assert!(!out.contains("'more' fetches the next one"));
    }

    #[tokio::test(start_paused = true)]
    async fn select_then_target_renders_projection() {
        let (mut c, _inbox) = offline();
        c.start().await.unwrap();
        text(&mut c);

        c.handle_command(Command::Select("ethereum".to_string())).unwrap();
        c.handle_command(Command::Target("7000".to_string())).unwrap();
        let out = text(&mut c);
        assert!(out.contains("Selected asset:      Ethereum (ETH)"));
        assert!(out.contains("Required multiplier          2,00x"));
        assert_eq!(c.session.highlighted_id(), Some("ethereum"));
    }

    #[tokio::test(start_paused = true)]
    async fn target_needs_a_selection_and_a_valid_price() {
        let (mut c, _inbox) = offline();
        c.handle_command(Command::Target("100".to_string())).unwrap();
        assert_eq!(text(&mut c).trim(), "Select an asset first.");

        c.handle_command("custom Foo foo 10 1000".parse().unwrap()).unwrap();
        text(&mut c);
        c.handle_command(Command::Target("-5".to_string())).unwrap();
        let out = text(&mut c);
        assert!(out.starts_with("Error: target price must be greater than zero"));
        assert!(!out.contains("Required multiplier"));
    }

    #[tokio::test(start_paused = true)]
    async fn bad_custom_data_keeps_previous_selection() {
        let (mut c, _inbox) = offline();
        c.start().await.unwrap();
        c.handle_command(Command::Select("bitcoin".to_string())).unwrap();
        text(&mut c);

        c.handle_command("custom Foo foo abc 10".parse().unwrap()).unwrap();
        assert!(text(&mut c).starts_with("Error: price must be a positive number"));
        assert_eq!(c.session.selected().unwrap().id, "bitcoin");
    }

    #[tokio::test(start_paused = true)]
    async fn search_results_replace_the_view_until_cleared() {
        let cfg = Config {
            items_per_page: 2,
            ..Config::default()
        };
        let source = FakeSource::new("proxy", Behavior::Succeed(page("coin", 2)));
        let (mut c, mut inbox) = controller(vec![source], cfg);
        c.start().await.unwrap();
        assert!(c.session.load_more_visible());

        c.handle_command(Command::Input("coin-1".to_string())).unwrap();
        let outcome = inbox.searches.recv().await.unwrap();
        c.handle_search(outcome).unwrap();
        assert!(c.session.is_search_active());
        assert_eq!(c.session.view().len(), 1);
        assert!(!c.session.load_more_visible());

        text(&mut c);
        c.handle_command(Command::LoadMore).unwrap();
        assert_eq!(text(&mut c).trim(), "Clear the search to load more assets.");

        c.handle_command(Command::Input(String::new())).unwrap();
        assert!(!c.session.is_search_active());
        assert_eq!(c.session.view().len(), 2);
        assert!(c.session.load_more_visible());
    }

    #[tokio::test(start_paused = true)]
    async fn typing_again_supersedes_a_submitted_search() {
        let source = FakeSource::new("proxy", Behavior::Succeed(page("coin", 2)))
            .with_latency(Duration::from_millis(200));
        let (mut c, mut inbox) = controller(vec![source], Config::default());
        c.start().await.unwrap();

        c.handle_command(Command::SearchNow(Some("coin".to_string()))).unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        // Typing again supersedes the in-flight search.
        c.handle_command(Command::Input("coin-0".to_string())).unwrap();
        let outcome = inbox.searches.recv().await.unwrap();
        assert_eq!(outcome.query, "coin-0");
        c.handle_search(outcome).unwrap();
        assert_eq!(c.session.view().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn load_more_appends_the_next_page() {
        let cfg = Config {
            items_per_page: 2,
            ..Config::default()
        };
        let source = FakeSource::new("proxy", Behavior::Succeed(page("coin", 2)));
        let calls = source.calls();
        let (mut c, mut inbox) = controller(vec![source], cfg);
        c.start().await.unwrap();

        c.handle_command(Command::LoadMore).unwrap();
        c.handle_command(Command::LoadMore).unwrap();
        assert!(text(&mut c).contains("Still loading the previous page."));

        let event = inbox.events.recv().await.unwrap();
        c.handle_event(event).unwrap();
        assert_eq!(c.session.page(), 2);
        assert_eq!(
            *calls.lock().unwrap(),
            vec!["page:1:2".to_string(), "page:2:2".to_string()]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn built_in_pages_stop_offering_more() {
        let cfg = Config {
            items_per_page: 10,
            ..Config::default()
        };
        let (mut c, mut inbox) = controller(vec![FakeSource::new("proxy", Behavior::Fail)], cfg);
        c.start().await.unwrap();
        assert!(c.session.load_more_visible());

        c.handle_command(Command::LoadMore).unwrap();
        let event = inbox.events.recv().await.unwrap();
        c.handle_event(event).unwrap();
        assert_eq!(c.session.page(), 2);
        assert_eq!(c.session.assets().len(), 18);
        assert!(!c.session.load_more_visible());

        text(&mut c);
        c.handle_command(Command::LoadMore).unwrap();
        assert_eq!(text(&mut c).trim(), "No more assets to load.");
        assert_eq!(c.session.page(), 2);
        assert!(inbox.events.try_recv().is_err());
    }

    /// Answers the first page and panics on any later one.
    struct FirstPageOnly;

    #[async_trait::async_trait]
    impl MarketSource for FirstPageOnly {
        fn name(&self) -> &str {
            "first-page-only"
        }

        fn timeout(&self, _op: crate::sources::Operation) -> Duration {
            Duration::from_secs(2)
        }

        async fn fetch_page(&self, number: u32, _per_page: u32) -> anyhow::Result<Vec<Asset>> {
            if number > 1 {
                panic!("page {} is out of range", number);
            }
            Ok(page("coin", 2))
        }

        async fn search(&self, _query: &str) -> anyhow::Result<Vec<Asset>> {
            Ok(Vec::new())
        }

        async fn fetch_details(&self, id: &str) -> anyhow::Result<Asset> {
            anyhow::bail!("no asset '{}'", id)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn abandoned_page_can_be_requested_again() {
        let cfg = Config {
            items_per_page: 2,
            ..Config::default()
        };
        let gateway = Arc::new(Gateway::with_sources(
            vec![Box::new(FirstPageOnly) as Box<dyn MarketSource>],
            false,
        ));
        let (mut c, mut inbox) = Controller::new(&cfg, gateway, Vec::new());
        c.start().await.unwrap();

        c.handle_command(Command::LoadMore).unwrap();
        let event = inbox.events.recv().await.unwrap();
        c.handle_event(event).unwrap();
        assert!(text(&mut c).contains("Could not load page 2; try 'more' again."));
        assert_eq!(c.session.page(), 1);
        assert!(c.session.load_more_visible());

        c.handle_command(Command::LoadMore).unwrap();
        assert!(text(&mut c).contains("Loading page 2..."));
    }

    #[tokio::test(start_paused = true)]
    async fn unknown_id_is_looked_up_and_stale_lookups_are_ignored() {
        let (mut c, mut inbox) = offline();
        c.start().await.unwrap();

        c.handle_command(Command::Select("nope".to_string())).unwrap();
        let event = inbox.events.recv().await.unwrap();
        c.handle_event(event).unwrap();
        assert!(text(&mut c).contains("No asset found with id 'nope'."));

        c.handle_command(Command::Select("remote-coin".to_string())).unwrap();
        c.handle_command("custom Foo foo 10 1000".parse().unwrap()).unwrap();
        let event = inbox.events.recv().await.unwrap();
        c.handle_event(event).unwrap();
        assert!(c.session.selected().unwrap().is_custom());
    }

    #[tokio::test(start_paused = true)]
    async fn run_processes_commands_until_quit() {
        let (mut c, inbox) = offline();
        let (tx, rx) = mpsc::unbounded_channel();
        for line in ["select bitcoin", "target 130000", "quit"] {
            tx.send(line.parse().unwrap()).unwrap();
        }

        c.run(inbox, rx).await.unwrap();
        let out = text(&mut c);
        assert!(out.contains("Selected asset:      Bitcoin (BTC)"));
        assert!(out.contains("Required market cap          $2,55 billones"));
    }
}
