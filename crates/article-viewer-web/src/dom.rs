//! `ViewHost` over the live document.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use article_viewer::{
    ArticleViewer, AuxRow, CheerPlan, CheerTimer, FetchError, LoadRequest, LoadTicket, TabBar,
    TabSpec, ViewHost, ViewerConfig,
};
use gloo_timers::future::TimeoutFuture;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::spawn_local;
use web_sys::{
    Document, Element, Event, HtmlElement, IntersectionObserver, IntersectionObserverEntry,
    IntersectionObserverInit,
};

/// Inline JSON configuration read at startup, if present.
const CONFIG_ELEMENT_ID: &str = "article-viewer-config";
/// Attribute carrying a section's position for intersection reports.
const REVEAL_INDEX_ATTR: &str = "data-reveal-index";

type SharedViewer = Rc<RefCell<ArticleViewer<DomHost>>>;
type WeakViewer = Weak<RefCell<ArticleViewer<DomHost>>>;
type ClickHandler = Closure<dyn FnMut(Event)>;

thread_local! {
    static VIEWER: RefCell<Option<SharedViewer>> = const { RefCell::new(None) };
}

#[wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();
    _ = console_log::init_with_level(log::Level::Debug);

    match mount() {
        Ok(tabs) => log::info!("article viewer ready ({} tabs)", tabs),
        Err(err) => log::error!("article viewer not started: {}", err),
    }
}

/// Set the main title for `path` (falls back to the default title).
#[wasm_bindgen(js_name = setMainTitleByPath)]
pub fn set_main_title_by_path(path: &str) {
    VIEWER.with(|slot| {
        if let Some(shared) = slot.borrow().as_ref() {
            if let Ok(mut viewer) = shared.try_borrow_mut() {
                viewer.update_title(path);
            }
        }
    });
}

/// Load an arbitrary fragment path, leaving the tab markers alone.
#[wasm_bindgen(js_name = loadArticle)]
pub fn load_article(path: &str) {
    let weak = VIEWER.with(|slot| slot.borrow().as_ref().map(Rc::downgrade));
    if let Some(weak) = weak {
        dispatch(&weak, Click::Path(path.to_string()));
    }
}

enum Click {
    Tab(usize),
    Aux(String),
    Path(String),
}

fn mount() -> Result<usize, String> {
    let window = web_sys::window().ok_or("no window")?;
    let document = window.document().ok_or("no document")?;
    let config = read_config(&document)?;
    config.validate().map_err(|e| e.to_string())?;

    let container = document
        .query_selector(&config.selectors.container)
        .map_err(js_err)?
        .ok_or_else(|| format!("container '{}' not found", config.selectors.container))?
        .dyn_into::<HtmlElement>()
        .map_err(|_| "container is not an HTML element".to_string())?;
    let tabs = query_all(&document, &config.selectors.tabs)?;
    let bar = read_tab_bar(&tabs, &config);

    let shared: SharedViewer = Rc::new_cyclic(|weak| {
        let host = DomHost {
            document: document.clone(),
            container,
            tabs: tabs.clone(),
            nav_selector: config.selectors.nav.clone(),
            title_selector: config.selectors.main_title.clone(),
            viewer: weak.clone(),
            observer: None,
            cheers: None,
            aux_handlers: Vec::new(),
            retired_handlers: Vec::new(),
        };
        RefCell::new(ArticleViewer::new(config, host))
    });
    shared.borrow_mut().bind_tabs(bar);

    for (index, tab) in tabs.iter().enumerate() {
        let weak = Rc::downgrade(&shared);
        let onclick = Closure::wrap(Box::new(move |_: Event| {
            dispatch(&weak, Click::Tab(index));
        }) as Box<dyn FnMut(_)>);
        tab.add_event_listener_with_callback("click", onclick.as_ref().unchecked_ref())
            .map_err(js_err)?;
        onclick.forget();
    }

    VIEWER.with(|slot| *slot.borrow_mut() = Some(shared));
    Ok(tabs.len())
}

fn read_config(document: &Document) -> Result<ViewerConfig, String> {
    match document.get_element_by_id(CONFIG_ELEMENT_ID) {
        Some(el) => {
            let json = el.text_content().unwrap_or_default();
            ViewerConfig::from_json_str(&json).map_err(|e| e.to_string())
        }
        None => Ok(ViewerConfig::default()),
    }
}

fn read_tab_bar(tabs: &[Element], config: &ViewerConfig) -> TabBar {
    let mut bar = TabBar::default();
    for (index, tab) in tabs.iter().enumerate() {
        if bar.initially_active.is_none()
            && tab.class_list().contains(&config.ui.active_class)
        {
            bar.initially_active = Some(index);
        }
        bar.tabs.push(TabSpec {
            index,
            label: tab.text_content().unwrap_or_default().trim().to_string(),
            target: tab
                .get_attribute(&config.selectors.tab_attribute)
                .unwrap_or_default(),
        });
    }
    bar
}

/// Start a load on the viewer and finish it once the fetch settles.
fn dispatch(weak: &WeakViewer, click: Click) {
    let Some(shared) = weak.upgrade() else {
        return;
    };
    let request = {
        let Ok(mut viewer) = shared.try_borrow_mut() else {
            log::warn!("click ignored: viewer busy");
            return;
        };
        match click {
            Click::Tab(index) => viewer.click_tab(index),
            Click::Aux(id) => viewer.click_aux(&id),
            Click::Path(path) => Some(viewer.begin_load(&path)),
        }
    };
    if let Some(request) = request {
        spawn_local(complete(shared, request));
    }
}

async fn complete(shared: SharedViewer, request: LoadRequest) {
    let result = fetch_fragment(&request.path).await;
    match shared.try_borrow_mut() {
        Ok(mut viewer) => {
            viewer.complete_load(request.ticket, result);
        }
        Err(_) => log::warn!("load #{} dropped: viewer busy", request.ticket.get()),
    }
}

async fn fetch_fragment(path: &str) -> Result<String, FetchError> {
    let resp = gloo_net::http::Request::get(path)
        .send()
        .await
        .map_err(FetchError::transport)?;
    if !resp.ok() {
        return Err(FetchError::Status(resp.status()));
    }
    resp.text().await.map_err(FetchError::transport)
}

fn js_err(err: JsValue) -> String {
    format!("{:?}", err)
}

fn query_all(document: &Document, selector: &str) -> Result<Vec<Element>, String> {
    let list = document.query_selector_all(selector).map_err(js_err)?;
    Ok((0..list.length())
        .filter_map(|i| list.get(i))
        .filter_map(|node| node.dyn_into::<Element>().ok())
        .collect())
}

fn query_all_in(root: &Element, selector: &str) -> Vec<Element> {
    match root.query_selector_all(selector) {
        Ok(list) => (0..list.length())
            .filter_map(|i| list.get(i))
            .filter_map(|node| node.dyn_into::<Element>().ok())
            .collect(),
        Err(err) => {
            log::warn!("query '{}' failed: {}", selector, js_err(err));
            Vec::new()
        }
    }
}

fn warn_on_err(what: &str, result: Result<(), JsValue>) {
    if let Err(err) = result {
        log::warn!("{} failed: {}", what, js_err(err));
    }
}

struct SectionObserver {
    ticket: LoadTicket,
    observer: IntersectionObserver,
    sections: Vec<Element>,
    _callback: Closure<dyn FnMut(js_sys::Array, IntersectionObserver)>,
}

impl Drop for SectionObserver {
    fn drop(&mut self) {
        self.observer.disconnect();
    }
}

pub struct DomHost {
    document: Document,
    container: HtmlElement,
    tabs: Vec<Element>,
    nav_selector: String,
    title_selector: String,
    viewer: WeakViewer,
    observer: Option<SectionObserver>,
    cheers: Option<(LoadTicket, Vec<HtmlElement>)>,
    aux_handlers: Vec<ClickHandler>,
    // Handlers of a removed row; one of them may still be on the stack.
    retired_handlers: Vec<ClickHandler>,
}

impl DomHost {
    fn bind_aux_buttons(&mut self, row: &AuxRow) {
        for button in &row.buttons {
            let Some(el) = self.document.get_element_by_id(&button.id) else {
                log::warn!("auxiliary button '{}' missing after mount", button.id);
                continue;
            };
            let weak = self.viewer.clone();
            let id = button.id.clone();
            let onclick = Closure::wrap(Box::new(move |_: Event| {
                dispatch(&weak, Click::Aux(id.clone()));
            }) as Box<dyn FnMut(_)>);
            warn_on_err(
                "binding auxiliary button",
                el.add_event_listener_with_callback("click", onclick.as_ref().unchecked_ref()),
            );
            self.aux_handlers.push(onclick);
        }
    }
}

impl ViewHost for DomHost {
    fn set_container_html(&mut self, html: &str) {
        self.container.set_inner_html(html);
    }

    fn add_container_class(&mut self, class: &str) {
        warn_on_err("adding container class", self.container.class_list().add_1(class));
    }

    fn remove_container_class(&mut self, class: &str) {
        warn_on_err(
            "removing container class",
            self.container.class_list().remove_1(class),
        );
    }

    fn flush_layout(&mut self) {
        let _ = self.container.offset_width();
    }

    fn set_tab_marker(&mut self, index: usize, class: &str, active: bool) {
        if let Some(tab) = self.tabs.get(index) {
            if let Err(err) = tab.class_list().toggle_with_force(class, active) {
                log::warn!("tab marker update failed: {}", js_err(err));
            }
        }
    }

    fn set_aux_marker(&mut self, id: &str, class: &str, active: bool) {
        if let Some(button) = self.document.get_element_by_id(id) {
            if let Err(err) = button.class_list().toggle_with_force(class, active) {
                log::warn!("button marker update failed: {}", js_err(err));
            }
        }
    }

    fn has_nav(&self) -> bool {
        self.document
            .query_selector(&self.nav_selector)
            .is_ok_and(|nav| nav.is_some())
    }

    fn mount_aux_row(&mut self, row: &AuxRow) {
        self.remove_aux_row(&row.container_id);
        self.retired_handlers.clear();
        let Ok(Some(nav)) = self.document.query_selector(&self.nav_selector) else {
            return;
        };
        warn_on_err(
            "mounting auxiliary row",
            nav.insert_adjacent_html("afterend", &row.outer_html()),
        );
        self.bind_aux_buttons(row);
    }

    fn remove_aux_row(&mut self, container_id: &str) {
        if let Some(el) = self.document.get_element_by_id(container_id) {
            el.remove();
        }
        self.retired_handlers.append(&mut self.aux_handlers);
    }

    fn observe_sections(&mut self, ticket: LoadTicket, threshold: f32) -> usize {
        self.observer = None;
        let sections = query_all_in(&self.container, "section");
        if sections.is_empty() {
            return 0;
        }
        for (index, section) in sections.iter().enumerate() {
            warn_on_err(
                "tagging section",
                section.set_attribute(REVEAL_INDEX_ATTR, &index.to_string()),
            );
        }

        let weak = self.viewer.clone();
        let callback = Closure::wrap(Box::new(
            move |entries: js_sys::Array, _: IntersectionObserver| {
                let Some(shared) = weak.upgrade() else {
                    return;
                };
                let Ok(mut viewer) = shared.try_borrow_mut() else {
                    log::debug!("intersection report dropped: viewer busy");
                    return;
                };
                for entry in entries.iter() {
                    let entry: IntersectionObserverEntry = entry.unchecked_into();
                    let index = entry
                        .target()
                        .get_attribute(REVEAL_INDEX_ATTR)
                        .and_then(|v| v.parse::<usize>().ok());
                    if let Some(index) = index {
                        viewer.on_section_intersection(ticket, index, entry.is_intersecting());
                    }
                }
            },
        ) as Box<dyn FnMut(js_sys::Array, IntersectionObserver)>);

        let options = IntersectionObserverInit::new();
        options.set_threshold(&JsValue::from_f64(f64::from(threshold)));
        let observer = match IntersectionObserver::new_with_options(
            callback.as_ref().unchecked_ref(),
            &options,
        ) {
            Ok(observer) => observer,
            Err(err) => {
                log::warn!("IntersectionObserver unavailable: {}", js_err(err));
                return 0;
            }
        };
        for section in &sections {
            observer.observe(section);
        }
        let count = sections.len();
        self.observer = Some(SectionObserver {
            ticket,
            observer,
            sections,
            _callback: callback,
        });
        count
    }

    fn reveal_section(&mut self, ticket: LoadTicket, index: usize, class: &str) {
        let Some(tracked) = self.observer.as_ref().filter(|o| o.ticket == ticket) else {
            return;
        };
        if let Some(section) = tracked.sections.get(index) {
            warn_on_err("revealing section", section.class_list().add_1(class));
            tracked.observer.unobserve(section);
        }
    }

    fn render_cheers(&mut self, ticket: LoadTicket, plan: &CheerPlan) -> usize {
        let placeholders = query_all_in(&self.container, &format!(".{}", plan.placeholder_class));
        let mut images = Vec::with_capacity(placeholders.len());
        for holder in &placeholders {
            holder.set_inner_html("");
            let img = match self.document.create_element("img") {
                Ok(img) => img,
                Err(err) => {
                    log::warn!("creating cheer image failed: {}", js_err(err));
                    continue;
                }
            };
            warn_on_err("cheer src", img.set_attribute("src", &plan.src));
            warn_on_err("cheer alt", img.set_attribute("alt", &plan.alt));
            warn_on_err("cheer style", img.set_attribute("style", &plan.hidden_style));
            if let Err(err) = holder.append_child(&img) {
                log::warn!("appending cheer image failed: {}", js_err(err));
                continue;
            }
            let Ok(img) = img.dyn_into::<HtmlElement>() else {
                continue;
            };
            let timer = CheerTimer {
                ticket,
                index: images.len(),
                delay_ms: plan.delay_ms,
            };
            images.push(img);

            let weak = self.viewer.clone();
            spawn_local(async move {
                TimeoutFuture::new(timer.delay_ms).await;
                if let Some(shared) = weak.upgrade() {
                    if let Ok(mut viewer) = shared.try_borrow_mut() {
                        viewer.fire_cheer(timer);
                    }
                }
            });
        }
        let count = images.len();
        self.cheers = Some((ticket, images));
        count
    }

    fn show_cheer(&mut self, ticket: LoadTicket, index: usize, plan: &CheerPlan) {
        let Some((rendered, images)) = self.cheers.as_ref() else {
            return;
        };
        if *rendered != ticket {
            return;
        }
        if let Some(img) = images.get(index) {
            let style = img.style();
            for (name, value) in &plan.shown {
                warn_on_err("showing cheer", style.set_property(name, value));
            }
        }
    }

    fn set_title(&mut self, title: &str) {
        if let Ok(Some(el)) = self.document.query_selector(&self.title_selector) {
            el.set_text_content(Some(title));
        }
    }

    fn page_path(&self) -> Option<String> {
        web_sys::window()?.location().pathname().ok()
    }
}
