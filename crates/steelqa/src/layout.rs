//! Page-structure checks on raw HTML.
//!
//! Looks for the sidebar shell the Steel Estimation layout renders: sidebar
//! container, main content, page wrapper, menu toggle, logo, stylesheets and
//! Blazor server markers. Each predicate is evaluated on its own; a missing
//! element only fails its own check.

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde::Serialize;

use crate::config::LayoutExpectations;
use crate::types::CheckResult;

pub const CHECK_SIDEBAR: &str = "Sidebar element exists";
pub const CHECK_MAIN: &str = "Main content element exists";
pub const CHECK_PAGE: &str = "Page wrapper exists";
pub const CHECK_HAMBURGER: &str = "Hamburger menu exists";
pub const CHECK_LOGO: &str = "Logo image exists";
pub const CHECK_LOGO_IN_SIDEBAR: &str = "Logo inside sidebar";
pub const CHECK_BLAZOR: &str = "Blazor configured";

const SIDEBAR_SELECTORS: &[&str] = &[".sidebar", "#main-sidebar"];
const MAIN_SELECTORS: &[&str] = &["main", "#main-content"];
const PAGE_SELECTORS: &[&str] = &[".page", "#main-page"];
const TOGGLE_SELECTORS: &[&str] = &[".menu-toggle-btn", ".navbar-toggler"];
const TOGGLE_ICON_SELECTOR: &str = r#"i[class*="fa-bars"]"#;

/// Stylesheets reported in the detail section when present.
pub const KNOWN_STYLESHEETS: &[&str] = &["site.css", "viewscape.css", "bootstrap"];

const BLAZOR_MARKER: &str = "Blazor:";
const MAX_STYLE_RULES: usize = 3;
const STYLE_RULE_PREVIEW: usize = 100;

/// Tag, id and classes of a located element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ElementInfo {
    pub tag: String,
    pub id: Option<String>,
    pub classes: Vec<String>,
}

impl ElementInfo {
    fn from_element(el: &ElementRef<'_>) -> Self {
        Self {
            tag: el.value().name().to_string(),
            id: el.value().id().map(|s| s.to_string()),
            classes: el.value().classes().map(|s| s.to_string()).collect(),
        }
    }
}

/// How the menu toggle was found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MenuToggle {
    /// A dedicated toggle button.
    Button(ElementInfo),
    /// Only a `fa-bars` icon.
    Icon,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogoInfo {
    pub src: String,
    pub alt: Option<String>,
    pub inside_sidebar: bool,
}

/// Everything the checker saw, plus the ordered checklist.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LayoutReport {
    pub sidebar: Option<ElementInfo>,
    pub sidebar_has_nav_menu: bool,
    pub main_content: Option<ElementInfo>,
    pub page_wrapper: Option<ElementInfo>,
    pub menu_toggle: Option<MenuToggle>,
    /// `href` of every stylesheet link, in document order.
    pub stylesheets: Vec<String>,
    pub logo: Option<LogoInfo>,
    /// Whether any `<style>` block mentions the sidebar.
    pub inline_sidebar_styles: bool,
    /// Up to three sidebar rules per style block, truncated.
    pub inline_sidebar_rules: Vec<String>,
    pub blazor_markers: usize,
    pub blazor_script: Option<String>,
    pub checks: Vec<CheckResult>,
}

impl LayoutReport {
    pub fn passed(&self) -> usize {
        self.checks.iter().filter(|c| c.passed).count()
    }

    pub fn total(&self) -> usize {
        self.checks.len()
    }

    pub fn all_passed(&self) -> bool {
        self.passed() == self.total()
    }

    /// Outcome of the check called `name`.
    pub fn check(&self, name: &str) -> Option<bool> {
        self.checks.iter().find(|c| c.name == name).map(|c| c.passed)
    }

    /// Stylesheets from [`KNOWN_STYLESHEETS`] that were linked, with the href matched.
    pub fn known_stylesheets(&self) -> Vec<(&'static str, &str)> {
        KNOWN_STYLESHEETS
            .iter()
            .filter_map(|name| {
                self.stylesheets
                    .iter()
                    .find(|href| href.contains(name))
                    .map(|href| (*name, href.as_str()))
            })
            .collect()
    }
}

/// Name of the check for stylesheet `name`.
pub fn stylesheet_check_name(name: &str) -> String {
    format!("{name} loaded")
}

/// Run the full checklist over `html`.
pub fn check_layout(html: &str, expectations: &LayoutExpectations) -> LayoutReport {
    let document = Html::parse_document(html);
    let mut report = LayoutReport::default();

    let sidebar = first_match(&document, SIDEBAR_SELECTORS);
    if let Some(el) = &sidebar {
        report.sidebar = Some(ElementInfo::from_element(el));
        report.sidebar_has_nav_menu = has_nav_menu(el);
    }

    report.main_content = first_match(&document, MAIN_SELECTORS).map(|e| ElementInfo::from_element(&e));
    report.page_wrapper = first_match(&document, PAGE_SELECTORS).map(|e| ElementInfo::from_element(&e));
    report.menu_toggle = find_menu_toggle(&document);
    report.stylesheets = stylesheet_hrefs(&document);
    report.logo = find_logo(&document, &expectations.logo_fragments);

    let (mentioned, rules) = inline_sidebar_rules(&document);
    report.inline_sidebar_styles = mentioned;
    report.inline_sidebar_rules = rules;

    report.blazor_markers = count_blazor_markers(&document);
    report.blazor_script = blazor_script(&document);

    let mut checks = vec![
        CheckResult::new(CHECK_SIDEBAR, report.sidebar.is_some()),
        CheckResult::new(CHECK_MAIN, report.main_content.is_some()),
        CheckResult::new(CHECK_PAGE, report.page_wrapper.is_some()),
        CheckResult::new(CHECK_HAMBURGER, report.menu_toggle.is_some()),
        CheckResult::new(CHECK_LOGO, report.logo.is_some()),
        CheckResult::new(
            CHECK_LOGO_IN_SIDEBAR,
            report.logo.as_ref().map(|l| l.inside_sidebar).unwrap_or(false),
        ),
    ];
    for name in &expectations.stylesheets {
        let loaded = report.stylesheets.iter().any(|href| href.contains(name.as_str()));
        checks.push(CheckResult::new(stylesheet_check_name(name), loaded));
    }
    checks.push(CheckResult::new(
        CHECK_BLAZOR,
        report.blazor_script.is_some() || report.blazor_markers > 0,
    ));
    report.checks = checks;

    report
}

/// Number of `.nav-link` elements on the page.
pub fn count_nav_links(html: &str) -> usize {
    let document = Html::parse_document(html);
    let sel = Selector::parse(".nav-link").unwrap();
    document.select(&sel).count()
}

/// First element matching the earliest selector in `selectors` that matches anything.
fn first_match<'a>(document: &'a Html, selectors: &[&str]) -> Option<ElementRef<'a>> {
    selectors.iter().find_map(|s| {
        let sel = Selector::parse(s).ok()?;
        document.select(&sel).next()
    })
}

fn has_nav_menu(sidebar: &ElementRef<'_>) -> bool {
    let nav_sel = Selector::parse("navmenu").unwrap();
    sidebar.select(&nav_sel).next().is_some() || sidebar.html().contains("NavMenu")
}

fn find_menu_toggle(document: &Html) -> Option<MenuToggle> {
    if let Some(el) = first_match(document, TOGGLE_SELECTORS) {
        return Some(MenuToggle::Button(ElementInfo::from_element(&el)));
    }
    first_match(document, &[TOGGLE_ICON_SELECTOR]).map(|_| MenuToggle::Icon)
}

fn stylesheet_hrefs(document: &Html) -> Vec<String> {
    let sel = Selector::parse(r#"link[rel~="stylesheet"]"#).unwrap();
    document
        .select(&sel)
        .map(|el| el.value().attr("href").unwrap_or("").to_string())
        .collect()
}

fn find_logo(document: &Html, fragments: &[String]) -> Option<LogoInfo> {
    let sel = Selector::parse("img[src]").unwrap();
    let img = document.select(&sel).find(|img| {
        let src = img.value().attr("src").unwrap_or("");
        fragments.iter().any(|f| src.contains(f.as_str()))
    })?;

    Some(LogoInfo {
        src: img.value().attr("src").unwrap_or("").to_string(),
        alt: img.value().attr("alt").map(|s| s.to_string()),
        inside_sidebar: inside_sidebar(&img),
    })
}

/// Walk ancestors up to (not including) `<body>` looking for the sidebar container.
fn inside_sidebar(el: &ElementRef<'_>) -> bool {
    for ancestor in el.ancestors().filter_map(ElementRef::wrap) {
        let value = ancestor.value();
        if value.name() == "body" {
            break;
        }
        let class_hit = value
            .attr("class")
            .map(|c| c.contains("sidebar"))
            .unwrap_or(false);
        if class_hit || value.id() == Some("main-sidebar") {
            return true;
        }
    }
    false
}

fn inline_sidebar_rules(document: &Html) -> (bool, Vec<String>) {
    let sel = Selector::parse("style").unwrap();
    let rule_re = Regex::new(r"\.sidebar[^{]*\{[^}]*\}").unwrap();

    let mut mentioned = false;
    let mut rules = Vec::new();
    for style in document.select(&sel) {
        let css: String = style.text().collect();
        if !css.contains(".sidebar") && !css.contains("#main-sidebar") {
            continue;
        }
        mentioned = true;
        rules.extend(
            rule_re
                .find_iter(&css)
                .take(MAX_STYLE_RULES)
                .map(|m| m.as_str().chars().take(STYLE_RULE_PREVIEW).collect::<String>()),
        );
    }
    (mentioned, rules)
}

/// Text and comment nodes carrying Blazor's server-side render markers.
fn count_blazor_markers(document: &Html) -> usize {
    document
        .tree
        .root()
        .descendants()
        .filter(|node| {
            let value = node.value();
            value
                .as_comment()
                .map(|c| c.contains(BLAZOR_MARKER))
                .or_else(|| value.as_text().map(|t| t.contains(BLAZOR_MARKER)))
                .unwrap_or(false)
        })
        .count()
}

fn blazor_script(document: &Html) -> Option<String> {
    let sel = Selector::parse(r#"script[src*="blazor"]"#).unwrap();
    document
        .select(&sel)
        .next()
        .and_then(|el| el.value().attr("src"))
        .map(|s| s.to_string())
}
