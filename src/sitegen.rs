//! Website generator: free-text description → static HTML/CSS/JS bundle.
//!
//! ```text
//! prompt ──► business name (regex)  ─┐
//!        └─► industry (keyword table)─┼─► colour scheme + copy ──► templates
//! options (style, sections) ─────────┘
//! ```
//!
//! No AST is built and the output is not validated; every interpolated
//! value is HTML-escaped.

use crate::archive::ZipBundle;
use crate::error::AxevoraError;
use crate::output::Artifact;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info};

pub const DEFAULT_BUSINESS_NAME: &str = "Your Business";

/// Words that end a name captured after "called"/"named".
const NAME_STOPWORDS: &[&str] = &[
    "in", "at", "for", "that", "which", "with", "who", "located", "based", "and", "offering",
    "where", "on", "near", "from",
];

const MAX_NAME_WORDS: usize = 5;

static RE_QUOTED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"["“]([^"“”\n]{2,60})["”]"#).unwrap());

static RE_CALLED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)\b(?:called|named)\s+['‘]?([^,.;:!?"“”\n]+)"#).unwrap()
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Industry {
    Restaurant,
    Fitness,
    Legal,
    Photography,
    Tech,
    Beauty,
    RealEstate,
    Health,
    Agency,
    General,
}

/// Keyword table; the first industry with a matching keyword wins.
const INDUSTRY_KEYWORDS: &[(Industry, &[&str])] = &[
    (
        Industry::Restaurant,
        &["restaurant", "cafe", "café", "coffee", "bakery", "bistro", "pizza", "food", "bar", "catering", "diner"],
    ),
    (
        Industry::Fitness,
        &["gym", "fitness", "yoga", "pilates", "personal trainer", "crossfit", "workout", "martial arts"],
    ),
    (Industry::Legal, &["law", "lawyer", "attorney", "legal", "solicitor", "notary"]),
    (
        Industry::Photography,
        &["photo", "photography", "photographer", "studio", "wedding film", "videography"],
    ),
    (
        Industry::Tech,
        &["software", "saas", "app", "startup", "tech", "it services", "developer", "ai", "cloud"],
    ),
    (
        Industry::Beauty,
        &["salon", "spa", "beauty", "barber", "nail", "hair", "makeup", "cosmetic"],
    ),
    (
        Industry::RealEstate,
        &["real estate", "realtor", "property", "properties", "homes for sale", "realty", "rental"],
    ),
    (
        Industry::Health,
        &["clinic", "dental", "dentist", "doctor", "medical", "therapy", "health", "physio", "vet"],
    ),
    (
        Industry::Agency,
        &["agency", "portfolio", "design", "marketing", "creative", "freelance", "consulting"],
    ),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorScheme {
    pub primary: &'static str,
    pub secondary: &'static str,
    pub accent: &'static str,
    pub background: &'static str,
    pub text: &'static str,
}

impl Industry {
    pub fn colors(self) -> ColorScheme {
        let (primary, secondary, accent, background, text) = match self {
            Industry::Restaurant => ("#b23a48", "#f4a259", "#5b8e7d", "#fffaf3", "#2d1e17"),
            Industry::Fitness => ("#e63946", "#1d3557", "#f1c40f", "#f8f9fa", "#111111"),
            Industry::Legal => ("#1b2a41", "#8c6d3f", "#c9a227", "#fdfdfb", "#1b1b1b"),
            Industry::Photography => ("#222222", "#666666", "#d4a373", "#ffffff", "#1a1a1a"),
            Industry::Tech => ("#4f46e5", "#06b6d4", "#22c55e", "#f8fafc", "#0f172a"),
            Industry::Beauty => ("#d17a9c", "#f2c4ce", "#8e5572", "#fff7f9", "#3d2b33"),
            Industry::RealEstate => ("#0f4c5c", "#e36414", "#9a031e", "#fbfbf8", "#1f2933"),
            Industry::Health => ("#0077b6", "#90e0ef", "#2a9d8f", "#f7fcff", "#123047"),
            Industry::Agency => ("#111827", "#f97316", "#8b5cf6", "#ffffff", "#111827"),
            Industry::General => ("#2563eb", "#64748b", "#f59e0b", "#ffffff", "#1e293b"),
        };
        ColorScheme {
            primary,
            secondary,
            accent,
            background,
            text,
        }
    }

    fn tagline(self) -> &'static str {
        match self {
            Industry::Restaurant => "Fresh food, warm welcome, every day.",
            Industry::Fitness => "Stronger every session.",
            Industry::Legal => "Clear advice when it matters most.",
            Industry::Photography => "Moments worth keeping.",
            Industry::Tech => "Software that just works.",
            Industry::Beauty => "Look good, feel better.",
            Industry::RealEstate => "Find the place you'll call home.",
            Industry::Health => "Care you can trust.",
            Industry::Agency => "Ideas, designed and delivered.",
            Industry::General => "Quality service, done right.",
        }
    }

    fn services(self) -> [(&'static str, &'static str); 3] {
        match self {
            Industry::Restaurant => [
                ("Dine In", "Seasonal menus served in a relaxed room."),
                ("Takeaway", "Order ahead and pick up on your way home."),
                ("Catering", "Menus for parties, offices and weddings."),
            ],
            Industry::Fitness => [
                ("Personal Training", "One-to-one sessions built around your goals."),
                ("Group Classes", "High-energy classes for every level."),
                ("Nutrition", "Simple plans that support your training."),
            ],
            Industry::Legal => [
                ("Consultations", "An honest first assessment of your case."),
                ("Representation", "Experienced advocacy in and out of court."),
                ("Contracts", "Drafting and review that protects you."),
            ],
            Industry::Photography => [
                ("Weddings", "Full-day coverage, candid and unposed."),
                ("Portraits", "Studio and on-location sessions."),
                ("Commercial", "Product and brand imagery."),
            ],
            Industry::Tech => [
                ("Development", "Web and mobile apps built to last."),
                ("Cloud", "Reliable hosting and infrastructure."),
                ("Support", "Fast help from people who know the system."),
            ],
            Industry::Beauty => [
                ("Hair", "Cuts, colour and styling."),
                ("Skin", "Facials and treatments for every skin type."),
                ("Nails", "Manicures and pedicures that last."),
            ],
            Industry::RealEstate => [
                ("Buying", "Guidance from first viewing to keys."),
                ("Selling", "Accurate valuations and strong marketing."),
                ("Rentals", "Managed lettings for owners and tenants."),
            ],
            Industry::Health => [
                ("Checkups", "Preventive care for the whole family."),
                ("Treatment", "Evidence-based care plans."),
                ("Follow-up", "Support that continues after your visit."),
            ],
            Industry::Agency => [
                ("Branding", "Identities that people remember."),
                ("Web Design", "Sites that look sharp and convert."),
                ("Campaigns", "Marketing that reaches the right audience."),
            ],
            Industry::General => [
                ("Consulting", "Advice tailored to your situation."),
                ("Delivery", "Reliable work, on time."),
                ("Support", "We're here after the job is done."),
            ],
        }
    }
}

impl fmt::Display for Industry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Industry::Restaurant => "restaurant",
            Industry::Fitness => "fitness",
            Industry::Legal => "legal",
            Industry::Photography => "photography",
            Industry::Tech => "tech",
            Industry::Beauty => "beauty",
            Industry::RealEstate => "real estate",
            Industry::Health => "health",
            Industry::Agency => "agency",
            Industry::General => "general",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SiteStyle {
    #[default]
    Modern,
    Classic,
    Minimal,
    Bold,
}

impl SiteStyle {
    fn font_stack(self) -> &'static str {
        match self {
            SiteStyle::Modern => "'Inter', 'Segoe UI', system-ui, sans-serif",
            SiteStyle::Classic => "Georgia, 'Times New Roman', serif",
            SiteStyle::Minimal => "'Helvetica Neue', Arial, sans-serif",
            SiteStyle::Bold => "'Montserrat', 'Arial Black', sans-serif",
        }
    }

    fn radius(self) -> &'static str {
        match self {
            SiteStyle::Modern => "12px",
            SiteStyle::Classic => "2px",
            SiteStyle::Minimal => "0",
            SiteStyle::Bold => "24px",
        }
    }
}

impl FromStr for SiteStyle {
    type Err = AxevoraError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "modern" => Ok(SiteStyle::Modern),
            "classic" => Ok(SiteStyle::Classic),
            "minimal" => Ok(SiteStyle::Minimal),
            "bold" => Ok(SiteStyle::Bold),
            other => Err(AxevoraError::InvalidInput {
                input: format!("site style '{other}'"),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Section {
    Hero,
    About,
    Services,
    Gallery,
    Testimonials,
    Contact,
}

impl Section {
    pub const ALL: [Section; 6] = [
        Section::Hero,
        Section::About,
        Section::Services,
        Section::Gallery,
        Section::Testimonials,
        Section::Contact,
    ];

    fn id(self) -> &'static str {
        match self {
            Section::Hero => "home",
            Section::About => "about",
            Section::Services => "services",
            Section::Gallery => "gallery",
            Section::Testimonials => "testimonials",
            Section::Contact => "contact",
        }
    }

    fn label(self) -> &'static str {
        match self {
            Section::Hero => "Home",
            Section::About => "About",
            Section::Services => "Services",
            Section::Gallery => "Gallery",
            Section::Testimonials => "Reviews",
            Section::Contact => "Contact",
        }
    }
}

impl FromStr for Section {
    type Err = AxevoraError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Section::ALL
            .into_iter()
            .find(|sec| {
                let s = s.trim();
                sec.id().eq_ignore_ascii_case(s) || sec.label().eq_ignore_ascii_case(s)
                    || format!("{sec:?}").eq_ignore_ascii_case(s)
            })
            .ok_or_else(|| AxevoraError::InvalidInput {
                input: format!("site section '{}'", s.trim()),
            })
    }
}

/// Input to [`generate_site`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteRequest {
    /// Free-text description, e.g. "a bakery called Sweet Crumbs in Leeds".
    pub prompt: String,
    pub style: SiteStyle,
    /// Sections in page order. Empty means all of them.
    pub sections: Vec<Section>,
}

impl SiteRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            style: SiteStyle::default(),
            sections: Section::ALL.to_vec(),
        }
    }
}

/// Generated pages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedSite {
    pub business_name: String,
    pub industry: Industry,
    pub html: String,
    pub css: String,
    pub js: String,
}

impl GeneratedSite {
    /// `index.html`, `styles.css` and `script.js` in a zip.
    pub fn to_zip(&self) -> Result<Artifact, AxevoraError> {
        let mut bundle = ZipBundle::new();
        bundle.add("index.html", self.html.as_bytes())?;
        bundle.add("styles.css", self.css.as_bytes())?;
        bundle.add("script.js", self.js.as_bytes())?;
        Ok(Artifact::zip(format!("{}-site.zip", slug(&self.business_name)), bundle.finish()?))
    }

    /// One HTML file with the stylesheet and script inlined.
    pub fn to_single_file(&self) -> Artifact {
        let html = self
            .html
            .replace(
                r#"<link rel="stylesheet" href="styles.css">"#,
                &format!("<style>\n{}</style>", self.css),
            )
            .replace(
                r#"<script src="script.js"></script>"#,
                &format!("<script>\n{}</script>", self.js),
            );
        Artifact::new(
            format!("{}.html", slug(&self.business_name)),
            "text/html; charset=utf-8",
            html.into_bytes(),
        )
    }
}

/// Lower-case, hyphen-separated ASCII form of a name.
pub fn slug(name: &str) -> String {
    let mut out = String::new();
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
        } else if !out.ends_with('-') && !out.is_empty() {
            out.push('-');
        }
    }
    let out = out.trim_end_matches('-').to_string();
    if out.is_empty() {
        "site".to_string()
    } else {
        out
    }
}

/// Escape text for HTML element content and attribute values.
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Pull a business name out of the prompt.
///
/// A quoted phrase wins; otherwise the words after "called" or "named", up to
/// punctuation or a connective such as "in" or "for". Falls back to
/// [`DEFAULT_BUSINESS_NAME`].
pub fn extract_business_name(prompt: &str) -> String {
    if let Some(caps) = RE_QUOTED.captures(prompt) {
        let name = caps[1].trim();
        if !name.is_empty() {
            return name.to_string();
        }
    }
    if let Some(caps) = RE_CALLED.captures(prompt) {
        let words: Vec<&str> = caps[1]
            .split_whitespace()
            .map(|w| w.trim_matches(|c| matches!(c, '\'' | '‘' | '’')))
            .filter(|w| !w.is_empty())
            .take_while(|w| !NAME_STOPWORDS.contains(&w.to_lowercase().as_str()))
            .take(MAX_NAME_WORDS)
            .collect();
        if !words.is_empty() {
            return words.iter().map(|w| capitalise(w)).collect::<Vec<_>>().join(" ");
        }
    }
    DEFAULT_BUSINESS_NAME.to_string()
}

fn capitalise(word: &str) -> String {
    if word.chars().any(|c| c.is_uppercase()) {
        return word.to_string();
    }
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Classify the prompt by keyword.
pub fn detect_industry(prompt: &str) -> Industry {
    let text = format!(" {} ", prompt.to_lowercase());
    INDUSTRY_KEYWORDS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| contains_word(&text, k)))
        .map(|(industry, _)| *industry)
        .unwrap_or(Industry::General)
}

/// `keyword` occurs in `text` as a whole word, optionally pluralised with `s`.
fn contains_word(text: &str, keyword: &str) -> bool {
    let keyword = keyword.trim_end();
    text.match_indices(keyword).any(|(i, _)| {
        let before = text[..i].chars().next_back();
        let rest = &text[i + keyword.len()..];
        let rest = rest.strip_prefix('s').unwrap_or(rest);
        before.is_none_or(|c| !c.is_alphanumeric())
            && rest.chars().next().is_none_or(|c| !c.is_alphanumeric())
    })
}

/// Build the site.
pub fn generate_site(req: &SiteRequest) -> GeneratedSite {
    let business_name = extract_business_name(&req.prompt);
    let industry = detect_industry(&req.prompt);
    let sections: Vec<Section> = if req.sections.is_empty() {
        Section::ALL.to_vec()
    } else {
        req.sections.clone()
    };
    info!(
        "Generating {:?} {} site for '{}' with {} sections",
        req.style,
        industry,
        business_name,
        sections.len()
    );

    let html = render_html(&business_name, industry, &req.prompt, &sections);
    let css = render_css(industry.colors(), req.style);
    let js = render_js();
    debug!("Site: {} bytes html, {} bytes css", html.len(), css.len());

    GeneratedSite {
        business_name,
        industry,
        html,
        css,
        js,
    }
}

fn render_html(name: &str, industry: Industry, prompt: &str, sections: &[Section]) -> String {
    let name = escape_html(name);
    let tagline = escape_html(industry.tagline());
    let about = escape_html(prompt.trim());

    let nav: String = sections
        .iter()
        .filter(|s| **s != Section::Hero)
        .map(|s| format!(r##"<li><a href="#{}">{}</a></li>"##, s.id(), s.label()))
        .collect::<Vec<_>>()
        .join("");

    let mut body = String::new();
    for section in sections {
        let block = match section {
            Section::Hero => format!(
                r##"<section id="home" class="hero">
  <h1>{name}</h1>
  <p class="tagline">{tagline}</p>
  <a class="button" href="#contact">Get in touch</a>
</section>
"##
            ),
            Section::About => format!(
                r#"<section id="about">
  <h2>About {name}</h2>
  <p>{about}</p>
</section>
"#
            ),
            Section::Services => {
                let cards: String = industry
                    .services()
                    .iter()
                    .map(|(title, text)| {
                        format!(
                            "    <div class=\"card\"><h3>{}</h3><p>{}</p></div>\n",
                            escape_html(title),
                            escape_html(text)
                        )
                    })
                    .collect();
                format!(
                    "<section id=\"services\">\n  <h2>Services</h2>\n  <div class=\"grid\">\n{cards}  </div>\n</section>\n"
                )
            }
            Section::Gallery => {
                let tiles: String = (1..=6)
                    .map(|i| format!("    <div class=\"tile\" aria-label=\"Gallery image {i}\"></div>\n"))
                    .collect();
                format!(
                    "<section id=\"gallery\">\n  <h2>Gallery</h2>\n  <div class=\"gallery\">\n{tiles}  </div>\n</section>\n"
                )
            }
            Section::Testimonials => format!(
                r#"<section id="testimonials">
  <h2>What people say</h2>
  <blockquote>"Friendly, professional and worth every penny." <cite>Sam R.</cite></blockquote>
  <blockquote>"{name} exceeded every expectation." <cite>Alex P.</cite></blockquote>
</section>
"#
            ),
            Section::Contact => format!(
                r#"<section id="contact">
  <h2>Contact</h2>
  <form id="contact-form">
    <input name="name" placeholder="Your name" required>
    <input name="email" type="email" placeholder="Email" required>
    <textarea name="message" placeholder="How can {name} help?" required></textarea>
    <button class="button" type="submit">Send</button>
    <p id="form-status" role="status"></p>
  </form>
</section>
"#
            ),
        };
        body.push_str(&block);
    }

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{name}</title>
<meta name="description" content="{name}: {tagline}">
<link rel="stylesheet" href="styles.css">
</head>
<body>
<header>
  <div class="logo">{name}</div>
  <button class="menu-toggle" aria-label="Menu">&#9776;</button>
  <nav><ul>{nav}</ul></nav>
</header>
<main>
{body}</main>
<footer><p>&copy; <span id="year"></span> {name}</p></footer>
<script src="script.js"></script>
</body>
</html>
"#
    )
}

fn render_css(c: ColorScheme, style: SiteStyle) -> String {
    format!(
        r#":root {{
  --primary: {primary};
  --secondary: {secondary};
  --accent: {accent};
  --bg: {background};
  --text: {text};
  --radius: {radius};
}}
* {{ box-sizing: border-box; margin: 0; padding: 0; }}
body {{ font-family: {font}; background: var(--bg); color: var(--text); line-height: 1.6; }}
header {{ display: flex; align-items: center; justify-content: space-between; padding: 1rem 2rem; background: var(--primary); color: #fff; position: sticky; top: 0; }}
header nav ul {{ display: flex; gap: 1.5rem; list-style: none; }}
header a {{ color: #fff; text-decoration: none; }}
.logo {{ font-weight: 700; font-size: 1.25rem; }}
.menu-toggle {{ display: none; background: none; border: 0; color: #fff; font-size: 1.5rem; }}
section {{ padding: 4rem 2rem; max-width: 1100px; margin: 0 auto; }}
h2 {{ margin-bottom: 1.5rem; color: var(--primary); }}
.hero {{ text-align: center; padding: 6rem 2rem; }}
.hero h1 {{ font-size: 3rem; color: var(--primary); }}
.tagline {{ font-size: 1.25rem; margin: 1rem 0 2rem; color: var(--secondary); }}
.button {{ display: inline-block; padding: 0.75rem 1.75rem; background: var(--accent); color: #fff; border: 0; border-radius: var(--radius); text-decoration: none; cursor: pointer; }}
.grid {{ display: grid; grid-template-columns: repeat(auto-fit, minmax(240px, 1fr)); gap: 1.5rem; }}
.card {{ padding: 1.5rem; border-radius: var(--radius); background: #fff; box-shadow: 0 2px 12px rgba(0,0,0,0.08); }}
.gallery {{ display: grid; grid-template-columns: repeat(3, 1fr); gap: 1rem; }}
.tile {{ aspect-ratio: 4 / 3; border-radius: var(--radius); background: linear-gradient(135deg, var(--primary), var(--secondary)); }}
blockquote {{ margin: 1rem 0; padding: 1rem 1.5rem; border-left: 4px solid var(--accent); }}
form {{ display: grid; gap: 1rem; max-width: 560px; }}
input, textarea {{ padding: 0.75rem; border: 1px solid #ccc; border-radius: var(--radius); font: inherit; }}
textarea {{ min-height: 140px; }}
footer {{ text-align: center; padding: 2rem; background: var(--primary); color: #fff; }}
@media (max-width: 720px) {{
  .menu-toggle {{ display: block; }}
  header nav {{ display: none; }}
  header nav.open {{ display: block; }}
  header nav ul {{ flex-direction: column; }}
  .gallery {{ grid-template-columns: repeat(2, 1fr); }}
}}
"#,
        primary = c.primary,
        secondary = c.secondary,
        accent = c.accent,
        background = c.background,
        text = c.text,
        radius = style.radius(),
        font = style.font_stack(),
    )
}

fn render_js() -> String {
    r##"document.addEventListener('DOMContentLoaded', function () {
  var year = document.getElementById('year');
  if (year) { year.textContent = new Date().getFullYear(); }

  var toggle = document.querySelector('.menu-toggle');
  var nav = document.querySelector('header nav');
  if (toggle && nav) {
    toggle.addEventListener('click', function () { nav.classList.toggle('open'); });
  }

  document.querySelectorAll('a[href^="#"]').forEach(function (link) {
    link.addEventListener('click', function (e) {
      var target = document.querySelector(link.getAttribute('href'));
      if (target) {
        e.preventDefault();
        target.scrollIntoView({ behavior: 'smooth' });
        if (nav) { nav.classList.remove('open'); }
      }
    });
  });

  var form = document.getElementById('contact-form');
  if (form) {
    form.addEventListener('submit', function (e) {
      e.preventDefault();
      document.getElementById('form-status').textContent = 'Thanks! We will be in touch soon.';
      form.reset();
    });
  }
});
"##
    .to_string()
}
