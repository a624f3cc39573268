//! Static completion tables.
//!
//! Two disjoint sets: HTML tag openers and CSS property declarations. The
//! active tab's grammar decides which one is consulted; they are never
//! merged. Table order is the display order.

use serde::Serialize;

/// One completion entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Suggestion {
    /// What the user types to reach this entry.
    pub prefix: &'static str,
    /// Text inserted in place of the typed word.
    pub snippet: &'static str,
    pub description: &'static str,
}

const fn s(prefix: &'static str, snippet: &'static str, description: &'static str) -> Suggestion {
    Suggestion {
        prefix,
        snippet,
        description,
    }
}

pub static HTML_TAGS: &[Suggestion] = &[
    s("div", "<div></div>", "Generic block container"),
    s("span", "<span></span>", "Generic inline container"),
    s("p", "<p></p>", "Paragraph"),
    s("a", "<a href=\"\"></a>", "Hyperlink"),
    s("img", "<img src=\"\" alt=\"\">", "Image"),
    s("ul", "<ul></ul>", "Unordered list"),
    s("ol", "<ol></ol>", "Ordered list"),
    s("li", "<li></li>", "List item"),
    s("h1", "<h1></h1>", "Heading level 1"),
    s("h2", "<h2></h2>", "Heading level 2"),
    s("h3", "<h3></h3>", "Heading level 3"),
    s("h4", "<h4></h4>", "Heading level 4"),
    s("h5", "<h5></h5>", "Heading level 5"),
    s("h6", "<h6></h6>", "Heading level 6"),
    s("header", "<header></header>", "Page or section header"),
    s("footer", "<footer></footer>", "Page or section footer"),
    s("nav", "<nav></nav>", "Navigation links"),
    s("main", "<main></main>", "Main content"),
    s("section", "<section></section>", "Thematic section"),
    s("article", "<article></article>", "Self-contained composition"),
    s("aside", "<aside></aside>", "Sidebar content"),
    s("button", "<button></button>", "Clickable button"),
    s("form", "<form></form>", "Form"),
    s("input", "<input type=\"text\">", "Input field"),
    s("label", "<label></label>", "Form label"),
    s("textarea", "<textarea></textarea>", "Multi-line text input"),
    s("select", "<select></select>", "Drop-down list"),
    s("option", "<option></option>", "Drop-down option"),
    s("table", "<table></table>", "Table"),
    s("thead", "<thead></thead>", "Table head"),
    s("tbody", "<tbody></tbody>", "Table body"),
    s("tr", "<tr></tr>", "Table row"),
    s("th", "<th></th>", "Table header cell"),
    s("td", "<td></td>", "Table data cell"),
    s("strong", "<strong></strong>", "Strong importance"),
    s("em", "<em></em>", "Emphasis"),
    s("blockquote", "<blockquote></blockquote>", "Quotation"),
    s("figure", "<figure></figure>", "Figure with caption"),
    s("figcaption", "<figcaption></figcaption>", "Figure caption"),
    s("video", "<video src=\"\" controls></video>", "Video player"),
];

pub static CSS_PROPERTIES: &[Suggestion] = &[
    s("color", "color: ;", "Text color"),
    s("background", "background: ;", "Background shorthand"),
    s("background-color", "background-color: ;", "Background color"),
    s("background-image", "background-image: ;", "Background image"),
    s("border", "border: ;", "Border shorthand"),
    s("border-radius", "border-radius: ;", "Rounded corners"),
    s("box-shadow", "box-shadow: ;", "Drop shadow"),
    s("margin", "margin: ;", "Outer spacing"),
    s("margin-top", "margin-top: ;", "Top outer spacing"),
    s("margin-bottom", "margin-bottom: ;", "Bottom outer spacing"),
    s("padding", "padding: ;", "Inner spacing"),
    s("padding-top", "padding-top: ;", "Top inner spacing"),
    s("padding-bottom", "padding-bottom: ;", "Bottom inner spacing"),
    s("display", "display: ;", "Display type"),
    s("flex-direction", "flex-direction: ;", "Flex main axis"),
    s("flex-wrap", "flex-wrap: ;", "Flex wrapping"),
    s("justify-content", "justify-content: ;", "Main-axis alignment"),
    s("align-items", "align-items: ;", "Cross-axis alignment"),
    s("gap", "gap: ;", "Gap between grid/flex items"),
    s("grid-template-columns", "grid-template-columns: ;", "Grid column tracks"),
    s("font-size", "font-size: ;", "Font size"),
    s("font-weight", "font-weight: ;", "Font weight"),
    s("font-family", "font-family: ;", "Font family"),
    s("line-height", "line-height: ;", "Line height"),
    s("text-align", "text-align: ;", "Text alignment"),
    s("text-decoration", "text-decoration: ;", "Text decoration"),
    s("width", "width: ;", "Width"),
    s("height", "height: ;", "Height"),
    s("max-width", "max-width: ;", "Maximum width"),
    s("min-height", "min-height: ;", "Minimum height"),
    s("position", "position: ;", "Positioning scheme"),
    s("top", "top: ;", "Top offset"),
    s("left", "left: ;", "Left offset"),
    s("right", "right: ;", "Right offset"),
    s("bottom", "bottom: ;", "Bottom offset"),
    s("z-index", "z-index: ;", "Stacking order"),
    s("opacity", "opacity: ;", "Opacity"),
    s("overflow", "overflow: ;", "Overflow handling"),
    s("cursor", "cursor: ;", "Mouse cursor"),
    s("transition", "transition: ;", "Transition shorthand"),
    s("transform", "transform: ;", "2D/3D transform"),
];

/// Source grammar of a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Grammar {
    Html,
    Css,
}

impl Grammar {
    /// The table consulted for this grammar.
    pub fn table(self) -> &'static [Suggestion] {
        match self {
            Grammar::Html => HTML_TAGS,
            Grammar::Css => CSS_PROPERTIES,
        }
    }
}

impl std::fmt::Display for Grammar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Grammar::Html => write!(f, "html"),
            Grammar::Css => write!(f, "css"),
        }
    }
}

impl std::str::FromStr for Grammar {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "html" => Ok(Grammar::Html),
            "css" => Ok(Grammar::Css),
            other => Err(format!("unknown grammar '{other}' (expected html or css)")),
        }
    }
}

/// Case-insensitive prefix matches in table order, at most `limit`.
pub fn prefix_matches(grammar: Grammar, word: &str, limit: usize) -> Vec<Suggestion> {
    if word.is_empty() {
        return Vec::new();
    }
    let needle = word.to_ascii_lowercase();
    grammar
        .table()
        .iter()
        .filter(|s| s.prefix.starts_with(needle.as_str()))
        .take(limit)
        .copied()
        .collect()
}
