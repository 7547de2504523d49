//! HTML rendering of the single contacts page: sidebar form, table, poem and map.

use std::fmt::Write as _;

use crate::models::contact::{ContactTable, MapPoint, DISPLAY_COLUMNS};
use crate::session::controller::SidebarState;

const TITLE: &str = "Meine Kontakte-App";
const POEM_HEADING: &str = "Das Gedicht zum letzten Eintrag (by Mistral AI)";
const MAP_ZOOM: u8 = 10;
/// Map centre when no contact has coordinates (Zürich).
const DEFAULT_CENTER: (f64, f64) = (47.3769, 8.5417);

pub struct PageView<'a> {
    pub table: &'a ContactTable,
    pub sidebar: &'a SidebarState,
    pub poem: Option<&'a str>,
}

pub fn render_page(view: &PageView<'_>) -> String {
    let mut html = String::with_capacity(8 * 1024);
    html.push_str(
        "<!DOCTYPE html>\n<html lang=\"de\">\n<head>\n<meta charset=\"utf-8\">\n\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n",
    );
    let _ = writeln!(html, "<title>{TITLE}</title>");
    html.push_str(
        "<link rel=\"stylesheet\" href=\"https://unpkg.com/leaflet@1.9.4/dist/leaflet.css\">\n\
         <style>\n\
         body{margin:0;font-family:sans-serif;display:flex;min-height:100vh}\n\
         aside{width:18rem;padding:1rem;background:#f0f2f6}\n\
         aside label{display:block;margin-top:.6rem}\n\
         aside input{width:100%;box-sizing:border-box}\n\
         main{flex:1;padding:1rem 2rem}\n\
         .error{color:#b00020;background:#fde7e9;padding:.4rem;margin-top:.6rem}\n\
         .success{color:#0b6b2f;background:#e6f4ea;padding:.4rem;margin-top:.6rem}\n\
         table{border-collapse:collapse}th,td{border:1px solid #ddd;padding:.3rem .6rem}\n\
         .poem{border:2px solid #f63366;border-radius:5px;padding:10px;margin:1rem 0;text-align:center}\n\
         .poem h2{color:#f63366;font-size:20px}\n\
         #map{height:400px;margin-top:1rem}\n\
         </style>\n</head>\n<body>\n",
    );

    render_sidebar(&mut html, view.sidebar);

    html.push_str("<main>\n");
    let _ = writeln!(html, "<h1>{TITLE}</h1>");
    render_table(&mut html, view.table);
    if let Some(poem) = view.poem {
        render_poem(&mut html, poem);
    }
    render_map(&mut html, &view.table.map_points());
    html.push_str("</main>\n</body>\n</html>\n");
    html
}

fn render_sidebar(html: &mut String, sidebar: &SidebarState) {
    html.push_str("<aside>\n<form method=\"post\" action=\"/\">\n");
    let labels = DISPLAY_COLUMNS.iter().take(4).map(|(_, label)| *label);
    for ((field, value), label) in sidebar.form.fields().into_iter().zip(labels) {
        let _ = writeln!(
            html,
            "<label for=\"{field}\">{label}</label>\
             <input id=\"{field}\" name=\"{field}\" type=\"text\" value=\"{}\">",
            escape_html(value)
        );
    }
    html.push_str("<button type=\"submit\" style=\"margin-top:1rem\">Add</button>\n</form>\n");

    if let Some(error) = &sidebar.field_error {
        let _ = writeln!(html, "<div class=\"error\">{}</div>", escape_html(error));
    }
    if let Some((lat, lon)) = sidebar.coordinates {
        let _ = writeln!(html, "<p>Breitengrad: {lat}</p>\n<p>Längengrad: {lon}</p>");
    }
    if let Some(error) = &sidebar.geocode_error {
        let _ = writeln!(html, "<div class=\"error\">{}</div>", escape_html(error));
    }
    if let Some(name) = &sidebar.added {
        let _ = writeln!(
            html,
            "<div class=\"success\">'{}' hinzugefügt</div>",
            escape_html(name)
        );
    }
    html.push_str("</aside>\n");
}

fn render_table(html: &mut String, table: &ContactTable) {
    if table.is_empty() {
        html.push_str("<p>No data to display.</p>\n");
        return;
    }

    html.push_str("<table>\n<thead><tr><th></th>");
    for (_, label) in DISPLAY_COLUMNS {
        let _ = write!(html, "<th>{label}</th>");
    }
    html.push_str("</tr></thead>\n<tbody>\n");
    for (index, contact) in table.rows().iter().enumerate() {
        let _ = writeln!(
            html,
            "<tr><td>{index}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
            escape_html(&contact.name),
            escape_html(&contact.street),
            escape_html(&contact.postal_code),
            escape_html(&contact.city),
            format_coordinate(contact.lat),
            format_coordinate(contact.lon),
        );
    }
    html.push_str("</tbody>\n</table>\n");
}

fn render_poem(html: &mut String, poem: &str) {
    let lines: Vec<String> = poem.lines().map(escape_html).collect();
    let _ = writeln!(
        html,
        "<div class=\"poem\"><h2>{POEM_HEADING}</h2><p>{}</p></div>",
        lines.join("<br>")
    );
}

fn render_map(html: &mut String, points: &[MapPoint]) {
    let (lat, lon) = points
        .first()
        .map(|p| (p.lat, p.lon))
        .unwrap_or(DEFAULT_CENTER);
    let markers = serde_json::to_string(points).unwrap_or_else(|_| "[]".to_string());

    html.push_str(
        "<div id=\"map\"></div>\n\
         <script src=\"https://unpkg.com/leaflet@1.9.4/dist/leaflet.js\"></script>\n",
    );
    let _ = writeln!(
        html,
        "<script>\n\
         const points = {};\n\
         const map = L.map('map').setView([{lat}, {lon}], {MAP_ZOOM});\n\
         L.tileLayer('https://tile.openstreetmap.org/{{z}}/{{x}}/{{y}}.png', \
         {{maxZoom: 19, attribution: '&copy; OpenStreetMap'}}).addTo(map);\n\
         points.forEach(p => L.circleMarker([p.lat, p.lon]).bindTooltip(p.name).addTo(map));\n\
         if (points.length > 1) map.fitBounds(points.map(p => [p.lat, p.lon]), {{maxZoom: {MAP_ZOOM}}});\n\
         </script>",
        script_safe(&markers)
    );
}

fn format_coordinate(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Keeps JSON embedded in a `<script>` block from closing it early.
fn script_safe(json: &str) -> String {
    json.replace("</", "<\\/")
}
