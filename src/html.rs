//! Server-rendered HTML pages.
//!
//! Templates live in `templates/` and are compiled into the binary. Every
//! `.html` template is autoescaped; only pre-serialized map data is marked
//! `safe`.

use std::{collections::BTreeMap, collections::HashMap, sync::Arc};

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::Serialize;
use tera::{Context, Tera, Value};

use crate::{store::NodeDetail, Location, Measurement};

// ---

/// Unreserved characters per RFC 3986 stay as-is; `/` is encoded.
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

const TEMPLATES: [(&str, &str); 10] = [
    ("base.html", include_str!("../templates/base.html")),
    ("index.html", include_str!("../templates/index.html")),
    ("display_nodes.html", include_str!("../templates/display_nodes.html")),
    ("node_data.html", include_str!("../templates/node_data.html")),
    ("latlogedit.html", include_str!("../templates/latlogedit.html")),
    ("edit_list_nodes.html", include_str!("../templates/edit_list_nodes.html")),
    ("edit_node.html", include_str!("../templates/edit_node.html")),
    ("apis.html", include_str!("../templates/apis.html")),
    ("map_fragment.html", include_str!("../templates/map_fragment.html")),
    ("map.html", include_str!("../templates/map.html")),
];

const ENDPOINTS: [(&str, &str, &str); 14] = [
    ("GET", "/uploadvalue?node=A1&plantheight=12.5", "Record a measurement"),
    ("GET", "/uploaddata?nodename=A1&height=12.5", "Record a measurement"),
    ("GET", "/history", "All measurements as JSON"),
    ("GET", "/latest", "Latest height per node as JSON"),
    ("GET", "/displaynode", "Node directory"),
    ("GET", "/displaynode/A1", "Measurements for one node"),
    ("GET", "/getnodejson/A1", "Node measurements, location and latest record as JSON"),
    ("GET", "/getnodelatestjson/A1", "Latest record and location as JSON"),
    ("GET/POST", "/latlogedit", "Bulk location editor"),
    ("GET/POST", "/edit/A1", "Edit one node's location"),
    ("GET", "/mapplant", "Map fragment"),
    ("GET", "/mapit", "Map page"),
    ("GET", "/getmap", "Map page persisted to disk"),
    ("GET", "/health", "Liveness check"),
];

/// Percent-encode `raw` for use as a single URL path segment.
pub fn path_segment(raw: &str) -> String {
    utf8_percent_encode(raw, PATH_SEGMENT).to_string()
}

fn path_segment_filter(value: &Value, _args: &HashMap<String, Value>) -> tera::Result<Value> {
    // ---
    let raw = value
        .as_str()
        .ok_or_else(|| tera::Error::msg("path_segment expects a string"))?;
    Ok(Value::String(path_segment(raw)))
}

#[derive(Serialize)]
struct NodeHeight<'a> {
    node: &'a str,
    height: f64,
}

#[derive(Serialize)]
struct Endpoint {
    method: &'static str,
    path: &'static str,
    purpose: &'static str,
}

/// Compiled page templates; cloning shares the same engine.
#[derive(Clone)]
pub struct Templates {
    tera: Arc<Tera>,
}

impl Templates {
    // ---
    /// Compile every embedded template. Fails on a template syntax error.
    pub fn new() -> tera::Result<Self> {
        // ---
        let mut tera = Tera::default();
        tera.register_filter("path_segment", path_segment_filter);
        tera.add_raw_templates(TEMPLATES)?;
        Ok(Templates {
            tera: Arc::new(tera),
        })
    }

    pub fn render(&self, name: &str, context: &Context) -> tera::Result<String> {
        self.tera.render(name, context)
    }

    fn titled(title: &str) -> Context {
        // ---
        let mut ctx = Context::new();
        ctx.insert("title", title);
        ctx
    }

    /// Home page: record count and the current height of every node.
    pub fn index(
        &self,
        total_records: i64,
        latest: &BTreeMap<String, f64>,
    ) -> tera::Result<String> {
        // ---
        let nodes: Vec<NodeHeight> = latest
            .iter()
            .map(|(node, height)| NodeHeight {
                node,
                height: *height,
            })
            .collect();

        let mut ctx = Self::titled("Tree plantation");
        ctx.insert("total_records", &total_records);
        ctx.insert("nodes", &nodes);
        self.render("index.html", &ctx)
    }

    /// Node directory with the newest record overall.
    pub fn node_list(
        &self,
        nodes: &[String],
        latest: Option<&Measurement>,
    ) -> tera::Result<String> {
        // ---
        let mut ctx = Self::titled("Nodes");
        ctx.insert("nodes", nodes);
        ctx.insert("latest", &latest);
        self.render("display_nodes.html", &ctx)
    }

    /// Every measurement and the location of one node.
    pub fn node_detail(&self, node: &str, detail: &NodeDetail) -> tera::Result<String> {
        // ---
        let mut ctx = Self::titled(&format!("Node {node}"));
        ctx.insert("location", &detail.location);
        ctx.insert("values", &detail.values);
        self.render("node_data.html", &ctx)
    }

    /// Bulk location editor: one inline form per row.
    pub fn location_editor(&self, locations: &[Location]) -> tera::Result<String> {
        // ---
        let mut ctx = Self::titled("Edit locations");
        ctx.insert("locations", locations);
        self.render("latlogedit.html", &ctx)
    }

    pub fn edit_list(&self, locations: &[Location]) -> tera::Result<String> {
        // ---
        let mut ctx = Self::titled("Edit locations");
        ctx.insert("locations", locations);
        self.render("edit_list_nodes.html", &ctx)
    }

    /// Form for one node; blank inputs when the node has no location row.
    pub fn edit_node(&self, node: &str, location: Option<&Location>) -> tera::Result<String> {
        // ---
        let mut ctx = Self::titled(&format!("Edit {node}"));
        ctx.insert("node", node);
        ctx.insert("location", &location);
        self.render("edit_node.html", &ctx)
    }

    pub fn apis(&self, base_url: &str) -> tera::Result<String> {
        // ---
        let endpoints: Vec<Endpoint> = ENDPOINTS
            .iter()
            .map(|&(method, path, purpose)| Endpoint {
                method,
                path,
                purpose,
            })
            .collect();

        let mut ctx = Self::titled("APIs");
        ctx.insert("base_url", base_url);
        ctx.insert("endpoints", &endpoints);
        self.render("apis.html", &ctx)
    }
}
