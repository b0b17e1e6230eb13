//! Plain-text rendering of an `AppView`
//!
//! Output is deterministic for a given view so it can be snapshot-tested and
//! compared between refreshes.

use super::{AppView, KindView, ReleaseView};
use serde_json::Value;

/// Which optional sections to include
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
    pub show_static: bool,
    pub show_notes: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            show_static: true,
            show_notes: true,
        }
    }
}

pub fn render_text(view: &AppView, options: &RenderOptions) -> String {
    match view {
        AppView::Loading => "Loading release...\n".to_string(),
        AppView::Failed { message } => format!("Error: {}\n", message),
        AppView::Ready(release) => render_release(release, options),
    }
}

fn render_release(view: &ReleaseView, options: &RenderOptions) -> String {
    let mut lines = vec![
        format!("Release: {} (revision {})", view.release, view.revision),
        format!("Status:  {}", view.status),
    ];
    if let Some(chart) = &view.chart {
        match &chart.app_version {
            Some(app) => lines.push(format!("Chart:   {} (app {})", chart.label, app)),
            None => lines.push(format!("Chart:   {}", chart.label)),
        }
    }
    if let Some(description) = &view.description {
        lines.push(format!("Info:    {}", description));
    }

    lines.push(String::new());
    lines.push("Access URLs:".to_string());
    if view.access_urls_loading {
        lines.push("  (loading)".to_string());
    } else if view.access_urls.is_empty() {
        lines.push("  (none)".to_string());
    } else {
        lines.extend(view.access_urls.iter().map(|url| format!("  {}", url)));
    }

    let resources = &view.resources;
    section(&mut lines, "Deployments", &resources.deployments, |d| {
        format!("{}  {}", name_of(d), super::replica_summary(d))
    });
    section(&mut lines, "Services", &resources.services, service_line);
    section(&mut lines, "Ingresses", &resources.ingresses, ingress_line);
    section(&mut lines, "Secrets", &resources.secrets, secret_line);

    if options.show_static {
        lines.push(String::new());
        lines.push("Other Resources:".to_string());
        if resources.other_resources.is_empty() {
            lines.push("  (none)".to_string());
        }
        lines.extend(resources.other_resources.keys().map(|key| format!("  {}", key)));
    }

    if options.show_notes {
        if let Some(notes) = &view.notes {
            lines.push(String::new());
            lines.push("Notes:".to_string());
            lines.extend(notes.trim_end().lines().map(|l| format!("  {}", l)));
        }
    }

    let mut out = lines.join("\n");
    out.push('\n');
    out
}

fn section(lines: &mut Vec<String>, title: &str, kind: &KindView, row: impl Fn(&Value) -> String) {
    lines.push(String::new());
    lines.push(format!("{}:", title));
    if let Some(err) = &kind.error {
        lines.push(format!("  ! {}", err));
    }
    lines.extend(kind.items.iter().map(|item| format!("  {}", row(item))));
    if kind.loading {
        lines.push("  (loading)".to_string());
    } else if kind.items.is_empty() && kind.error.is_none() {
        lines.push("  (none)".to_string());
    }
}

fn name_of(payload: &Value) -> &str {
    payload
        .pointer("/metadata/name")
        .and_then(Value::as_str)
        .unwrap_or("?")
}

fn service_line(service: &Value) -> String {
    let service_type = service
        .pointer("/spec/type")
        .and_then(Value::as_str)
        .unwrap_or("ClusterIP");
    let cluster_ip = service
        .pointer("/spec/clusterIP")
        .and_then(Value::as_str)
        .unwrap_or("-");
    let ports: Vec<String> = service
        .pointer("/spec/ports")
        .and_then(Value::as_array)
        .map(|ports| {
            ports
                .iter()
                .filter_map(|p| {
                    let port = p.get("port")?.as_i64()?;
                    let protocol = p.get("protocol").and_then(Value::as_str).unwrap_or("TCP");
                    Some(format!("{}/{}", port, protocol))
                })
                .collect()
        })
        .unwrap_or_default();
    format!(
        "{}  {}  {}  {}",
        name_of(service),
        service_type,
        cluster_ip,
        if ports.is_empty() {
            "-".to_string()
        } else {
            ports.join(",")
        }
    )
}

fn ingress_line(ingress: &Value) -> String {
    let hosts: Vec<&str> = ingress
        .pointer("/spec/rules")
        .and_then(Value::as_array)
        .map(|rules| {
            rules
                .iter()
                .filter_map(|r| r.get("host").and_then(Value::as_str))
                .collect()
        })
        .unwrap_or_default();
    format!(
        "{}  {}",
        name_of(ingress),
        if hosts.is_empty() {
            "*".to_string()
        } else {
            hosts.join(",")
        }
    )
}

fn secret_line(secret: &Value) -> String {
    let secret_type = secret
        .get("type")
        .and_then(Value::as_str)
        .unwrap_or("Opaque");
    let keys = secret
        .get("data")
        .and_then(Value::as_object)
        .map(|d| d.len())
        .unwrap_or(0);
    format!("{}  {}  {} keys", name_of(secret), secret_type, keys)
}
