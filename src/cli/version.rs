//! `relwatch version`

use crate::models::ResourceKind;

pub fn display_version() {
    print!("{}", version_text());
}

fn version_text() -> String {
    let watchable = ResourceKind::WATCHABLE;
    let kinds: Vec<&str> = watchable.iter().map(ResourceKind::as_str).collect();
    format!(
        "relwatch {}\n  {}\n  License: {}\n  Live watches: {}\n",
        env!("CARGO_PKG_VERSION"),
        env!("CARGO_PKG_DESCRIPTION"),
        env!("CARGO_PKG_LICENSE"),
        kinds.join(", ")
    )
}
