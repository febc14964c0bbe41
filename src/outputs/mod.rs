//! Output generation: raw batches, ranked tables, and the static site.
//!
//! # Submodules
//!
//! - [`json`]: Writes and reads raw fetch batches
//! - [`table`]: Writes and reads ranked CSV tables
//! - [`html`]: Renders per-range and aggregate report pages
//! - [`indexes`]: Renders the site directory page
//!
//! # Output Structure
//!
//! ```text
//! data/raw/
//! └── epmc_2025-01-01_to_2025-01-08.json
//!
//! data/weekly_reports/
//! └── epmc_2025-01-01_to_2025-01-08.csv
//!
//! docs/
//! ├── index.html              # Directory page
//! ├── aggregate.html          # All tables combined
//! ├── script.js               # Client-side re-scoring, sorting, filtering
//! ├── styles.css
//! └── weekly_reports/
//!     └── epmc_2025-01-01_to_2025-01-08.html
//! ```

pub mod html;
pub mod indexes;
pub mod json;
pub mod table;

use crate::error::Result;
use minijinja::Environment;

/// Heading shared by every page of the site.
pub const SITE_TITLE: &str = "Visual Analytics in Healthcare Research";

/// Page templates, compiled into the binary.
///
/// Template names end in `.html`, so values are HTML-escaped unless marked
/// `|safe`.
pub(crate) fn templates() -> Result<Environment<'static>> {
    let mut env = Environment::new();
    env.add_template("layout.html", include_str!("../../templates/layout.html"))?;
    env.add_template("article_table.html", include_str!("../../templates/article_table.html"))?;
    env.add_template("report.html", include_str!("../../templates/report.html"))?;
    env.add_template("aggregate.html", include_str!("../../templates/aggregate.html"))?;
    env.add_template("directory.html", include_str!("../../templates/directory.html"))?;
    Ok(env)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_templates_compile() {
        let env = templates().unwrap();
        for name in ["layout.html", "article_table.html", "report.html", "aggregate.html", "directory.html"] {
            assert!(env.get_template(name).is_ok(), "{name}");
        }
    }
}
