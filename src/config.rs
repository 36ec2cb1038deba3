//! Configuration types for situaciones extraction.
//!
//! All extraction behaviour is controlled through [`ExtractionConfig`],
//! built via its [`ExtractionConfigBuilder`]. Callers set only what they
//! need and rely on the documented defaults for the rest.

use crate::error::ExtractError;
use crate::pipeline::fields::ColumnTemplate;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for one extraction run.
///
/// # Example
/// ```rust
/// use situaciones::{ExtractionConfig, PageSelection};
///
/// let config = ExtractionConfig::builder()
///     .collection_timeout_ms(5_000)
///     .pages(PageSelection::Range(2, 5))
///     .build()
///     .unwrap();
/// assert_eq!(config.collection_timeout().as_secs(), 5);
/// ```
#[derive(Debug, Clone)]
pub struct ExtractionConfig {
    /// How long to wait for the layout engine to signal end-of-stream, in
    /// milliseconds. Default: 10 000.
    ///
    /// When the deadline passes, a warning is logged and extraction carries
    /// on with the fragments received so far.
    pub collection_timeout_ms: u64,

    /// Page selection. Default: all pages.
    pub pages: PageSelection,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Row layout used to map tokens onto record fields.
    /// Default: [`ColumnTemplate::vida_laboral`].
    pub template: ColumnTemplate,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            collection_timeout_ms: 10_000,
            pages: PageSelection::default(),
            password: None,
            download_timeout_secs: 120,
            template: ColumnTemplate::default(),
        }
    }
}

impl ExtractionConfig {
    /// Create a new builder for `ExtractionConfig`.
    pub fn builder() -> ExtractionConfigBuilder {
        ExtractionConfigBuilder {
            config: Self::default(),
        }
    }

    pub fn collection_timeout(&self) -> Duration {
        Duration::from_millis(self.collection_timeout_ms)
    }
}

/// Builder for [`ExtractionConfig`].
#[derive(Debug)]
pub struct ExtractionConfigBuilder {
    config: ExtractionConfig,
}

impl ExtractionConfigBuilder {
    pub fn collection_timeout_ms(mut self, ms: u64) -> Self {
        self.config.collection_timeout_ms = ms;
        self
    }

    pub fn collection_timeout(self, timeout: Duration) -> Self {
        let ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self.collection_timeout_ms(ms)
    }

    pub fn pages(mut self, selection: PageSelection) -> Self {
        self.config.pages = selection;
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs.max(1);
        self
    }

    pub fn template(mut self, template: ColumnTemplate) -> Self {
        self.config.template = template;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ExtractionConfig, ExtractError> {
        let c = &self.config;
        if c.collection_timeout_ms == 0 {
            return Err(ExtractError::InvalidConfig(
                "Collection timeout must be ≥ 1ms".into(),
            ));
        }
        if let PageSelection::Range(start, end) = c.pages {
            if start > end {
                return Err(ExtractError::InvalidConfig(format!(
                    "Page range {start}-{end} is empty"
                )));
            }
        }
        Ok(self.config)
    }
}

/// Specifies which pages of the PDF produce fragments.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PageSelection {
    /// All pages (default).
    #[default]
    All,
    /// A single page (1-indexed).
    Single(usize),
    /// A contiguous range of pages (1-indexed, inclusive).
    Range(usize, usize),
    /// Specific pages (1-indexed, deduplicated).
    Set(Vec<usize>),
}

impl PageSelection {
    /// Expand the selection into a sorted, deduplicated list of 0-indexed page numbers.
    pub fn to_indices(&self, total_pages: usize) -> Vec<usize> {
        let mut indices: Vec<usize> = match self {
            PageSelection::All => (0..total_pages).collect(),
            PageSelection::Single(p) => {
                if *p >= 1 && *p <= total_pages {
                    vec![p - 1]
                } else {
                    vec![]
                }
            }
            PageSelection::Range(start, end) => {
                let s = (*start).max(1) - 1;
                let e = (*end).min(total_pages);
                (s..e).collect()
            }
            PageSelection::Set(pages) => pages
                .iter()
                .filter(|&&p| p >= 1 && p <= total_pages)
                .map(|p| p - 1)
                .collect(),
        };
        indices.sort_unstable();
        indices.dedup();
        indices
    }

    /// The first page the selection names, if it names any.
    pub fn first_requested(&self) -> Option<usize> {
        match self {
            PageSelection::All => None,
            PageSelection::Single(p) => Some(*p),
            PageSelection::Range(start, _) => Some(*start),
            PageSelection::Set(pages) => pages.iter().min().copied(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = ExtractionConfig::default();
        assert_eq!(c.collection_timeout(), Duration::from_secs(10));
        assert_eq!(c.pages, PageSelection::All);
        assert!(c.password.is_none());
        assert_eq!(c.template, ColumnTemplate::vida_laboral());
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let err = ExtractionConfig::builder()
            .collection_timeout_ms(0)
            .build()
            .unwrap_err();
        assert!(matches!(err, ExtractError::InvalidConfig(_)));
    }

    #[test]
    fn inverted_range_is_rejected() {
        assert!(ExtractionConfig::builder()
            .pages(PageSelection::Range(5, 2))
            .build()
            .is_err());
    }

    #[test]
    fn duration_setter_rounds_to_millis() {
        let c = ExtractionConfig::builder()
            .collection_timeout(Duration::from_millis(1500))
            .build()
            .unwrap();
        assert_eq!(c.collection_timeout_ms, 1500);
    }

    #[test]
    fn page_selection_to_indices() {
        assert_eq!(PageSelection::All.to_indices(5), vec![0, 1, 2, 3, 4]);
        assert_eq!(PageSelection::Single(3).to_indices(5), vec![2]);
        assert_eq!(PageSelection::Single(6).to_indices(5), Vec::<usize>::new());
        assert_eq!(PageSelection::Range(2, 4).to_indices(5), vec![1, 2, 3]);
        assert_eq!(
            PageSelection::Set(vec![3, 1, 3]).to_indices(5),
            vec![0, 2] // deduplicated and sorted
        );
    }

    #[test]
    fn first_requested_page() {
        assert_eq!(PageSelection::All.first_requested(), None);
        assert_eq!(PageSelection::Single(7).first_requested(), Some(7));
        assert_eq!(PageSelection::Range(6, 9).first_requested(), Some(6));
        assert_eq!(PageSelection::Set(vec![9, 7]).first_requested(), Some(7));
    }
}
